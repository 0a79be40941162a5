//! # 虚拟文件系统
//!
//! 块设备、字符设备、文件系统、挂载点与特殊设备五张注册表，
//! 集中在一个 [`Vfs`] 里，启动时构造一次，之后以共享引用传递。
//!
//! 注册阶段的配置错误（设备或文件系统未注册、超级块校验失败）不可恢复，直接 panic。

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use block_dev::BlockDevice;
use spin::RwLock;

use crate::collections::BucketMap;
use crate::inode::VfsInode;
use crate::mount::{Mount, MountTable};
use crate::{CharDevice, Error, FileSystem, InodeKind, Result};

#[derive(Clone)]
enum Special {
    Char(Arc<dyn CharDevice>),
    Block(Arc<dyn BlockDevice>),
}

pub struct Vfs {
    block_drivers: RwLock<BucketMap<String, Arc<dyn BlockDevice>>>,
    char_drivers: RwLock<BucketMap<String, Arc<dyn CharDevice>>>,
    filesystems: RwLock<BucketMap<String, Arc<dyn FileSystem>>>,
    mounts: RwLock<MountTable>,
    specials: RwLock<BucketMap<String, Special>>,
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("block_drivers", &self.block_drivers.read().len())
            .field("char_drivers", &self.char_drivers.read().len())
            .field("filesystems", &self.filesystems.read().len())
            .field("mounts", &self.mounts.read().len())
            .field("specials", &self.specials.read().len())
            .finish()
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self {
            block_drivers: RwLock::new(BucketMap::new()),
            char_drivers: RwLock::new(BucketMap::new()),
            filesystems: RwLock::new(BucketMap::new()),
            mounts: RwLock::new(MountTable::new()),
            specials: RwLock::new(BucketMap::new()),
        }
    }

    pub fn register_block(&self, name: &str, driver: Arc<dyn BlockDevice>) {
        log::info!(
            "register block device {name:?}, partition {:?}",
            driver.partition()
        );
        self.block_drivers.write().put(String::from(name), driver);
    }

    pub fn register_char(&self, name: &str, driver: Arc<dyn CharDevice>) {
        log::info!("register char device {name:?}");
        self.char_drivers.write().put(String::from(name), driver);
    }

    pub fn register_fs(&self, name: &str, ops: Arc<dyn FileSystem>) {
        log::info!("register filesystem {name:?}");
        self.filesystems.write().put(String::from(name), ops);
    }

    pub fn block_device(&self, name: &str) -> Option<Arc<dyn BlockDevice>> {
        self.block_drivers.read().get(name).cloned()
    }

    /// 把 `device` 上的 `fs` 挂载到 `path`。
    ///
    /// `device` 先按块设备名查找，找不到再按已绑定的块设备特殊文件路径查找。
    pub fn mount_fs(&self, path: &str, device: &str, fs_name: &str) -> Arc<Mount> {
        let dev = self
            .block_device(device)
            .or_else(|| match self.specials.read().get(device) {
                Some(Special::Block(dev)) => Some(dev.clone()),
                _ => None,
            })
            .unwrap_or_else(|| fatal(format_args!("mount: no block device {device:?}")));
        let fs = self
            .filesystems
            .read()
            .get(fs_name)
            .cloned()
            .unwrap_or_else(|| fatal(format_args!("mount: no filesystem {fs_name:?}")));
        let sb = fs.readsb(&dev).unwrap_or_else(|| {
            fatal(format_args!(
                "mount: bad super block on {device:?} for {fs_name:?}"
            ))
        });

        log::info!("mount {fs_name} on {device} at {path}");
        self.mounts.write().insert(path, fs_name, fs, dev, sb)
    }

    pub fn mount_char(&self, path: &str, device: &str) {
        let dev = self
            .char_drivers
            .read()
            .get(device)
            .cloned()
            .unwrap_or_else(|| fatal(format_args!("mount: no char device {device:?}")));
        log::info!("bind char device {device} at {path}");
        self.specials
            .write()
            .put(String::from(path), Special::Char(dev));
    }

    pub fn mount_block(&self, path: &str, device: &str) {
        let dev = self
            .block_device(device)
            .unwrap_or_else(|| fatal(format_args!("mount: no block device {device:?}")));
        log::info!("bind block device {device} at {path}");
        self.specials
            .write()
            .put(String::from(path), Special::Block(dev));
    }

    pub fn mount_point(&self, path: &str) -> Option<Arc<Mount>> {
        self.mounts.read().get(path).cloned()
    }

    fn special(&self, path: &str) -> Option<VfsInode> {
        let special = self.specials.read().get(path).cloned()?;
        let path = String::from(path);
        Some(match special {
            Special::Char(dev) => VfsInode::Char { path, dev },
            Special::Block(dev) => VfsInode::Block { path, dev },
        })
    }

    pub fn namei(&self, path: &str) -> Result<VfsInode> {
        if let Some(inode) = self.special(path) {
            return Ok(inode);
        }

        let (mount, relative) = self.mounts.read().resolve(path).ok_or(Error::NotFound)?;
        let inode = mount.session(|fs, sb, dev| fs.namei(relative, sb, dev))?;
        Ok(VfsInode::Fs { mount, inode })
    }

    pub fn createi(&self, path: &str, kind: InodeKind) -> Result<VfsInode> {
        if let Some(inode) = self.special(path) {
            return Ok(inode);
        }

        let (mount, relative) = self.mounts.read().resolve(path).ok_or(Error::NotFound)?;
        let inode = mount.session(|fs, sb, dev| fs.createi(relative, kind, sb, dev))?;
        log::debug!("created {path:?} as inode {inode} on {}", mount.path());
        Ok(VfsInode::Fs { mount, inode })
    }
}

fn fatal(args: fmt::Arguments<'_>) -> ! {
    log::error!("{args}");
    panic!("{args}")
}
