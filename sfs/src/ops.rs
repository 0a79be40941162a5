//! SFS 的 VFS 操作表

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use block_dev::BlockDevice;
use vfs::{Error, FileSystem, InodeId, InodeKind, Result, Stat, Vfs};

use crate::SuperBlock;
use crate::sfs;

/// 注册到 VFS 时使用的名字
pub const NAME: &str = "sfs";

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleFileSystem;

/// 向 VFS 注册 SFS
pub fn register(vfs: &Vfs) {
    vfs.register_fs(NAME, Arc::new(SimpleFileSystem));
}

fn super_block(sb: &dyn Any) -> Result<&SuperBlock> {
    sb.downcast_ref().ok_or(Error::BadSuperBlock)
}

fn super_block_mut(sb: &mut dyn Any) -> Result<&mut SuperBlock> {
    sb.downcast_mut().ok_or(Error::BadSuperBlock)
}

impl FileSystem for SimpleFileSystem {
    fn readsb(&self, dev: &Arc<dyn BlockDevice>) -> Option<Box<dyn Any + Send>> {
        match sfs::readsb(dev) {
            Ok(sb) => sb.map(|sb| Box::new(sb) as Box<dyn Any + Send>),
            Err(err) => {
                log::warn!("sfs: reading super block failed: {err}");
                None
            }
        }
    }

    fn writesb(&self, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<()> {
        sfs::writesb(super_block(sb)?, dev)
    }

    fn namei(&self, path: &str, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<InodeId> {
        sfs::namei(path, super_block(sb)?, dev).map(|ip| ip.inum())
    }

    fn readi(
        &self,
        inode: InodeId,
        dst: &mut [u8],
        offset: usize,
        _sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        sfs::readi(&sfs::load_inode(dev, inode)?, dst, offset)
    }

    fn createi(
        &self,
        path: &str,
        kind: InodeKind,
        sb: &mut dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<InodeId> {
        sfs::createi(path, kind, super_block_mut(sb)?, dev).map(|ip| ip.inum())
    }

    fn writei(
        &self,
        inode: InodeId,
        src: &[u8],
        offset: usize,
        sb: &mut dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let sb = super_block_mut(sb)?;
        sfs::writei(&mut sfs::load_inode(dev, inode)?, sb, src, offset)
    }

    fn stati(&self, inode: InodeId, _sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<Stat> {
        sfs::load_inode(dev, inode).map(|ip| sfs::stati(&ip))
    }

    fn childi(
        &self,
        inode: InodeId,
        nth: usize,
        _sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<Option<InodeId>> {
        sfs::childi(&sfs::load_inode(dev, inode)?, nth)
    }

    fn iname(&self, inode: InodeId, _sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<String> {
        sfs::load_inode(dev, inode).map(|ip| sfs::iname(&ip))
    }

    fn parenti(
        &self,
        inode: InodeId,
        _sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<InodeId> {
        sfs::load_inode(dev, inode).map(|ip| sfs::parenti(&ip))
    }
}
