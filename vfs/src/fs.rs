//! 文件系统操作表
//!
//! 每种文件系统实现 [`FileSystem`] 后注册到 VFS。超级块对 VFS 不透明，
//! 以 `dyn Any` 的形式随挂载点保存，由文件系统自行向下转型。
//! inode 在此层只是编号，每次操作都由文件系统重新从磁盘读出。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use block_dev::BlockDevice;

use crate::{Error, Result, Stat};

/// 文件系统内 inode 的编号
pub type InodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    Directory,
    File,
}

pub trait FileSystem: Send + Sync {
    /// 读出并校验超级块，校验失败返回空
    fn readsb(&self, dev: &Arc<dyn BlockDevice>) -> Option<Box<dyn Any + Send>>;

    fn writesb(&self, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<()>;

    /// `path` 是相对挂载点的绝对路径，根为 `"/"`
    fn namei(&self, path: &str, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<InodeId>;

    fn readi(
        &self,
        inode: InodeId,
        dst: &mut [u8],
        offset: usize,
        sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<usize>;

    #[allow(unused_variables)]
    fn createi(
        &self,
        path: &str,
        kind: InodeKind,
        sb: &mut dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<InodeId> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn writei(
        &self,
        inode: InodeId,
        src: &[u8],
        offset: usize,
        sb: &mut dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn stati(&self, inode: InodeId, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<Stat> {
        Err(Error::Unsupported)
    }

    /// 目录的第 `nth` 个子项，越过子项数时返回 `Ok(None)`
    #[allow(unused_variables)]
    fn childi(
        &self,
        inode: InodeId,
        nth: usize,
        sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<Option<InodeId>> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn iname(&self, inode: InodeId, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<String> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn parenti(
        &self,
        inode: InodeId,
        sb: &dyn Any,
        dev: &Arc<dyn BlockDevice>,
    ) -> Result<InodeId> {
        Err(Error::Unsupported)
    }
}

/// 字符设备驱动特质
pub trait CharDevice: Send + Sync {
    /// 取出一个已到达的字节，没有则返回空
    fn read(&self) -> Option<u8>;
    fn write(&self, ch: u8);
    fn handle_irq(&self) {}
}
