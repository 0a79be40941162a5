use block_dev::BlockError;
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "entry already exists")]
    AlreadyExists,
    #[display(fmt = "no such file or directory")]
    NotFound,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "file name too long")]
    NameTooLong,
    /// 目录的子项表已满
    #[display(fmt = "directory is full")]
    DirectoryFull,
    /// 间接块表已满
    #[display(fmt = "file too large")]
    FileTooLarge,
    /// 超级块缺失或类型不符
    #[display(fmt = "bad super block")]
    BadSuperBlock,
    #[display(fmt = "operation not supported")]
    Unsupported,
    #[display(fmt = "I/O error: {}", _0)]
    Io(BlockError),
}

impl From<BlockError> for Error {
    fn from(err: BlockError) -> Self {
        Self::Io(err)
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// 折叠为系统调用边界上的返回值：成功为字节数，失败一律为 -1
pub fn status(result: Result<usize>) -> isize {
    match result {
        Ok(n) => n as isize,
        Err(err) => {
            log::debug!("vfs call failed: {err}");
            -1
        }
    }
}
