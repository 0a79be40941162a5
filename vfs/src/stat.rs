use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C, align(32))]
pub struct Stat {
    pub mode: DirEntryType,
    /// 特殊设备为 0
    pub inode: u64,
    pub block_size: u64,
    /// 已分配的数据块数
    pub blocks: u64,
    /// 字节数；块设备为分区容量
    pub size: u64,
}

impl Stat {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode == DirEntryType::Directory
    }
}
