use alloc::string::String;

use crate::InodeKind;

/// 目录遍历产出的一项，由子项的 `stati` 与 `iname` 拼成
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

/// 文件系统只产出目录与普通文件，设备类型来自特殊设备绑定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Block,
    Char,
    Directory,
    #[default]
    Regular,
}

impl DirEntryType {
    #[inline]
    pub fn is_special(self) -> bool {
        matches!(self, Self::Block | Self::Char)
    }
}

impl From<InodeKind> for DirEntryType {
    fn from(kind: InodeKind) -> Self {
        match kind {
            InodeKind::Directory => Self::Directory,
            InodeKind::File => Self::Regular,
        }
    }
}
