use vfs::{Error, InodeKind, Result};

use super::OnDisk;
use crate::{MAX_BLOCKS, MAX_CHILDREN, NAME_CAP};

const DIRECTORY: u32 = 0;
const FILE: u32 = 1;

/// 磁盘上的 inode，独占一个块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct DiskInode {
    /// 以 0 结尾的名字
    name: [u8; NAME_CAP],
    kind: u32,
    pub inum: u32,
    pub parent: u32,
    children: [u32; MAX_CHILDREN],
    /// 数据块号表，按文件内块索引排列
    indirect: [u32; MAX_BLOCKS],
    n_children: u32,
    pub size: u32,
    n_blocks: u32,
}

unsafe impl OnDisk for DiskInode {}

impl DiskInode {
    pub fn new(inum: u32, parent: u32, kind: InodeKind, name: &str) -> Result<Self> {
        if name.len() >= NAME_CAP {
            return Err(Error::NameTooLong);
        }
        let mut raw = [0; NAME_CAP];
        raw[..name.len()].copy_from_slice(name.as_bytes());

        Ok(Self {
            name: raw,
            kind: match kind {
                InodeKind::Directory => DIRECTORY,
                InodeKind::File => FILE,
            },
            inum,
            parent,
            children: [0; MAX_CHILDREN],
            indirect: [0; MAX_BLOCKS],
            n_children: 0,
            size: 0,
            n_blocks: 0,
        })
    }

    pub fn kind(&self) -> InodeKind {
        if self.kind == DIRECTORY {
            InodeKind::Directory
        } else {
            InodeKind::File
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind() == InodeKind::Directory
    }

    /// 去掉结尾 0 的名字字节
    pub fn name(&self) -> &[u8] {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    pub fn children(&self) -> &[u32] {
        &self.children[..(self.n_children as usize).min(MAX_CHILDREN)]
    }

    pub fn push_child(&mut self, inum: u32) -> Result<()> {
        let n = self.n_children as usize;
        if n >= MAX_CHILDREN {
            return Err(Error::DirectoryFull);
        }
        self.children[n] = inum;
        self.n_children += 1;
        Ok(())
    }

    pub fn blocks(&self) -> &[u32] {
        &self.indirect[..(self.n_blocks as usize).min(MAX_BLOCKS)]
    }

    /// 追加数据块，调用方须先确认表未满
    pub fn push_block(&mut self, block_id: u32) {
        self.indirect[self.n_blocks as usize] = block_id;
        self.n_blocks += 1;
    }
}
