use super::{Bitmap, OnDisk};
use crate::{BLOCK_BITMAP_WORDS, DATA_START, INODE_BITMAP_WORDS, MAGIC, ROOT_INODE};

/// 超级块，位于分区第 0 块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct SuperBlock {
    magic: u32,
    /// 根目录的 inode 编号
    pub root: u32,
    inode_bitmap: [u32; INODE_BITMAP_WORDS],
    block_bitmap: [u32; BLOCK_BITMAP_WORDS],
}

unsafe impl OnDisk for SuperBlock {}

impl SuperBlock {
    /// 空文件系统的超级块：保留 0 号与根的 inode 编号
    pub fn new() -> Self {
        let mut sb = Self {
            magic: MAGIC,
            root: ROOT_INODE,
            inode_bitmap: [0; INODE_BITMAP_WORDS],
            block_bitmap: [0; BLOCK_BITMAP_WORDS],
        };
        sb.inodes().set(0);
        sb.inodes().set(ROOT_INODE as usize);
        sb
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    #[inline]
    pub fn inodes(&mut self) -> Bitmap<'_> {
        Bitmap::new(&mut self.inode_bitmap)
    }

    #[inline]
    pub fn blocks(&mut self) -> Bitmap<'_> {
        Bitmap::new(&mut self.block_bitmap)
    }

    /// 分配一个 inode 编号
    pub fn alloc_inode(&mut self) -> Option<u32> {
        self.inodes().alloc().map(|bit| bit as u32)
    }

    /// 分配一个数据块，返回其分区内块号
    pub fn alloc_block(&mut self) -> Option<u32> {
        self.blocks().alloc().map(|bit| (DATA_START + bit) as u32)
    }

    pub fn used_inodes(&self) -> usize {
        self.inode_bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn used_blocks(&self) -> usize {
        self.block_bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use core::mem::size_of;

    use super::SuperBlock;
    use crate::{BLOCK_SIZE, DATA_START};

    #[test]
    fn layout() {
        assert_eq!(504, size_of::<SuperBlock>());
        assert!(size_of::<SuperBlock>() <= BLOCK_SIZE);
    }

    #[test]
    fn fresh_allocation() {
        let mut sb = SuperBlock::new();
        assert!(sb.is_valid());
        assert_eq!(2, sb.used_inodes());
        assert_eq!(Some(2), sb.alloc_inode());
        assert_eq!(Some(DATA_START as u32), sb.alloc_block());
        assert_eq!(Some(DATA_START as u32 + 1), sb.alloc_block());
        assert_eq!(2, sb.used_blocks());
    }
}
