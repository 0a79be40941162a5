//! # SFS 简单文件系统
//!
//! 磁盘布局（块号为分区内块号）：
//!
//! | 块 | 内容 |
//! |----|------|
//! | 0 | 超级块，内含 inode 位图与数据块位图 |
//! | 1..=128 | inode 区，编号 n 的 inode 独占块 n+1 |
//! | 129.. | 数据区，位图第 b 位对应块 129+b |
//!
//! 文件与目录都没有数据块级的目录项：目录的子项直接记在其 inode 里。

#![no_std]

extern crate alloc;

/* 自上而下 */

// 操作表层：接入 VFS
mod ops;

// inode 层：路径解析与文件读写
mod sfs;

// 磁盘数据结构层
pub mod layout;

pub use self::{
    layout::{DiskInode, SuperBlock},
    ops::{NAME, SimpleFileSystem, register},
    sfs::{
        Inode, childi, createi, format, iname, namei, parenti, readi, readsb, stati, writei,
        writesb,
    },
};

pub use block_dev::BLOCK_SIZE;

pub const MAGIC: u32 = 0x03F3_C007;

/// 文件名的存储宽度，含结尾的 0
pub const NAME_CAP: usize = 32;
/// 目录最多的子项数
pub const MAX_CHILDREN: usize = 16;
/// 文件最多的数据块数
pub const MAX_BLOCKS: usize = 64;

pub const INODE_BITMAP_WORDS: usize = 4;
pub const BLOCK_BITMAP_WORDS: usize = 120;
pub const INODE_SLOTS: usize = INODE_BITMAP_WORDS * 32;
pub const DATA_BLOCKS: usize = BLOCK_BITMAP_WORDS * 32;

pub const SUPER_BLOCK_ID: usize = 0;
/// 编号 0 保留不用
pub const ROOT_INODE: u32 = 1;
pub const DATA_START: usize = 1 + INODE_SLOTS;
/// 格式化所需的最少块数
pub const FS_BLOCKS: usize = DATA_START + DATA_BLOCKS;

type DataBlock = [u8; BLOCK_SIZE];
