//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备，例如磁盘、光盘、U盘等；
//! [`BlockDevice`] 就是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 驱动所见的块号均相对于其分区起点，由驱动自行换算为设备上的绝对块号。

#![no_std]

pub mod mbr;

use core::any::Any;
use core::ops::Range;

use derive_more::Display;

/// 文件系统视角下一个块的字节数
pub const BLOCK_SIZE: usize = 512;
/// 磁盘扇区的字节数
pub const SECTOR_SIZE: usize = 512;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读出分区内第 `block_id` 块，`buf` 的长度须为一个块
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError>;

    /// 写入分区内第 `block_id` 块，`buf` 的长度须为一个块
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError>;

    /// 驱动负责的分区边界（绝对块号）
    fn partition(&self) -> Partition;

    /// 设备号，IDE 上即主盘(0)或从盘(1)
    fn device(&self) -> u8 {
        0
    }

    fn handle_irq(&self) {}
}

/// 分区边界，左闭右开，单位为块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Partition {
    pub start: usize,
    pub end: usize,
}

impl Partition {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// 分区内的块数
    #[inline]
    pub const fn blocks(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// 分区内块号转为绝对块号，越界则返回空
    #[inline]
    pub fn absolute(&self, block_id: usize) -> Option<usize> {
        (block_id < self.blocks()).then_some(self.start + block_id)
    }

    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// 块号超出分区
    #[display(fmt = "block out of partition range")]
    OutOfRange,
    /// 控制器报告了错误或故障位
    #[display(fmt = "device error")]
    Device,
    /// 缓冲区不是一个块的大小
    #[display(fmt = "buffer is not one block")]
    BufferSize,
}
