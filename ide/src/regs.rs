//! 主 IDE 通道的端口与寄存器位

use enumflags2::{BitFlags, bitflags};

pub const DATA: u16 = 0x1f0;
pub const ERROR: u16 = 0x1f1;
pub const SECTOR_COUNT: u16 = 0x1f2;
pub const LBA_LOW: u16 = 0x1f3;
pub const LBA_MID: u16 = 0x1f4;
pub const LBA_HIGH: u16 = 0x1f5;
/// 设备与 LBA 高 4 位
pub const DEVICE: u16 = 0x1f6;
/// 读为状态，写为命令
pub const STATUS: u16 = 0x1f7;
pub const COMMAND: u16 = 0x1f7;
/// 设备控制，写 0 开启中断
pub const CONTROL: u16 = 0x3f6;

/// LBA28 可寻址的扇区数
pub const LBA28_SECTORS: usize = 1 << 28;
/// 单个逻辑块最多的扇区数
pub const MAX_SECTORS_PER_BLOCK: usize = 7;

#[rustfmt::skip]
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 出错
    Err  = 0x01,
    /// 数据就绪，可经数据端口传输
    Drq  = 0x08,
    /// 设备故障
    Df   = 0x20,
    /// 设备就绪
    Drdy = 0x40,
    /// 忙
    Bsy  = 0x80,
}

impl Status {
    #[inline]
    pub fn decode(byte: u8) -> BitFlags<Status> {
        BitFlags::from_bits_truncate(byte)
    }
}

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Read       = 0x20,
    Write      = 0x30,
    ReadMulti  = 0xc4,
    WriteMulti = 0xc5,
}

/// 设备寄存器的取值：LBA 模式，`device` 选主从盘
#[inline]
pub fn device_select(device: u8, lba: usize) -> u8 {
    0xe0 | ((device & 1) << 4) | ((lba >> 24) & 0x0f) as u8
}
