//! 主引导记录(MBR)
//!
//! 磁盘#0扇区，末尾携带四个分区表项与 0x55AA 签名。

use core::mem;
use core::ptr;

use derive_more::Display;

use crate::{Partition, SECTOR_SIZE};

/// 分区表项个数
pub const PARTITION_SLOTS: usize = 4;

const SIGNATURE: [u8; 2] = [0x55, 0xAA];

#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
struct PartitionEntry {
    /// 0x80 表示可引导
    status: u8,
    /// 首扇区的 CHS 地址
    _first_chs: [u8; 3],
    kind: u8,
    /// 末扇区的 CHS 地址
    _last_chs: [u8; 3],
    /// 首扇区的 LBA
    first_lba: u32,
    /// 扇区数
    sectors: u32,
}

#[derive(Debug, Clone, Copy)]
#[repr(C, packed)]
struct RawMbr {
    _bootstrap: [u8; 218],
    _timestamp: [u8; 6],
    _bootstrap1: [u8; 216],
    _disk_sig: u32,
    _protected: u16,
    entries: [PartitionEntry; PARTITION_SLOTS],
    signature: [u8; 2],
}

const _: () = assert!(mem::size_of::<RawMbr>() == SECTOR_SIZE);

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    #[display(fmt = "MBR must be exactly one sector")]
    Length,
    #[display(fmt = "missing 0x55AA boot signature")]
    Signature,
}

/// 分区表项解码后的结果，单位为扇区，左闭右开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbrPartition {
    pub kind: u8,
    pub bootable: bool,
    pub start: u32,
    pub end: u32,
}

impl MbrPartition {
    /// 按每块扇区数折算为块边界
    pub fn blocks(&self, sectors_per_block: usize) -> Partition {
        Partition::new(
            self.start as usize / sectors_per_block,
            self.end as usize / sectors_per_block,
        )
    }
}

#[derive(Debug, Clone)]
pub struct MasterBootRecord {
    raw: RawMbr,
}

impl MasterBootRecord {
    pub fn parse(buf: &[u8]) -> Result<Self, MbrError> {
        if buf.len() != SECTOR_SIZE {
            return Err(MbrError::Length);
        }
        let raw: RawMbr = unsafe { ptr::read_unaligned(buf.as_ptr().cast()) };
        if raw.signature != SIGNATURE {
            return Err(MbrError::Signature);
        }

        Ok(Self { raw })
    }

    /// 构造只含给定分区的 MBR，元组为 `(类型, 首LBA, 扇区数)`
    pub fn with_partitions(parts: &[(u8, u32, u32)]) -> Self {
        assert!(parts.len() <= PARTITION_SLOTS);
        let mut raw: RawMbr = unsafe { mem::zeroed() };
        for (entry, &(kind, first_lba, sectors)) in raw.entries.iter_mut().zip(parts) {
            entry.kind = kind;
            entry.first_lba = first_lba.to_le();
            entry.sectors = sectors.to_le();
        }
        raw.signature = SIGNATURE;

        Self { raw }
    }

    pub fn to_bytes(&self) -> [u8; SECTOR_SIZE] {
        unsafe { mem::transmute(self.raw) }
    }

    /// 有效分区数：遇到首个扇区数为0的表项即停止
    pub fn count(&self) -> usize {
        let entries = self.raw.entries;
        entries
            .iter()
            .take_while(|entry| u32::from_le(entry.sectors) != 0)
            .count()
    }

    /// 第 `nth` 个表项；终点越过 32 位扇区号的表项视为损坏，返回空
    pub fn get(&self, nth: usize) -> Option<MbrPartition> {
        let entry = *self.raw.entries.get(nth)?;
        let start = u32::from_le(entry.first_lba);
        let sectors = u32::from_le(entry.sectors);
        let Some(end) = start.checked_add(sectors) else {
            log::warn!("mbr: entry {nth} overflows, start {start:#x}, sectors {sectors:#x}");
            return None;
        };
        Some(MbrPartition {
            kind: entry.kind,
            bootable: entry.status & 0x80 != 0,
            start,
            end,
        })
    }

    pub fn partitions(&self) -> impl Iterator<Item = MbrPartition> + '_ {
        (0..self.count()).filter_map(move |nth| self.get(nth))
    }
}
