//! 启动时的磁盘探测

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::mbr::MasterBootRecord;
use block_dev::{BlockDevice, SECTOR_SIZE};

use crate::channel::{IdeChannel, IoMode};
use crate::partition::IdePartition;
use crate::port::PortIo;
use crate::regs::{self, device_select};

/// 选中从盘后轮询状态的次数
const DISK1_POLLS: usize = 1000;

impl<P: PortIo + 'static> IdeChannel<P> {
    /// 以轮询方式读取主盘的分区表，每个分区一个驱动，依次命名为 `sda0`..`sda3`。
    ///
    /// 读盘失败或分区表无效时不产生驱动。
    pub fn probe(self: &Arc<Self>) -> Vec<(String, Arc<IdePartition<P>>)> {
        let mode = self.mode();
        self.set_mode(IoMode::Poll);
        let disk = IdePartition::whole_disk(self.clone(), 0);
        let mut block = vec![0; self.block_size()];
        let read = disk.read_block(0, &mut block);
        self.set_mode(mode);

        if let Err(err) = read {
            log::warn!("ide: reading partition table failed: {err}");
            return Vec::new();
        }
        let mbr = match MasterBootRecord::parse(&block[..SECTOR_SIZE]) {
            Ok(mbr) => mbr,
            Err(err) => {
                log::warn!("ide: no partition table on disk 0: {err}");
                return Vec::new();
            }
        };

        let sectors = self.sectors_per_block();
        // 名字随表项序号，被跳过的损坏表项同样占用序号
        (0..mbr.count())
            .filter_map(|i| mbr.get(i).map(|part| (i, part)))
            .map(|(i, part)| {
                let name = format!("sda{i}");
                let partition = part.blocks(sectors);
                log::info!(
                    "ide: {name}: kind {:#04x}, blocks {:?}",
                    part.kind,
                    partition.range()
                );
                (
                    name,
                    Arc::new(IdePartition::new(self.clone(), 0, partition)),
                )
            })
            .collect()
    }

    /// 选中从盘并轮询状态端口，读到非零即认为存在
    pub fn has_disk1(&self) -> bool {
        let found = self.with_ports(|ports| {
            ports.outb(regs::DEVICE, device_select(1, 0));
            let found = (0..DISK1_POLLS).any(|_| ports.inb(regs::STATUS) != 0);
            ports.outb(regs::DEVICE, device_select(0, 0));
            found
        });
        log::info!("ide: disk 1 {}", if found { "present" } else { "absent" });
        found
    }
}
