use alloc::sync::Arc;

use block_dev::{BlockDevice, BlockError, Partition};

use crate::channel::{BlockRequest, IdeChannel};
use crate::port::PortIo;
use crate::regs;

/// 磁盘上一个分区的块设备驱动
#[derive(Debug)]
pub struct IdePartition<P> {
    channel: Arc<IdeChannel<P>>,
    device: u8,
    partition: Partition,
}

impl<P: PortIo> IdePartition<P> {
    /// 超出 LBA28 可寻址范围的部分被截去
    pub fn new(channel: Arc<IdeChannel<P>>, device: u8, partition: Partition) -> Self {
        let limit = regs::LBA28_SECTORS / channel.sectors_per_block();
        let addressable = Partition::new(partition.start.min(limit), partition.end.min(limit));
        if addressable != partition {
            log::warn!(
                "ide: partition {partition:?} exceeds LBA28, clamped to {addressable:?}"
            );
        }
        Self {
            channel,
            device,
            partition: addressable,
        }
    }

    /// 覆盖 LBA28 可寻址范围的整盘
    pub fn whole_disk(channel: Arc<IdeChannel<P>>, device: u8) -> Self {
        let blocks = regs::LBA28_SECTORS / channel.sectors_per_block();
        Self::new(channel, device, Partition::new(0, blocks))
    }

    #[inline]
    pub fn channel(&self) -> &Arc<IdeChannel<P>> {
        &self.channel
    }

    fn absolute(&self, block_id: usize) -> Result<usize, BlockError> {
        self.partition.absolute(block_id).ok_or_else(|| {
            log::warn!(
                "ide: block {block_id} outside partition {:?}",
                self.partition
            );
            BlockError::OutOfRange
        })
    }
}

impl<P: PortIo + 'static> BlockDevice for IdePartition<P> {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        let block = self.absolute(block_id)?;
        if buf.len() != self.channel.block_size() {
            return Err(BlockError::BufferSize);
        }

        let request = BlockRequest::read(self.device, block, buf.len());
        self.channel.submit(&request)?;
        buf.copy_from_slice(&request.data());
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        let block = self.absolute(block_id)?;
        let request = BlockRequest::write(self.device, block, buf);
        self.channel.submit(&request)
    }

    fn partition(&self) -> Partition {
        self.partition
    }

    fn device(&self) -> u8 {
        self.device
    }

    fn handle_irq(&self) {
        self.channel.handle_irq();
    }
}
