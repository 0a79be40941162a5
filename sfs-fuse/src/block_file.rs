use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use block_dev::{BLOCK_SIZE, BlockDevice, BlockError, Partition};

/// 以宿主机文件模拟的磁盘，只暴露其中一个分区
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    partition: Partition,
}

impl BlockFile {
    pub fn new(file: File, partition: Partition) -> Self {
        Self {
            file: Mutex::new(file),
            partition,
        }
    }

    fn seek(&self, file: &mut File, block_id: usize) -> Result<(), BlockError> {
        let block = self.partition.absolute(block_id).ok_or(BlockError::OutOfRange)?;
        file.seek(SeekFrom::Start((block * BLOCK_SIZE) as u64))
            .map_err(io_error)?;
        Ok(())
    }
}

fn io_error(err: std::io::Error) -> BlockError {
    log::error!("image I/O failed: {err}");
    BlockError::Device
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), BlockError> {
        if buf.len() != BLOCK_SIZE {
            return Err(BlockError::BufferSize);
        }
        let mut file = self.file.lock().map_err(|_| BlockError::Device)?;
        self.seek(&mut file, block_id)?;
        file.read_exact(buf).map_err(io_error)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), BlockError> {
        if buf.len() != BLOCK_SIZE {
            return Err(BlockError::BufferSize);
        }
        let mut file = self.file.lock().map_err(|_| BlockError::Device)?;
        self.seek(&mut file, block_id)?;
        file.write_all(buf).map_err(io_error)
    }

    fn partition(&self) -> Partition {
        self.partition
    }
}
