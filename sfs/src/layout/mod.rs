mod bitmap;
mod inode;
mod super_block;

use alloc::sync::Arc;
use core::mem::size_of;
use core::ptr;

use block_dev::{BlockDevice, BlockError};

pub use self::{bitmap::Bitmap, inode::DiskInode, super_block::SuperBlock};
use crate::{BLOCK_SIZE, DataBlock};

/// 可以按字节原样存取的磁盘结构
///
/// # Safety
///
/// 实现者须为 `#[repr(C)]`、无填充，且任意位模式都是合法值。
pub unsafe trait OnDisk: Copy {}

/// 从块首读出一个磁盘结构
pub(crate) fn load<T: OnDisk>(dev: &Arc<dyn BlockDevice>, block_id: usize) -> Result<T, BlockError> {
    assert!(size_of::<T>() <= BLOCK_SIZE);
    let mut block: DataBlock = [0; BLOCK_SIZE];
    dev.read_block(block_id, &mut block)?;
    // SAFETY: OnDisk 保证任意字节都是合法的 T，且未对齐读取不要求对齐
    Ok(unsafe { ptr::read_unaligned(block.as_ptr().cast::<T>()) })
}

/// 将磁盘结构写在块首，块内其余字节清零
pub(crate) fn store<T: OnDisk>(
    dev: &Arc<dyn BlockDevice>,
    block_id: usize,
    value: &T,
) -> Result<(), BlockError> {
    assert!(size_of::<T>() <= BLOCK_SIZE);
    let mut block: DataBlock = [0; BLOCK_SIZE];
    // SAFETY: OnDisk 保证 T 无填充，其字节均已初始化
    let bytes =
        unsafe { core::slice::from_raw_parts(ptr::from_ref(value).cast::<u8>(), size_of::<T>()) };
    block[..bytes.len()].copy_from_slice(bytes);
    dev.write_block(block_id, &block)
}
