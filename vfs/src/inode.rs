//! # VFS 索引节点层
//!
//! [`VfsInode`] 要么指向挂载点内的 inode 编号，要么直接是特殊设备。
//! 前者的所有操作都经挂载点转发给文件系统。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use block_dev::{BLOCK_SIZE, BlockDevice};

use crate::mount::Mount;
use crate::{CharDevice, DirEntry, DirEntryType, Error, InodeId, Result, Stat};

#[derive(Clone)]
pub enum VfsInode {
    Char {
        path: String,
        dev: Arc<dyn CharDevice>,
    },
    Block {
        path: String,
        dev: Arc<dyn BlockDevice>,
    },
    Fs {
        mount: Arc<Mount>,
        inode: InodeId,
    },
}

impl fmt::Debug for VfsInode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char { path, .. } => f.debug_struct("Char").field("path", path).finish(),
            Self::Block { path, dev } => f
                .debug_struct("Block")
                .field("path", path)
                .field("partition", &dev.partition())
                .finish(),
            Self::Fs { mount, inode } => f
                .debug_struct("Fs")
                .field("mount", &mount.path())
                .field("inode", inode)
                .finish(),
        }
    }
}

impl VfsInode {
    /// 文件系统内的 inode 编号，特殊设备没有编号
    pub fn id(&self) -> Option<InodeId> {
        match self {
            Self::Fs { inode, .. } => Some(*inode),
            _ => None,
        }
    }

    pub fn mount(&self) -> Option<&Arc<Mount>> {
        match self {
            Self::Fs { mount, .. } => Some(mount),
            _ => None,
        }
    }

    #[inline]
    pub fn is_special(&self) -> bool {
        !matches!(self, Self::Fs { .. })
    }

    pub fn readi(&self, dst: &mut [u8], offset: usize) -> Result<usize> {
        match self {
            Self::Char { dev, .. } => {
                let read = dst
                    .iter_mut()
                    .map_while(|byte| dev.read().map(|ch| *byte = ch))
                    .count();
                Ok(read)
            }
            Self::Block { dev, .. } => raw_read(dev, dst, offset),
            Self::Fs { mount, inode } => {
                mount.session(|fs, sb, dev| fs.readi(*inode, dst, offset, sb, dev))
            }
        }
    }

    /// 写入后总是回写超级块，分配状态可能已经改变
    pub fn writei(&self, src: &[u8], offset: usize) -> Result<usize> {
        match self {
            Self::Char { dev, .. } => {
                src.iter().for_each(|&ch| dev.write(ch));
                Ok(src.len())
            }
            Self::Block { dev, .. } => raw_write(dev, src, offset),
            Self::Fs { mount, inode } => mount.session(|fs, sb, dev| {
                let written = fs.writei(*inode, src, offset, sb, dev);
                fs.writesb(sb, dev)?;
                written
            }),
        }
    }

    pub fn stati(&self) -> Result<Stat> {
        match self {
            Self::Char { .. } => Ok(special_stat(DirEntryType::Char, 0, 0)),
            Self::Block { dev, .. } => {
                let blocks = dev.partition().blocks() as u64;
                Ok(special_stat(
                    DirEntryType::Block,
                    blocks,
                    blocks * BLOCK_SIZE as u64,
                ))
            }
            Self::Fs { mount, inode } => mount.session(|fs, sb, dev| fs.stati(*inode, sb, dev)),
        }
    }

    pub fn childi(&self, nth: usize) -> Result<Option<VfsInode>> {
        match self {
            Self::Fs { mount, inode } => {
                let child = mount.session(|fs, sb, dev| fs.childi(*inode, nth, sb, dev))?;
                Ok(child.map(|inode| Self::Fs {
                    mount: mount.clone(),
                    inode,
                }))
            }
            _ => Err(Error::NotADirectory),
        }
    }

    pub fn iname(&self) -> Result<String> {
        match self {
            Self::Char { path, .. } | Self::Block { path, .. } => Ok(String::from(
                path.rsplit_once('/').map_or(path.as_str(), |(_, name)| name),
            )),
            Self::Fs { mount, inode } => mount.session(|fs, sb, dev| fs.iname(*inode, sb, dev)),
        }
    }

    /// 依次取出所有子项的名字与类型
    pub fn read_dir(&self) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        while let Some(child) = self.childi(entries.len())? {
            let stat = child.stati()?;
            entries.push(DirEntry {
                inode: stat.inode,
                ty: stat.mode,
                name: child.iname()?,
            });
        }
        Ok(entries)
    }

    pub fn parenti(&self) -> Result<VfsInode> {
        match self {
            Self::Fs { mount, inode } => {
                let parent = mount.session(|fs, sb, dev| fs.parenti(*inode, sb, dev))?;
                Ok(Self::Fs {
                    mount: mount.clone(),
                    inode: parent,
                })
            }
            _ => Err(Error::Unsupported),
        }
    }
}

fn special_stat(mode: DirEntryType, blocks: u64, size: u64) -> Stat {
    Stat {
        mode,
        inode: 0,
        block_size: BLOCK_SIZE as u64,
        blocks,
        size,
    }
}

/// 分区的字节容量
fn capacity(dev: &Arc<dyn BlockDevice>) -> usize {
    dev.partition().blocks() * BLOCK_SIZE
}

fn raw_read(dev: &Arc<dyn BlockDevice>, dst: &mut [u8], offset: usize) -> Result<usize> {
    let mut start = offset;
    let end = offset.saturating_add(dst.len()).min(capacity(dev));
    if start >= end {
        return Ok(0);
    }

    let mut block = vec![0u8; BLOCK_SIZE];
    let mut read_size = 0;
    while start < end {
        let block_index = start / BLOCK_SIZE;
        let block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
        let len = block_end - start;

        dev.read_block(block_index, &mut block)?;
        let inner = start % BLOCK_SIZE;
        dst[read_size..read_size + len].copy_from_slice(&block[inner..inner + len]);

        read_size += len;
        start = block_end;
    }

    Ok(read_size)
}

fn raw_write(dev: &Arc<dyn BlockDevice>, src: &[u8], offset: usize) -> Result<usize> {
    let mut start = offset;
    let end = offset.saturating_add(src.len()).min(capacity(dev));
    if start >= end {
        return Ok(0);
    }

    let mut block = vec![0u8; BLOCK_SIZE];
    let mut written = 0;
    while start < end {
        let block_index = start / BLOCK_SIZE;
        let block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
        let len = block_end - start;
        let inner = start % BLOCK_SIZE;

        // 不足一块时先读后写
        if len < BLOCK_SIZE {
            dev.read_block(block_index, &mut block)?;
        }
        block[inner..inner + len].copy_from_slice(&src[written..written + len]);
        dev.write_block(block_index, &block)?;

        written += len;
        start = block_end;
    }

    Ok(written)
}
