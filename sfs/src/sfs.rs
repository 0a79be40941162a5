//! # inode 层
//!
//! inode 不做缓存，每次操作都从 inode 区重新读出，修改后立即写回。

use alloc::string::String;
use alloc::sync::Arc;

use block_dev::BlockDevice;
use vfs::{Error, InodeId, InodeKind, Result, Stat};

use crate::layout::{self, DiskInode, SuperBlock};
use crate::{BLOCK_SIZE, DataBlock, FS_BLOCKS, INODE_SLOTS, MAX_BLOCKS, ROOT_INODE, SUPER_BLOCK_ID};

/// 内存中的 inode
pub struct Inode {
    pub disk: DiskInode,
    dev: Arc<dyn BlockDevice>,
    /// 槽位里的编号与请求的编号一致时才有效
    valid: bool,
}

impl core::fmt::Debug for Inode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Inode")
            .field("inum", &self.disk.inum)
            .field("kind", &self.disk.kind())
            .field("size", &self.disk.size)
            .field("valid", &self.valid)
            .finish()
    }
}

impl Inode {
    /// 读出编号为 `inum` 的 inode
    pub fn load(dev: &Arc<dyn BlockDevice>, inum: InodeId) -> Result<Self> {
        if inum == 0 || inum as usize >= INODE_SLOTS {
            return Err(Error::NotFound);
        }
        let disk: DiskInode = layout::load(dev, inum as usize + 1)?;

        Ok(Self {
            valid: disk.inum == inum,
            disk,
            dev: dev.clone(),
        })
    }

    /// 读出并要求有效
    fn get(dev: &Arc<dyn BlockDevice>, inum: InodeId) -> Result<Self> {
        let inode = Self::load(dev, inum)?;
        if inode.valid {
            Ok(inode)
        } else {
            log::warn!("sfs: inode slot {inum} holds inode {}", inode.disk.inum);
            Err(Error::NotFound)
        }
    }

    fn new(dev: &Arc<dyn BlockDevice>, disk: DiskInode) -> Self {
        Self {
            disk,
            dev: dev.clone(),
            valid: true,
        }
    }

    #[inline]
    pub fn inum(&self) -> InodeId {
        self.disk.inum
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 写回 inode 区
    pub fn persist(&self) -> Result<()> {
        layout::store(&self.dev, self.disk.inum as usize + 1, &self.disk)?;
        Ok(())
    }

    fn name_is(&self, name: &str) -> bool {
        self.disk.name() == name.as_bytes()
    }
}

/// 读出超级块，魔数不对时返回空
pub fn readsb(dev: &Arc<dyn BlockDevice>) -> Result<Option<SuperBlock>> {
    let sb: SuperBlock = layout::load(dev, SUPER_BLOCK_ID)?;
    if sb.is_valid() {
        Ok(Some(sb))
    } else {
        log::warn!("sfs: bad magic on super block");
        Ok(None)
    }
}

pub fn writesb(sb: &SuperBlock, dev: &Arc<dyn BlockDevice>) -> Result<()> {
    layout::store(dev, SUPER_BLOCK_ID, sb)?;
    Ok(())
}

/// 在分区上建立空文件系统：超级块与根目录
pub fn format(dev: &Arc<dyn BlockDevice>) -> Result<SuperBlock> {
    let blocks = dev.partition().blocks();
    if blocks < FS_BLOCKS {
        log::warn!("sfs: partition has {blocks} blocks, {FS_BLOCKS} needed");
    }

    let sb = SuperBlock::new();
    let root = DiskInode::new(ROOT_INODE, ROOT_INODE, InodeKind::Directory, "/")?;
    Inode::new(dev, root).persist()?;
    writesb(&sb, dev)?;
    log::info!("sfs: formatted {blocks} blocks");
    Ok(sb)
}

/// 解析绝对路径，`"/"` 为根目录
pub fn namei(path: &str, sb: &SuperBlock, dev: &Arc<dyn BlockDevice>) -> Result<Inode> {
    let mut current = Inode::get(dev, sb.root)?;

    for name in path.split('/').filter(|name| !name.is_empty()) {
        if !current.disk.is_dir() {
            return Err(Error::NotADirectory);
        }
        current = lookup(&current, name)?.ok_or(Error::NotFound)?;
    }

    Ok(current)
}

/// 在目录的子项中按名字查找
fn lookup(dir: &Inode, name: &str) -> Result<Option<Inode>> {
    for &inum in dir.disk.children() {
        let child = Inode::get(&dir.dev, inum)?;
        if child.name_is(name) {
            return Ok(Some(child));
        }
    }
    Ok(None)
}

/// 创建文件或目录，父目录须已存在。
///
/// inode 编号耗尽不可恢复，直接 panic。
pub fn createi(
    path: &str,
    kind: InodeKind,
    sb: &mut SuperBlock,
    dev: &Arc<dyn BlockDevice>,
) -> Result<Inode> {
    let trimmed = path.trim_end_matches('/');
    let (parent_path, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() {
        // 根目录总是存在
        return Err(Error::AlreadyExists);
    }
    let parent_path = if parent_path.is_empty() { "/" } else { parent_path };

    let mut parent = namei(parent_path, sb, dev)?;
    if !parent.disk.is_dir() {
        return Err(Error::NotADirectory);
    }
    if lookup(&parent, name)?.is_some() {
        return Err(Error::AlreadyExists);
    }
    if parent.disk.children().len() >= crate::MAX_CHILDREN {
        return Err(Error::DirectoryFull);
    }
    // 先校验名字，以免分配出的编号无人使用
    let mut disk = DiskInode::new(0, parent.inum(), kind, name)?;

    let Some(inum) = sb.alloc_inode() else {
        log::error!("sfs: out of inodes creating {path:?}");
        panic!("sfs: out of inodes");
    };
    disk.inum = inum;

    let child = Inode::new(dev, disk);
    child.persist()?;
    parent.disk.push_child(inum)?;
    parent.persist()?;
    writesb(sb, dev)?;

    log::debug!("sfs: created {path:?} as inode {inum}");
    Ok(child)
}

/// 从 `offset` 起读出至多 `dst.len()` 字节，止于文件末尾
pub fn readi(ip: &Inode, dst: &mut [u8], offset: usize) -> Result<usize> {
    if ip.disk.is_dir() {
        return Err(Error::IsADirectory);
    }

    let mut start = offset;
    let end = offset.saturating_add(dst.len()).min(ip.disk.size as usize);
    if start >= end {
        return Ok(0);
    }

    let mut block: DataBlock = [0; BLOCK_SIZE];
    let mut read_size = 0;
    while start < end {
        let block_index = start / BLOCK_SIZE;
        let block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
        let len = block_end - start;
        let inner = start % BLOCK_SIZE;

        ip.dev
            .read_block(ip.disk.blocks()[block_index] as usize, &mut block)?;
        dst[read_size..read_size + len].copy_from_slice(&block[inner..inner + len]);

        read_size += len;
        start = block_end;
    }

    Ok(read_size)
}

/// 从 `offset` 起写入 `src`，按需分配数据块。
///
/// 写入范围之前新分配的块（空洞）填零；只有部分覆盖已有块时才先读后写。
/// 块号表放不下时不做任何分配，返回 [`Error::FileTooLarge`]；
/// 数据块耗尽则 panic。
/// 写块失败时新分配的块仍记在块号表中并落盘，文件大小不变。
pub fn writei(ip: &mut Inode, sb: &mut SuperBlock, src: &[u8], offset: usize) -> Result<usize> {
    if ip.disk.is_dir() {
        return Err(Error::IsADirectory);
    }
    if src.is_empty() {
        return Ok(0);
    }

    let end = offset.checked_add(src.len()).ok_or(Error::FileTooLarge)?;
    let total = end.div_ceil(BLOCK_SIZE);
    let existing = ip.disk.blocks().len();
    if total > MAX_BLOCKS {
        return Err(Error::FileTooLarge);
    }

    for _ in existing..total {
        let Some(block_id) = sb.alloc_block() else {
            log::error!("sfs: out of data blocks writing inode {}", ip.inum());
            panic!("sfs: out of data blocks");
        };
        ip.disk.push_block(block_id);
    }

    let written = write_blocks(ip, existing, src, offset);
    if written.is_ok() {
        ip.disk.size = ip.disk.size.max(end as u32);
    } else {
        log::warn!(
            "sfs: write to inode {} failed, keeping its block table",
            ip.inum()
        );
    }
    ip.persist()?;
    written
}

/// 块号表已覆盖 `[offset, offset + src.len())`；`existing` 之后的块是新分配的
fn write_blocks(ip: &Inode, existing: usize, src: &[u8], offset: usize) -> Result<usize> {
    let end = offset + src.len();
    let zero: DataBlock = [0; BLOCK_SIZE];
    for block_index in existing..offset / BLOCK_SIZE {
        ip.dev
            .write_block(ip.disk.blocks()[block_index] as usize, &zero)?;
    }

    let mut start = offset;
    let mut block: DataBlock = [0; BLOCK_SIZE];
    let mut written = 0;
    while start < end {
        let block_index = start / BLOCK_SIZE;
        let block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
        let len = block_end - start;
        let inner = start % BLOCK_SIZE;
        let block_id = ip.disk.blocks()[block_index] as usize;

        if len < BLOCK_SIZE && block_index < existing {
            ip.dev.read_block(block_id, &mut block)?;
        } else {
            block.fill(0);
        }
        block[inner..inner + len].copy_from_slice(&src[written..written + len]);
        ip.dev.write_block(block_id, &block)?;

        written += len;
        start = block_end;
    }

    Ok(written)
}

pub fn stati(ip: &Inode) -> Stat {
    Stat {
        mode: ip.disk.kind().into(),
        inode: ip.inum() as u64,
        block_size: BLOCK_SIZE as u64,
        blocks: ip.disk.blocks().len() as u64,
        size: ip.disk.size as u64,
    }
}

/// 目录的第 `nth` 个子项
pub fn childi(ip: &Inode, nth: usize) -> Result<Option<InodeId>> {
    if !ip.disk.is_dir() {
        return Err(Error::NotADirectory);
    }
    Ok(ip.disk.children().get(nth).copied())
}

pub fn iname(ip: &Inode) -> String {
    String::from_utf8_lossy(ip.disk.name()).into_owned()
}

/// 根目录的父目录是它自己
pub fn parenti(ip: &Inode) -> InodeId {
    ip.disk.parent
}

pub(crate) fn load_inode(dev: &Arc<dyn BlockDevice>, inum: InodeId) -> Result<Inode> {
    Inode::get(dev, inum)
}
