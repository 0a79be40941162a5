use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use block_dev::{BLOCK_SIZE, BlockDevice, BlockError, Partition};
use vfs::collections::BucketMap;
use vfs::{
    CharDevice, DirEntryType, Error, FileSystem, InodeId, InodeKind, Result, Vfs, VfsInode, status,
};

const TAG: &[u8; 4] = b"TAGS";

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct MemDisk {
    blocks: Mutex<Vec<Vec<u8>>>,
    writes: Mutex<Vec<usize>>,
}

impl MemDisk {
    fn new(blocks: usize) -> Arc<Self> {
        Arc::new(Self {
            blocks: Mutex::new(vec![vec![0; BLOCK_SIZE]; blocks]),
            writes: Mutex::new(Vec::new()),
        })
    }

    fn tagged(blocks: usize) -> Arc<Self> {
        let disk = Self::new(blocks);
        disk.blocks.lock().unwrap()[0][..4].copy_from_slice(TAG);
        disk
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> std::result::Result<(), BlockError> {
        let blocks = self.blocks.lock().unwrap();
        let block = blocks.get(block_id).ok_or(BlockError::OutOfRange)?;
        buf.copy_from_slice(block);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> std::result::Result<(), BlockError> {
        let mut blocks = self.blocks.lock().unwrap();
        let block = blocks.get_mut(block_id).ok_or(BlockError::OutOfRange)?;
        block.copy_from_slice(buf);
        self.writes.lock().unwrap().push(block_id);
        Ok(())
    }

    fn partition(&self) -> Partition {
        Partition::new(0, self.blocks.lock().unwrap().len())
    }
}

/// 超级块即整张路径表，inode 编号是表中下标
#[derive(Debug)]
struct TagSb {
    paths: Vec<String>,
    kinds: Vec<InodeKind>,
    data: Vec<Vec<u8>>,
}

struct TagFs;

fn tag_sb(sb: &dyn Any) -> Result<&TagSb> {
    sb.downcast_ref().ok_or(Error::BadSuperBlock)
}

impl FileSystem for TagFs {
    fn readsb(&self, dev: &Arc<dyn BlockDevice>) -> Option<Box<dyn Any + Send>> {
        let mut block = [0; BLOCK_SIZE];
        dev.read_block(0, &mut block).ok()?;
        (&block[..4] == TAG).then(|| {
            Box::new(TagSb {
                paths: vec![String::from("/")],
                kinds: vec![InodeKind::Directory],
                data: vec![Vec::new()],
            }) as Box<dyn Any + Send>
        })
    }

    fn writesb(&self, sb: &dyn Any, dev: &Arc<dyn BlockDevice>) -> Result<()> {
        let sb = tag_sb(sb)?;
        let mut block = [0; BLOCK_SIZE];
        block[..4].copy_from_slice(TAG);
        block[4] = sb.paths.len() as u8;
        dev.write_block(0, &block)?;
        Ok(())
    }

    fn namei(&self, path: &str, sb: &dyn Any, _: &Arc<dyn BlockDevice>) -> Result<InodeId> {
        tag_sb(sb)?
            .paths
            .iter()
            .position(|p| p == path)
            .map(|i| i as InodeId)
            .ok_or(Error::NotFound)
    }

    fn readi(
        &self,
        inode: InodeId,
        dst: &mut [u8],
        offset: usize,
        sb: &dyn Any,
        _: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let data = &tag_sb(sb)?.data[inode as usize];
        let src = data.get(offset..).unwrap_or_default();
        let len = src.len().min(dst.len());
        dst[..len].copy_from_slice(&src[..len]);
        Ok(len)
    }

    fn createi(
        &self,
        path: &str,
        kind: InodeKind,
        sb: &mut dyn Any,
        _: &Arc<dyn BlockDevice>,
    ) -> Result<InodeId> {
        let sb: &mut TagSb = sb.downcast_mut().ok_or(Error::BadSuperBlock)?;
        if sb.paths.iter().any(|p| p == path) {
            return Err(Error::AlreadyExists);
        }
        sb.paths.push(String::from(path));
        sb.kinds.push(kind);
        sb.data.push(Vec::new());
        Ok(sb.paths.len() as InodeId - 1)
    }

    fn writei(
        &self,
        inode: InodeId,
        src: &[u8],
        offset: usize,
        sb: &mut dyn Any,
        _: &Arc<dyn BlockDevice>,
    ) -> Result<usize> {
        let sb: &mut TagSb = sb.downcast_mut().ok_or(Error::BadSuperBlock)?;
        if sb.kinds[inode as usize] == InodeKind::Directory {
            return Err(Error::IsADirectory);
        }
        let data = &mut sb.data[inode as usize];
        if data.len() < offset + src.len() {
            data.resize(offset + src.len(), 0);
        }
        data[offset..offset + src.len()].copy_from_slice(src);
        Ok(src.len())
    }

    fn iname(&self, inode: InodeId, sb: &dyn Any, _: &Arc<dyn BlockDevice>) -> Result<String> {
        Ok(tag_sb(sb)?.paths[inode as usize].clone())
    }
}

#[derive(Default)]
struct Echo {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
}

impl CharDevice for Echo {
    fn read(&self) -> Option<u8> {
        self.input.lock().unwrap().pop_front()
    }

    fn write(&self, ch: u8) {
        self.output.lock().unwrap().push(ch);
    }
}

fn two_mounts() -> (Vfs, Arc<MemDisk>, Arc<MemDisk>) {
    init();
    let vfs = Vfs::new();
    let root = MemDisk::tagged(4);
    let mnt = MemDisk::tagged(4);
    vfs.register_block("d0", root.clone());
    vfs.register_block("d1", mnt.clone());
    vfs.register_fs("tag", Arc::new(TagFs));
    vfs.mount_fs("/", "d0", "tag");
    vfs.mount_fs("/mnt", "d1", "tag");
    (vfs, root, mnt)
}

fn mount_of(inode: &VfsInode) -> &str {
    inode.mount().unwrap().path()
}

#[test]
fn longest_prefix_selects_mount() {
    let (vfs, _, _) = two_mounts();

    let foo = vfs.createi("/mnt/foo", InodeKind::File).unwrap();
    assert_eq!("/mnt", mount_of(&foo));
    assert_eq!("/foo", foo.iname().unwrap());

    let bar = vfs.createi("/bar", InodeKind::File).unwrap();
    assert_eq!("/", mount_of(&bar));
    assert_eq!("/bar", bar.iname().unwrap());

    // 前缀须止于路径分量边界
    let mntx = vfs.createi("/mntx", InodeKind::File).unwrap();
    assert_eq!("/", mount_of(&mntx));
    assert_eq!("/mntx", mntx.iname().unwrap());

    let mnt_root = vfs.namei("/mnt").unwrap();
    assert_eq!("/mnt", mount_of(&mnt_root));
    assert_eq!(Some(0), mnt_root.id());
    assert_eq!("/", mnt_root.iname().unwrap());
}

#[test]
fn lookup_without_mount() {
    init();
    let vfs = Vfs::new();
    assert_eq!(Error::NotFound, vfs.namei("/anything").unwrap_err());
}

#[test]
fn nested_mount_wins_over_parent() {
    let (vfs, _, _) = two_mounts();
    let deep = MemDisk::tagged(2);
    vfs.register_block("d2", deep);
    vfs.mount_fs("/mnt/deep/", "d2", "tag");

    let file = vfs.createi("/mnt/deep/x", InodeKind::File).unwrap();
    assert_eq!("/mnt/deep", mount_of(&file));
    assert_eq!("/x", file.iname().unwrap());

    let other = vfs.createi("/mnt/deeper", InodeKind::File).unwrap();
    assert_eq!("/mnt", mount_of(&other));
}

#[test]
fn remount_replaces_binding() {
    let (vfs, _, _) = two_mounts();
    vfs.createi("/mnt/old", InodeKind::File).unwrap();

    let fresh = MemDisk::tagged(4);
    vfs.register_block("d3", fresh.clone());
    let mount = vfs.mount_fs("/mnt", "d3", "tag");
    assert_eq!(4, mount.block_device().partition().blocks());

    assert_eq!(Error::NotFound, vfs.namei("/mnt/old").unwrap_err());
}

#[test]
fn write_persists_super_block() {
    let (vfs, _, mnt) = two_mounts();
    let file = vfs.createi("/mnt/data", InodeKind::File).unwrap();
    mnt.writes.lock().unwrap().clear();

    assert_eq!(5, file.writei(b"hello", 3).unwrap());
    assert_eq!(vec![0], *mnt.writes.lock().unwrap());
    assert_eq!(2, mnt.blocks.lock().unwrap()[0][4]);

    let mut buf = [0xff; 16];
    assert_eq!(8, file.readi(&mut buf, 0).unwrap());
    assert_eq!(b"\0\0\0hello", &buf[..8]);

    // 写失败仍会回写超级块
    let dir = vfs.namei("/mnt").unwrap();
    assert_eq!(Error::IsADirectory, dir.writei(b"x", 0).unwrap_err());
    assert_eq!(vec![0, 0], *mnt.writes.lock().unwrap());
}

#[test]
fn unsupported_operations() {
    let (vfs, _, _) = two_mounts();
    let root = vfs.namei("/").unwrap();
    assert_eq!(Error::Unsupported, root.stati().unwrap_err());
    assert_eq!(Error::Unsupported, root.childi(0).unwrap_err());
    assert_eq!(Error::Unsupported, root.parenti().unwrap_err());
}

#[test]
fn char_special_device() {
    let (vfs, _, _) = two_mounts();
    let echo = Arc::new(Echo::default());
    echo.input.lock().unwrap().extend(b"hi");
    vfs.register_char("console", echo.clone());
    vfs.mount_char("/dev/console", "console");

    let console = vfs.namei("/dev/console").unwrap();
    assert!(console.is_special());
    assert_eq!(None, console.id());
    assert_eq!("console", console.iname().unwrap());
    assert_eq!(DirEntryType::Char, console.stati().unwrap().mode);
    assert!(console.stati().unwrap().mode.is_special());

    let mut buf = [0; 8];
    assert_eq!(2, console.readi(&mut buf, 0).unwrap());
    assert_eq!(b"hi", &buf[..2]);
    assert_eq!(0, console.readi(&mut buf, 0).unwrap());

    assert_eq!(3, console.writei(b"abc", 0).unwrap());
    assert_eq!(b"abc", echo.output.lock().unwrap().as_slice());

    // createi 命中特殊文件时直接返回它
    let again = vfs.createi("/dev/console", InodeKind::File).unwrap();
    assert!(again.is_special());
    assert_eq!(Error::NotADirectory, again.childi(0).unwrap_err());
}

#[test]
fn block_special_device() {
    let (vfs, _, _) = two_mounts();
    let raw = MemDisk::new(2);
    vfs.register_block("raw", raw.clone());
    vfs.mount_block("/dev/raw", "raw");

    let dev = vfs.namei("/dev/raw").unwrap();
    let stat = dev.stati().unwrap();
    assert_eq!(DirEntryType::Block, stat.mode);
    assert_eq!(2, stat.blocks);
    assert_eq!(2 * BLOCK_SIZE as u64, stat.size);

    // 跨块写入，保留块内其余字节
    raw.blocks.lock().unwrap()[0][0] = 7;
    let data = [9u8; 20];
    assert_eq!(20, dev.writei(&data, BLOCK_SIZE - 10).unwrap());
    {
        let blocks = raw.blocks.lock().unwrap();
        assert_eq!(7, blocks[0][0]);
        assert_eq!([9; 10], blocks[0][BLOCK_SIZE - 10..]);
        assert_eq!([9; 10], blocks[1][..10]);
        assert_eq!(0, blocks[1][10]);
    }

    // 超出分区容量的部分被截断
    assert_eq!(4, dev.writei(&[1; 8], 2 * BLOCK_SIZE - 4).unwrap());
    assert_eq!(0, dev.writei(&[1; 8], 2 * BLOCK_SIZE).unwrap());

    let mut buf = [0; 32];
    assert_eq!(32, dev.readi(&mut buf, BLOCK_SIZE - 16).unwrap());
    assert_eq!([0; 6], buf[..6]);
    assert_eq!([9; 20], buf[6..26]);
    assert_eq!(4, dev.readi(&mut buf, 2 * BLOCK_SIZE - 4).unwrap());
    assert_eq!([1; 4], buf[..4]);
}

#[test]
fn block_special_far_offset() {
    let (vfs, _, _) = two_mounts();
    let raw = MemDisk::new(2);
    vfs.register_block("raw", raw.clone());
    vfs.mount_block("/dev/raw", "raw");

    let dev = vfs.namei("/dev/raw").unwrap();
    assert_eq!(0, dev.readi(&mut [0; 8], usize::MAX - 2).unwrap());
    assert_eq!(0, dev.writei(&[1; 8], usize::MAX - 2).unwrap());
    assert!(raw.writes.lock().unwrap().is_empty());
}

#[test]
fn mount_through_block_special() {
    let (vfs, _, _) = two_mounts();
    let disk = MemDisk::tagged(2);
    vfs.register_block("d9", disk);
    vfs.mount_block("/dev/d9", "d9");
    vfs.mount_fs("/data", "/dev/d9", "tag");

    let file = vfs.createi("/data/f", InodeKind::File).unwrap();
    assert_eq!("/data", mount_of(&file));
    assert_eq!("tag", file.mount().unwrap().fs_name());
}

#[test]
#[should_panic(expected = "no filesystem")]
fn mount_unknown_fs() {
    let (vfs, _, _) = two_mounts();
    vfs.mount_fs("/x", "d0", "ext2");
}

#[test]
#[should_panic(expected = "no block device")]
fn mount_unknown_device() {
    let (vfs, _, _) = two_mounts();
    vfs.mount_fs("/x", "sdz", "tag");
}

#[test]
#[should_panic(expected = "bad super block")]
fn mount_bad_super_block() {
    let (vfs, _, _) = two_mounts();
    vfs.register_block("blank", MemDisk::new(2));
    vfs.mount_fs("/x", "blank", "tag");
}

#[test]
#[should_panic(expected = "no char device")]
fn bind_unknown_char_device() {
    let (vfs, _, _) = two_mounts();
    vfs.mount_char("/dev/tty", "tty");
}

#[test]
fn status_codes() {
    assert_eq!(12, status(Ok(12)));
    assert_eq!(-1, status(Err(Error::NotFound)));
    assert_eq!(-1, status(Err(Error::Io(BlockError::Device))));
}

#[test]
fn bucket_map_replace_and_collide() {
    let mut map: BucketMap<String, u32> = BucketMap::new();
    assert!(map.is_empty());
    assert_eq!(None, map.put(String::from("ab"), 1));
    // 累加哈希下 "ab" 与 "ba" 落在同一个桶
    assert_eq!(None, map.put(String::from("ba"), 2));
    assert_eq!(2, map.len());

    assert_eq!(Some(1), map.put(String::from("ab"), 3));
    assert_eq!(2, map.len());
    assert_eq!(Some(&3), map.get("ab"));
    assert_eq!(Some(&2), map.get("ba"));
    assert!(!map.contains_key("aab"));

    let mut keys: Vec<_> = map.keys().cloned().collect();
    keys.sort();
    assert_eq!(vec!["ab", "ba"], keys);
}
