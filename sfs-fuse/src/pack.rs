//! 把宿主机目录打包成 SFS 镜像

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::mbr::MasterBootRecord;
use block_dev::{BLOCK_SIZE, BlockDevice, Partition};
use sfs::FS_BLOCKS;
use vfs::{InodeKind, Vfs};

use crate::BlockFile;

/// Linux 分区类型
const PARTITION_KIND: u8 = 0x83;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackReport {
    pub directories: usize,
    pub files: usize,
    pub bytes: usize,
}

fn fs_error(err: vfs::Error) -> io::Error {
    io::Error::other(err.to_string())
}

/// 在 `image` 处建立镜像并写入 `source` 下的全部内容。
///
/// 给出 `mbr_start` 时镜像带分区表，文件系统位于从该块开始的唯一分区。
pub fn pack(source: &Path, image: &Path, mbr_start: Option<usize>) -> io::Result<PackReport> {
    let start = mbr_start.unwrap_or(0);
    if mbr_start == Some(0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "partition cannot start at the partition table",
        ));
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(image)?;
    file.set_len(((start + FS_BLOCKS) * BLOCK_SIZE) as u64)?;

    if mbr_start.is_some() {
        let mbr = MasterBootRecord::with_partitions(&[(
            PARTITION_KIND,
            start as u32,
            FS_BLOCKS as u32,
        )]);
        file.write_all(&mbr.to_bytes())?;
        log::info!("partition table written, fs at block {start}");
    }

    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::new(
        file,
        Partition::new(start, start + FS_BLOCKS),
    ));
    sfs::format(&dev).map_err(fs_error)?;

    let vfs = Vfs::new();
    vfs.register_block("image", dev);
    sfs::register(&vfs);
    vfs.mount_fs("/", "image", sfs::NAME);

    let mut report = PackReport::default();
    copy_dir(&vfs, source, "", &mut report)?;
    log::info!(
        "packed {} directories, {} files, {} bytes",
        report.directories,
        report.files,
        report.bytes
    );
    Ok(report)
}

fn copy_dir(vfs: &Vfs, host: &Path, prefix: &str, report: &mut PackReport) -> io::Result<()> {
    let mut entries = fs::read_dir(host)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_str().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "file name is not UTF-8")
        })?;
        let path = format!("{prefix}/{name}");

        if entry.file_type()?.is_dir() {
            log::debug!("mkdir {path}");
            vfs.createi(&path, InodeKind::Directory).map_err(fs_error)?;
            report.directories += 1;
            copy_dir(vfs, &entry.path(), &path, report)?;
        } else {
            let data = fs::read(entry.path())?;
            log::debug!("copy {path}, {} bytes", data.len());
            let inode = vfs.createi(&path, InodeKind::File).map_err(fs_error)?;
            inode.writei(&data, 0).map_err(fs_error)?;
            report.files += 1;
            report.bytes += data.len();
        }
    }

    Ok(())
}
