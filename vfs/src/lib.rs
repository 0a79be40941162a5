#![no_std]

extern crate alloc;

pub mod collections;
mod dirent;
mod error;
mod fs;
mod inode;
pub mod mount;
mod stat;
mod vfs;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result, status},
    fs::{CharDevice, FileSystem, InodeId, InodeKind},
    inode::VfsInode,
    mount::Mount,
    stat::Stat,
    vfs::Vfs,
};
