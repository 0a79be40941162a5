mod block_file;
mod pack;

pub use self::{
    block_file::BlockFile,
    pack::{PackReport, pack},
};
