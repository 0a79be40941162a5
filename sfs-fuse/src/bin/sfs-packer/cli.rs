use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Cli {
    /// Directory whose contents go into the image
    #[arg(long, short)]
    pub source: PathBuf,

    /// Output directory, the image is written as `fs.img`
    #[arg(long, short = 'O')]
    pub out_dir: PathBuf,

    /// Put an MBR in front and start the filesystem at this block
    #[arg(long)]
    pub mbr_start: Option<usize>,
}
