mod cli;

use std::io;

use clap::Parser;

use cli::Cli;

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("source={:?} out_dir={:?}", cli.source, cli.out_dir);

    let image = cli.out_dir.join("fs.img");
    let report = sfs_fuse::pack(&cli.source, &image, cli.mbr_start)?;
    println!(
        "{}: {} directories, {} files, {} bytes",
        image.display(),
        report.directories,
        report.files,
        report.bytes
    );

    Ok(())
}
