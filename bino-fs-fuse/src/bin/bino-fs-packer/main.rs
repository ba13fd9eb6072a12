mod cli;

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Arc;

use bino_fs::{BinoFileSystem, FsError};
use bino_fs_fuse::BlockFile;
use block_dev::SECTOR_SIZE;
use clap::Parser;
use cli::Cli;

fn fs_error(what: &str, e: FsError) -> io::Error {
    io::Error::other(format!("{what}: {e}"))
}

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    println!("image={:?}, {} sectors", cli.out, cli.sectors);

    let block_file = Arc::new(BlockFile::new({
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&cli.out)?;
        fd.set_len(u64::from(cli.sectors) * SECTOR_SIZE as u64)?;

        fd
    }));

    let mut fs = BinoFileSystem::format(block_file.clone(), cli.sectors)
        .map_err(|e| fs_error("format", e))?;

    for path in &cli.files {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| io::Error::other(format!("{path:?}: not a file name")))?;
        let data = fs::read(path)?;

        log::info!("packing {name:?}, {} bytes", data.len());
        fs.write(name, &data).map_err(|e| fs_error(name, e))?;
    }
    block_file.sync()?;

    for file in fs.list().map_err(|e| fs_error("list", e))? {
        println!("{:>31} {:>8}", file.name, file.size);
    }

    Ok(())
}
