use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Image file to create
    #[arg(long, short, default_value = "fs.img")]
    pub out: PathBuf,

    /// Image size in 512-byte sectors
    #[arg(long, short, default_value_t = 20480)]
    pub sectors: u32,

    /// Host files to pack, stored under their file names
    pub files: Vec<PathBuf>,
}
