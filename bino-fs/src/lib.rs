#![no_std]

extern crate alloc;

/* binofs 的整体架构，自上而下 */

// 文件操作层：创建、覆盖、读取、删除、枚举
mod bfs;

// 目录管理层：定长目录项表的线性查找
mod directory;

// 磁盘数据结构层：超级块、位图、目录项
pub mod layout;

// 扇区缓冲层：全文件系统唯一的扇区暂存区
mod sector;

mod error;

pub use block_dev::{BlockDevice, DeviceError, Flush};

pub use self::{
    bfs::{BinoFileSystem, FileInfo},
    directory::Slot,
    error::FsError,
    layout::{DirEntry, SuperBlock},
};

/// "BINO"
pub const MAGIC: u32 = 0x42494E4F;
pub const BLOCK_SIZE: usize = block_dev::SECTOR_SIZE;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

type DataBlock = [u8; BLOCK_SIZE];
