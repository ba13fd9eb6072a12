//! # 磁盘数据结构层
//!
//! binofs 的磁盘布局（以扇区为单位）：
//!
//! 引导扇区 | 超级块 | 位图(16) | 目录(8) | 数据区
//!
//! 各区域位置固定，与宿主机上的格式化工具逐位兼容。
//! 磁盘上的记录一律按固定偏移、小端序编解码，不依赖内存布局。

mod bitmap;
mod dir_entry;
mod super_block;

pub use self::{
    bitmap::{Bitmap, PartialRange},
    dir_entry::{DirEntry, NAME_CAP, NAME_MAX_LEN, validate_name},
    super_block::SuperBlock,
};
pub(crate) use self::dir_entry::blocks_for;

/// 超级块所在扇区，0 号扇区留给引导程序
pub const SUPER_BLOCK_ID: u32 = 1;
pub const BITMAP_START_BLOCK: u32 = 2;
pub const BITMAP_BLOCKS: u32 = 16;
pub const DIR_START_BLOCK: u32 = BITMAP_START_BLOCK + BITMAP_BLOCKS;
pub const DIR_BLOCKS: u32 = 8;
pub const DATA_START_BLOCK: u32 = DIR_START_BLOCK + DIR_BLOCKS;

pub const VERSION: u32 = 1;

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
