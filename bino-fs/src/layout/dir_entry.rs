use super::{read_u32, write_u32};
use crate::{BLOCK_SIZE, FsError};

/// 文件名字段的宽度，含结尾的`\0`
pub const NAME_CAP: usize = 32;
pub const NAME_MAX_LEN: usize = NAME_CAP - 1;

/// 目录项，磁盘上占 44 字节：
///
/// 名字(32) | 起始扇区(4) | 字节数(4) | 占用标志(1) | 填充(3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    name: [u8; NAME_CAP],
    pub start_block: u32,
    pub size: u32,
    used: bool,
}

impl DirEntry {
    pub const SIZE: usize = 44;
    /// 每个扇区容纳的目录项数，扇区末尾的零头不用
    pub const PER_BLOCK: usize = BLOCK_SIZE / Self::SIZE;

    const START_OFFSET: usize = 32;
    const SIZE_OFFSET: usize = 36;
    const USED_OFFSET: usize = 40;

    /// `name`须先经过[`validate_name`]
    pub fn new(name: &[u8], start_block: u32, size: u32) -> Self {
        let mut buf = [0; NAME_CAP];
        buf[..name.len()].copy_from_slice(name);
        Self {
            name: buf,
            start_block,
            size,
            used: true,
        }
    }

    pub fn empty() -> Self {
        Self {
            name: [0; NAME_CAP],
            start_block: 0,
            size: 0,
            used: false,
        }
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// 名字在第一个`\0`处截止，32 字节全满时取全部
    pub fn name(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    /// 在名字字段宽度内比较，遇`\0`截止
    pub fn name_eq(&self, name: &[u8]) -> bool {
        let name = &name[..name.len().min(NAME_CAP)];
        let name = match name.iter().position(|&b| b == 0) {
            Some(len) => &name[..len],
            None => name,
        };
        self.name() == name
    }

    /// 文件占用的扇区数
    pub fn blocks(&self) -> u32 {
        blocks_for(self.size)
    }

    pub fn decode(bytes: &[u8]) -> Self {
        let mut name = [0; NAME_CAP];
        name.copy_from_slice(&bytes[..NAME_CAP]);
        Self {
            name,
            start_block: read_u32(bytes, Self::START_OFFSET),
            size: read_u32(bytes, Self::SIZE_OFFSET),
            used: bytes[Self::USED_OFFSET] != 0,
        }
    }

    pub fn encode(&self, bytes: &mut [u8]) {
        let bytes = &mut bytes[..Self::SIZE];
        bytes.fill(0);
        bytes[..NAME_CAP].copy_from_slice(&self.name);
        write_u32(bytes, Self::START_OFFSET, self.start_block);
        write_u32(bytes, Self::SIZE_OFFSET, self.size);
        bytes[Self::USED_OFFSET] = self.used as u8;
    }
}

pub(crate) fn blocks_for(size: u32) -> u32 {
    size.div_ceil(BLOCK_SIZE as u32)
}

/// 合法的名字为 1..=31 字节且不含`\0`
pub fn validate_name(name: &str) -> Result<&[u8], FsError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > NAME_MAX_LEN || bytes.contains(&0) {
        return Err(FsError::InvalidName);
    }
    Ok(bytes)
}
