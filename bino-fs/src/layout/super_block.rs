use super::{DATA_START_BLOCK, VERSION, read_u32, write_u32};
use crate::{DataBlock, MAGIC};

/// 超级块，占据 1 号扇区的前 16 字节，其余字节保留为 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    magic: u32,
    pub version: u32,
    /// 设备的总扇区数
    pub total_blocks: u32,
    /// 数据区的起始扇区
    pub data_start_block: u32,
}

impl SuperBlock {
    const MAGIC_OFFSET: usize = 0;
    const VERSION_OFFSET: usize = 4;
    const TOTAL_OFFSET: usize = 8;
    const DATA_START_OFFSET: usize = 12;

    pub fn new(total_blocks: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            total_blocks,
            data_start_block: DATA_START_BLOCK,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC
    }

    /// 数据区的扇区数
    pub fn data_blocks(&self) -> u32 {
        self.total_blocks.saturating_sub(self.data_start_block)
    }

    pub fn decode(block: &DataBlock) -> Self {
        Self {
            magic: read_u32(block, Self::MAGIC_OFFSET),
            version: read_u32(block, Self::VERSION_OFFSET),
            total_blocks: read_u32(block, Self::TOTAL_OFFSET),
            data_start_block: read_u32(block, Self::DATA_START_OFFSET),
        }
    }

    /// 整块重写，保留字节清零
    pub fn encode(&self, block: &mut DataBlock) {
        block.fill(0);
        write_u32(block, Self::MAGIC_OFFSET, self.magic);
        write_u32(block, Self::VERSION_OFFSET, self.version);
        write_u32(block, Self::TOTAL_OFFSET, self.total_blocks);
        write_u32(block, Self::DATA_START_OFFSET, self.data_start_block);
    }
}
