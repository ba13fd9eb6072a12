use block_dev::{DeviceError, Flush};
use log::trace;

use crate::{BLOCK_BITS, FsError, sector::SectorBuf};

/// 位图区域，记录数据区的扇区分配情况
///
/// 第`i`个数据扇区对应位图第`i / 4096`个扇区内
/// 第`(i / 8) % 512`字节的第`i % 8`位（低位在前），置 1 表示已分配。
#[derive(Debug)]
pub struct Bitmap {
    /// 位图的起始扇区
    start_block_id: u32,
    /// 位图占用扇区数
    blocks: u32,
    /// 所指示区域的起始扇区
    area_start: u32,
    /// 所指示区域内可用的扇区数，不超过位图的位数
    capacity: u32,
}

/// 区间修改中途失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialRange {
    /// 失败前已修改的位数
    pub done: u32,
    pub error: FsError,
}

/// 位在位图内的位置
#[derive(Debug, PartialEq, Eq)]
struct BitPos {
    block_index: u32,
    byte: usize,
    mask: u8,
}

impl BitPos {
    fn of(index: u32) -> Self {
        let index = index as usize;
        Self {
            block_index: (index / BLOCK_BITS) as u32,
            byte: index % BLOCK_BITS / 8,
            mask: 1 << (index % 8),
        }
    }
}

impl Bitmap {
    pub fn new(start_block_id: u32, blocks: u32, area_start: u32, area_blocks: u32) -> Self {
        Self {
            start_block_id,
            blocks,
            area_start,
            capacity: area_blocks.min(blocks * BLOCK_BITS as u32),
        }
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 扇区号到位序号
    fn index_of(&self, block_id: u32) -> Result<u32, FsError> {
        block_id
            .checked_sub(self.area_start)
            .filter(|&index| index < self.capacity)
            .ok_or(FsError::Corrupted)
    }

    /// 首次适配：找出最靠前的`needed`个连续空闲扇区，返回起始扇区号。
    /// 每个位图扇区只读一次。
    pub fn find_free_run(
        &self,
        sector: &mut SectorBuf,
        needed: u32,
    ) -> Result<Option<u32>, DeviceError> {
        if needed == 0 {
            return Ok(None);
        }

        let mut run_start = 0;
        let mut run_len = 0;
        for block_index in 0..self.blocks {
            let first = block_index * BLOCK_BITS as u32;
            if first >= self.capacity {
                break;
            }
            let last = (first + BLOCK_BITS as u32).min(self.capacity);

            let found = sector.read(self.start_block_id + block_index, |block| {
                for index in first..last {
                    let pos = BitPos::of(index);
                    if block[pos.byte] & pos.mask != 0 {
                        run_len = 0;
                        continue;
                    }
                    if run_len == 0 {
                        run_start = index;
                    }
                    run_len += 1;
                    if run_len == needed {
                        return Some(run_start);
                    }
                }
                None
            })?;

            if let Some(start) = found {
                return Ok(Some(self.area_start + start));
            }
        }

        Ok(None)
    }

    /// 修改一个扇区的分配位，读-改-写所在的位图扇区
    pub fn set(
        &self,
        sector: &mut SectorBuf,
        block_id: u32,
        allocated: bool,
    ) -> Result<Flush, FsError> {
        let pos = BitPos::of(self.index_of(block_id)?);
        trace!("bitmap: block {block_id} -> {allocated}");
        let flush = sector.modify(self.start_block_id + pos.block_index, |block| {
            if allocated {
                block[pos.byte] |= pos.mask;
            } else {
                block[pos.byte] &= !pos.mask;
            }
        })?;
        Ok(flush)
    }

    /// 逐位修改`[start, start + count)`，遇错即停
    pub fn set_range(
        &self,
        sector: &mut SectorBuf,
        start: u32,
        count: u32,
        allocated: bool,
    ) -> Result<Flush, PartialRange> {
        let mut flush = Flush::Confirmed;
        for done in 0..count {
            match self.set(sector, start.saturating_add(done), allocated) {
                Ok(f) => flush = flush.and(f),
                Err(error) => return Err(PartialRange { done, error }),
            }
        }
        Ok(flush)
    }

    pub fn is_allocated(&self, sector: &mut SectorBuf, block_id: u32) -> Result<bool, FsError> {
        let pos = BitPos::of(self.index_of(block_id)?);
        let bit = sector.read(self.start_block_id + pos.block_index, |block| {
            block[pos.byte] & pos.mask != 0
        })?;
        Ok(bit)
    }

    /// 已分配的扇区数
    pub fn count_allocated(&self, sector: &mut SectorBuf) -> Result<u32, DeviceError> {
        let mut count = 0;
        for block_index in 0..self.blocks {
            let first = block_index * BLOCK_BITS as u32;
            if first >= self.capacity {
                break;
            }
            let last = (first + BLOCK_BITS as u32).min(self.capacity);
            count += sector.read(self.start_block_id + block_index, |block| {
                (first..last)
                    .filter(|&index| {
                        let pos = BitPos::of(index);
                        block[pos.byte] & pos.mask != 0
                    })
                    .count() as u32
            })?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_position() {
        assert_eq!(
            BitPos {
                block_index: 0,
                byte: 0,
                mask: 1
            },
            BitPos::of(0)
        );
        assert_eq!(
            BitPos {
                block_index: 0,
                byte: 1,
                mask: 1 << 1
            },
            BitPos::of(9)
        );
        assert_eq!(
            BitPos {
                block_index: 1,
                byte: 0,
                mask: 1 << 1
            },
            BitPos::of(4097)
        );
        assert_eq!(
            BitPos {
                block_index: 15,
                byte: 511,
                mask: 1 << 7
            },
            BitPos::of(16 * 4096 - 1)
        );
    }

    #[test]
    fn capacity_is_bounded() {
        assert_eq!(38, Bitmap::new(2, 16, 26, 38).capacity());
        assert_eq!(65536, Bitmap::new(2, 16, 26, 1 << 20).capacity());
    }
}
