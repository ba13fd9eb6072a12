//! # 目录管理层
//!
//! 根目录是一张定长的目录项表，按槽位顺序线性扫描。
//! 名字相同的项以槽位最靠前者为准。

use alloc::vec::Vec;

use block_dev::{DeviceError, Flush};

use crate::{DirEntry, sector::SectorBuf};

/// 目录项在表内的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Slot(pub usize);

#[derive(Debug)]
pub struct Directory {
    start_block_id: u32,
    blocks: u32,
}

impl Directory {
    pub const fn new(start_block_id: u32, blocks: u32) -> Self {
        Self {
            start_block_id,
            blocks,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks as usize * DirEntry::PER_BLOCK
    }

    /// 槽位所在的扇区，以及在扇区内的字节偏移
    fn locate(&self, slot: Slot) -> (u32, usize) {
        let block_id = self.start_block_id + (slot.0 / DirEntry::PER_BLOCK) as u32;
        let offset = slot.0 % DirEntry::PER_BLOCK * DirEntry::SIZE;
        (block_id, offset)
    }

    /// 按槽位顺序扫描所有目录项，直到`f`给出结果
    fn scan<V>(
        &self,
        sector: &mut SectorBuf,
        mut f: impl FnMut(Slot, DirEntry) -> Option<V>,
    ) -> Result<Option<V>, DeviceError> {
        for block_index in 0..self.blocks {
            let found = sector.read(self.start_block_id + block_index, |block| {
                block
                    .chunks_exact(DirEntry::SIZE)
                    .enumerate()
                    .find_map(|(i, raw)| {
                        let slot = Slot(block_index as usize * DirEntry::PER_BLOCK + i);
                        f(slot, DirEntry::decode(raw))
                    })
            })?;
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// 查找名为`name`的在用目录项
    pub fn find(
        &self,
        sector: &mut SectorBuf,
        name: &[u8],
    ) -> Result<Option<(DirEntry, Slot)>, DeviceError> {
        self.scan(sector, |slot, entry| {
            (entry.is_used() && entry.name_eq(name)).then_some((entry, slot))
        })
    }

    /// 最靠前的空闲槽位
    pub fn find_free_slot(&self, sector: &mut SectorBuf) -> Result<Option<Slot>, DeviceError> {
        self.scan(sector, |slot, entry| (!entry.is_used()).then_some(slot))
    }

    pub fn write_entry(
        &self,
        sector: &mut SectorBuf,
        slot: Slot,
        entry: &DirEntry,
    ) -> Result<Flush, DeviceError> {
        let (block_id, offset) = self.locate(slot);
        sector.modify(block_id, |block| entry.encode(&mut block[offset..]))
    }

    /// 整项清零
    pub fn clear_entry(&self, sector: &mut SectorBuf, slot: Slot) -> Result<Flush, DeviceError> {
        self.write_entry(sector, slot, &DirEntry::empty())
    }

    /// 全部在用的目录项，按槽位顺序
    pub fn entries(&self, sector: &mut SectorBuf) -> Result<Vec<(Slot, DirEntry)>, DeviceError> {
        let mut entries = Vec::new();
        self.scan::<()>(sector, |slot, entry| {
            if entry.is_used() {
                entries.push((slot, entry));
            }
            None
        })?;
        Ok(entries)
    }
}
