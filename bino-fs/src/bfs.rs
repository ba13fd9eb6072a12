use alloc::{string::String, sync::Arc, vec::Vec};

use block_dev::{BlockDevice, Flush};
use log::{debug, info, warn};
use spin::Mutex;

use crate::{
    BLOCK_SIZE, DirEntry, FsError, SuperBlock,
    directory::Directory,
    layout::{
        BITMAP_BLOCKS, BITMAP_START_BLOCK, Bitmap, DATA_START_BLOCK, DIR_BLOCKS, DIR_START_BLOCK,
        SUPER_BLOCK_ID, blocks_for, validate_name,
    },
    sector::SectorBuf,
};

/// binofs 文件系统
///
/// 扁平的根目录、连续分配的文件。
/// 只能通过[`BinoFileSystem::mount`]或[`BinoFileSystem::format`]得到，
/// 故持有此类型即意味着已挂载。
#[derive(Debug)]
pub struct BinoFileSystem {
    sector: SectorBuf,
    super_block: SuperBlock,
    bitmap: Bitmap,
    directory: Directory,
}

/// 枚举目录时得到的文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u32,
}

impl BinoFileSystem {
    /// 在设备上建立空的文件系统：清空位图与目录，写入超级块
    pub fn format(device: Arc<dyn BlockDevice>, total_blocks: u32) -> Result<Self, FsError> {
        if total_blocks <= DATA_START_BLOCK {
            return Err(FsError::NoSpace);
        }

        let mut sector = SectorBuf::new(device);
        for block_id in BITMAP_START_BLOCK..DATA_START_BLOCK {
            sector.overwrite(block_id, |block| block.fill(0))?;
        }
        let super_block = SuperBlock::new(total_blocks);
        sector.overwrite(SUPER_BLOCK_ID, |block| super_block.encode(block))?;

        info!("binofs: formatted {total_blocks} blocks");
        Ok(Self::assemble(sector, super_block))
    }

    /// 读超级块并校验魔数
    pub fn mount(device: Arc<dyn BlockDevice>) -> Result<Self, FsError> {
        let mut sector = SectorBuf::new(device);
        let super_block = sector.read(SUPER_BLOCK_ID, SuperBlock::decode)?;

        if !super_block.is_valid() || super_block.data_start_block != DATA_START_BLOCK {
            warn!("binofs: no filesystem on device");
            return Err(FsError::NotMounted);
        }

        info!(
            "binofs: mounted, {} blocks, data at {}",
            super_block.total_blocks, super_block.data_start_block
        );
        Ok(Self::assemble(sector, super_block))
    }

    /// 挂载，并包装为可在多处共享的形式
    pub fn open_shared(device: Arc<dyn BlockDevice>) -> Result<Arc<Mutex<Self>>, FsError> {
        Ok(Arc::new(Mutex::new(Self::mount(device)?)))
    }

    fn assemble(sector: SectorBuf, super_block: SuperBlock) -> Self {
        Self {
            sector,
            bitmap: Bitmap::new(
                BITMAP_START_BLOCK,
                BITMAP_BLOCKS,
                super_block.data_start_block,
                super_block.data_blocks(),
            ),
            directory: Directory::new(DIR_START_BLOCK, DIR_BLOCKS),
            super_block,
        }
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        self.sector.device()
    }

    /// 目录最多容纳的文件数
    #[inline]
    pub fn capacity(&self) -> usize {
        self.directory.capacity()
    }
}

/* 文件操作 */
impl BinoFileSystem {
    /// 查找文件的目录项
    pub fn lookup(&mut self, name: &str) -> Result<DirEntry, FsError> {
        let name = validate_name(name)?;
        let (entry, _) = self
            .directory
            .find(&mut self.sector, name)?
            .ok_or(FsError::NotFound)?;
        Ok(entry)
    }

    /// 读出文件内容，返回读出的字节数，即文件大小与`buf`长度中的较小者
    pub fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        let entry = self.lookup(name)?;
        self.check_extent(&entry)?;

        let len = buf.len().min(entry.size as usize);
        for (i, chunk) in buf[..len].chunks_mut(BLOCK_SIZE).enumerate() {
            self.sector.read(entry.start_block + i as u32, |block| {
                chunk.copy_from_slice(&block[..chunk.len()])
            })?;
        }

        debug!("binofs: read {len} bytes from {name:?}");
        Ok(len)
    }

    /// 创建或覆盖文件
    ///
    /// 原有空间足够时原地覆盖，位图不变；
    /// 否则另找连续空间，目录更新成功后才释放原有空间。
    /// 失败时撤销本次新分配的扇区，原文件保持原样。
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<Flush, FsError> {
        let name = validate_name(name)?;
        let size = u32::try_from(data.len()).map_err(|_| FsError::NoSpace)?;
        let needed = blocks_for(size);

        let existing = self.directory.find(&mut self.sector, name)?;
        let slot = match existing {
            Some((_, slot)) => slot,
            None => self
                .directory
                .find_free_slot(&mut self.sector)?
                .ok_or(FsError::NoSpace)?,
        };

        let mut flush = Flush::Confirmed;
        let (start, fresh) = match existing {
            Some((old, _)) if old.blocks() >= needed => {
                self.check_extent(&old)?;
                (old.start_block, false)
            }
            // 新建的空文件不占扇区
            _ if needed == 0 => (0, false),
            _ => {
                let (start, f) = self.allocate(needed)?;
                flush = flush.and(f);
                (start, true)
            }
        };

        let written = self.write_data(start, data).and_then(|f| {
            let entry = DirEntry::new(name, start, size);
            Ok(f.and(self.directory.write_entry(&mut self.sector, slot, &entry)?))
        });
        match written {
            Ok(f) => flush = flush.and(f),
            Err(e) => {
                if fresh && self.release(start, needed).is_err() {
                    warn!("binofs: leaked {needed} blocks at {start} after failed write");
                }
                return Err(e);
            }
        }

        if fresh {
            // 越界的旧范围不在位图内，无需释放
            if let Some((old, _)) = existing
                .filter(|(old, _)| old.blocks() > 0 && self.check_extent(old).is_ok())
            {
                match self.release(old.start_block, old.blocks()) {
                    Ok(f) => flush = flush.and(f),
                    Err(e) => warn!(
                        "binofs: leaked {} blocks at {}: {e}",
                        old.blocks(),
                        old.start_block
                    ),
                }
            }
        }

        debug!(
            "binofs: wrote {size} bytes to {:?} at block {start}{}",
            String::from_utf8_lossy(name),
            if fresh { "" } else { " (in place)" }
        );
        Ok(flush)
    }

    /// 删除文件：先清除目录项，再释放其扇区
    pub fn remove(&mut self, name: &str) -> Result<Flush, FsError> {
        let name = validate_name(name)?;
        let (entry, slot) = self
            .directory
            .find(&mut self.sector, name)?
            .ok_or(FsError::NotFound)?;

        let mut flush = self.directory.clear_entry(&mut self.sector, slot)?;
        if entry.blocks() > 0 {
            match self.check_extent(&entry) {
                Ok(()) => flush = flush.and(self.release(entry.start_block, entry.blocks())?),
                Err(_) => warn!(
                    "binofs: removed entry pointed outside data area ({}+{})",
                    entry.start_block,
                    entry.blocks()
                ),
            }
        }

        debug!("binofs: removed {:?}", String::from_utf8_lossy(name));
        Ok(flush)
    }

    /// 按槽位顺序列出所有文件
    pub fn list(&mut self) -> Result<Vec<FileInfo>, FsError> {
        let entries = self.directory.entries(&mut self.sector)?;
        Ok(entries
            .into_iter()
            .map(|(_, entry)| FileInfo {
                name: String::from_utf8_lossy(entry.name()).into_owned(),
                size: entry.size,
            })
            .collect())
    }

    pub fn count(&mut self) -> Result<usize, FsError> {
        Ok(self.directory.entries(&mut self.sector)?.len())
    }
}

/* 空间管理 */
impl BinoFileSystem {
    /// 最靠前的`needed`个连续空闲扇区
    pub fn find_free_run(&mut self, needed: u32) -> Result<Option<u32>, FsError> {
        Ok(self.bitmap.find_free_run(&mut self.sector, needed)?)
    }

    pub fn is_allocated(&mut self, block_id: u32) -> Result<bool, FsError> {
        self.bitmap.is_allocated(&mut self.sector, block_id)
    }

    pub fn allocated_blocks(&mut self) -> Result<u32, FsError> {
        Ok(self.bitmap.count_allocated(&mut self.sector)?)
    }

    /// 找到并标记连续空间；标记中途失败则撤销已标记的部分
    fn allocate(&mut self, needed: u32) -> Result<(u32, Flush), FsError> {
        let start = self
            .bitmap
            .find_free_run(&mut self.sector, needed)?
            .ok_or(FsError::NoSpace)?;

        match self.bitmap.set_range(&mut self.sector, start, needed, true) {
            Ok(flush) => Ok((start, flush)),
            Err(partial) => {
                if self.release(start, partial.done).is_err() {
                    warn!(
                        "binofs: leaked {} blocks at {start} after failed marking",
                        partial.done
                    );
                }
                Err(partial.error)
            }
        }
    }

    /// 释放`[start, start + count)`：逐位清除，失败的位记录后继续，
    /// 返回第一个错误
    fn release(&mut self, start: u32, count: u32) -> Result<Flush, FsError> {
        let mut flush = Flush::Confirmed;
        let mut first_err = None;
        for block_id in start..start.saturating_add(count) {
            match self.bitmap.set(&mut self.sector, block_id, false) {
                Ok(f) => flush = flush.and(f),
                Err(e) => {
                    warn!("binofs: failed to free block {block_id}: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(flush),
        }
    }

    /// 文件内容按扇区写入数据区，末扇区的剩余部分补零
    fn write_data(&mut self, start: u32, data: &[u8]) -> Result<Flush, FsError> {
        let mut flush = Flush::Confirmed;
        for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            flush = flush.and(self.sector.overwrite(start + i as u32, |block| {
                block[..chunk.len()].copy_from_slice(chunk);
                block[chunk.len()..].fill(0);
            })?);
        }
        Ok(flush)
    }

    /// 文件占用的扇区须全部落在数据区内
    fn check_extent(&self, entry: &DirEntry) -> Result<(), FsError> {
        let blocks = entry.blocks();
        if blocks == 0 {
            return Ok(());
        }
        let start = entry.start_block;
        let end = start.checked_add(blocks).ok_or(FsError::Corrupted)?;
        if start < self.super_block.data_start_block
            || end - self.super_block.data_start_block > self.bitmap.capacity()
        {
            return Err(FsError::Corrupted);
        }
        Ok(())
    }
}
