#![allow(dead_code)]

use std::ops::Range;
use std::sync::{Arc, Mutex};

use bino_fs::{BLOCK_SIZE, BinoFileSystem, BlockDevice, DeviceError, Flush};

pub type Sector = [u8; BLOCK_SIZE];

/// 内存中的磁盘
pub struct RamDisk {
    sectors: Mutex<Vec<Sector>>,
    flush: Flush,
}

impl RamDisk {
    pub fn new(blocks: usize) -> Self {
        Self::with_flush(blocks, Flush::Confirmed)
    }

    pub fn with_flush(blocks: usize, flush: Flush) -> Self {
        Self {
            sectors: Mutex::new(vec![[0; BLOCK_SIZE]; blocks]),
            flush,
        }
    }

    pub fn sector(&self, block_id: usize) -> Sector {
        self.sectors.lock().unwrap()[block_id]
    }

    pub fn set_sector(&self, block_id: usize, sector: Sector) {
        self.sectors.lock().unwrap()[block_id] = sector;
    }

    pub fn snapshot(&self, blocks: Range<usize>) -> Vec<Sector> {
        self.sectors.lock().unwrap()[blocks].to_vec()
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let sectors = self.sectors.lock().unwrap();
        let sector = sectors.get(block_id).ok_or(DeviceError::OutOfRange)?;
        buf.copy_from_slice(sector);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<Flush, DeviceError> {
        let mut sectors = self.sectors.lock().unwrap();
        let sector = sectors.get_mut(block_id).ok_or(DeviceError::OutOfRange)?;
        sector.copy_from_slice(buf);
        Ok(self.flush)
    }
}

/// 注入的故障：落在`blocks`内的访问，放过`skip`次后失败`times`次
#[derive(Debug, Clone)]
pub struct Fault {
    pub blocks: Range<usize>,
    pub skip: usize,
    pub times: usize,
    pub error: DeviceError,
}

impl Fault {
    pub fn on(blocks: Range<usize>) -> Self {
        Self {
            blocks,
            skip: 0,
            times: 1,
            error: DeviceError::Fault,
        }
    }

    pub fn skip(self, skip: usize) -> Self {
        Self { skip, ..self }
    }

    pub fn times(self, times: usize) -> Self {
        Self { times, ..self }
    }

    pub fn error(self, error: DeviceError) -> Self {
        Self { error, ..self }
    }

    fn hit(&mut self, block_id: usize) -> Option<DeviceError> {
        if !self.blocks.contains(&block_id) || self.times == 0 {
            return None;
        }
        if self.skip > 0 {
            self.skip -= 1;
            return None;
        }
        self.times -= 1;
        Some(self.error)
    }
}

/// 可注入读写故障的磁盘
pub struct FaultyDisk {
    pub inner: RamDisk,
    read_fault: Mutex<Option<Fault>>,
    write_fault: Mutex<Option<Fault>>,
}

impl FaultyDisk {
    pub fn new(blocks: usize) -> Self {
        Self {
            inner: RamDisk::new(blocks),
            read_fault: Mutex::new(None),
            write_fault: Mutex::new(None),
        }
    }

    pub fn fail_reads(&self, fault: Fault) {
        *self.read_fault.lock().unwrap() = Some(fault);
    }

    pub fn fail_writes(&self, fault: Fault) {
        *self.write_fault.lock().unwrap() = Some(fault);
    }

    pub fn heal(&self) {
        *self.read_fault.lock().unwrap() = None;
        *self.write_fault.lock().unwrap() = None;
    }
}

impl BlockDevice for FaultyDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if let Some(e) = self
            .read_fault
            .lock()
            .unwrap()
            .as_mut()
            .and_then(|f| f.hit(block_id))
        {
            return Err(e);
        }
        self.inner.read_block(block_id, buf)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<Flush, DeviceError> {
        if let Some(e) = self
            .write_fault
            .lock()
            .unwrap()
            .as_mut()
            .and_then(|f| f.hit(block_id))
        {
            return Err(e);
        }
        self.inner.write_block(block_id, buf)
    }
}

/// 20480 扇区，即 10 MiB 的镜像
pub const DISK_BLOCKS: u32 = 20480;

pub fn fresh() -> (Arc<RamDisk>, BinoFileSystem) {
    fresh_with(DISK_BLOCKS)
}

pub fn fresh_with(blocks: u32) -> (Arc<RamDisk>, BinoFileSystem) {
    let disk = Arc::new(RamDisk::new(blocks as usize));
    let fs = BinoFileSystem::format(disk.clone(), blocks).unwrap();
    (disk, fs)
}

pub fn faulty(blocks: u32) -> (Arc<FaultyDisk>, BinoFileSystem) {
    let disk = Arc::new(FaultyDisk::new(blocks as usize));
    let fs = BinoFileSystem::format(disk.clone(), blocks).unwrap();
    (disk, fs)
}

/// 每个字节都依赖其位置与种子的测试数据
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
        .collect()
}
