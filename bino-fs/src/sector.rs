use alloc::{boxed::Box, sync::Arc};
use core::fmt;

use block_dev::{BlockDevice, DeviceError, Flush};

use crate::{BLOCK_SIZE, DataBlock};

/// 扇区缓冲区
///
/// 整个文件系统只有这一块扇区大小的暂存区，所有读写都经过它。
/// 不做缓存：每次访问都直接读写设备。
pub struct SectorBuf {
    data: Box<DataBlock>,
    device: Arc<dyn BlockDevice>,
}

impl SectorBuf {
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self {
            data: Box::new([0; BLOCK_SIZE]),
            device,
        }
    }

    pub fn device(&self) -> &Arc<dyn BlockDevice> {
        &self.device
    }

    /// 读入扇区后交给`f`查看
    pub fn read<V>(
        &mut self,
        block_id: u32,
        f: impl FnOnce(&DataBlock) -> V,
    ) -> Result<V, DeviceError> {
        self.device.read_block(block_id as usize, &mut self.data[..])?;
        Ok(f(&self.data))
    }

    /// 读入扇区，经`f`修改后写回
    pub fn modify(
        &mut self,
        block_id: u32,
        f: impl FnOnce(&mut DataBlock),
    ) -> Result<Flush, DeviceError> {
        self.device.read_block(block_id as usize, &mut self.data[..])?;
        f(&mut self.data);
        self.device.write_block(block_id as usize, &self.data[..])
    }

    /// 由`f`填充整个扇区后写入，不先读
    pub fn overwrite(
        &mut self,
        block_id: u32,
        f: impl FnOnce(&mut DataBlock),
    ) -> Result<Flush, DeviceError> {
        f(&mut self.data);
        self.device.write_block(block_id as usize, &self.data[..])
    }
}

impl fmt::Debug for SectorBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectorBuf").finish_non_exhaustive()
    }
}
