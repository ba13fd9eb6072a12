use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError, Flush, SECTOR_SIZE};
use log::error;

/// 以宿主机上的文件作为块设备
#[derive(Debug)]
pub struct BlockFile(Mutex<File>);

impl BlockFile {
    pub fn new(fd: File) -> Self {
        Self(Mutex::new(fd))
    }

    /// 把写入的内容刷到磁盘上
    pub fn sync(&self) -> io::Result<()> {
        self.lock()?.sync_data()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("block file lock poisoned"))
    }

    fn seek_to(&self, block_id: usize) -> io::Result<std::sync::MutexGuard<'_, File>> {
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start((block_id * SECTOR_SIZE) as u64))?;
        Ok(file)
    }
}

fn device_error(block_id: usize, e: io::Error) -> DeviceError {
    error!("block file: sector {block_id}: {e}");
    match e.kind() {
        io::ErrorKind::UnexpectedEof => DeviceError::OutOfRange,
        _ => DeviceError::Fault,
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        assert_eq!(SECTOR_SIZE, buf.len(), "not a complete block!");
        self.seek_to(block_id)
            .and_then(|mut file| file.read_exact(buf))
            .map_err(|e| device_error(block_id, e))
    }

    /// 写入停留在宿主机的页缓存中，直到[`BlockFile::sync`]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<Flush, DeviceError> {
        assert_eq!(SECTOR_SIZE, buf.len(), "not a complete block!");
        self.seek_to(block_id)
            .and_then(|mut file| file.write_all(buf))
            .map_err(|e| device_error(block_id, e))?;
        Ok(Flush::Unconfirmed)
    }
}
