//! ATA PIO 驱动（LBA28，单扇区，轮询）
//!
//! 每次读写的流程：
//! 1. 写驱动器/磁头、扇区数、LBA 寄存器，选定目标扇区；
//! 2. 写命令寄存器；
//! 3. 轮询状态寄存器，直到设备不忙且 DRQ 置位；
//! 4. 经数据端口传输 256 个 16 位字；
//! 5. 读 4 次备用状态寄存器，等设备稳定（约 400ns）。
//!
//! 写入在传输结束后再发出 CACHE FLUSH，但并不等待其完成。

use block_dev::{BlockDevice, DeviceError, Flush, SECTOR_SIZE};
use log::{error, trace};
use spin::Mutex;

use crate::port::PortIo;
use crate::register::{Command, DRIVE_MASTER_LBA, Registers, Status};

/// 主通道主盘
#[derive(Debug)]
pub struct AtaPio<P: PortIo> {
    /// 一条命令从选址到传输完毕必须独占总线
    bus: Mutex<P>,
    regs: Registers,
}

impl<P: PortIo> AtaPio<P> {
    /// 每次等待最多读取状态寄存器的次数
    pub const POLL_BUDGET: usize = 100_000;

    /// LBA28 的最大地址
    pub const MAX_LBA: usize = 0x0FFF_FFFF;

    /// 读备用状态寄存器的次数，每次约 100ns
    const SETTLE_READS: usize = 4;

    pub fn new(io: P) -> Self {
        Self::with_registers(io, Registers::PRIMARY)
    }

    pub fn with_registers(io: P, regs: Registers) -> Self {
        Self {
            bus: Mutex::new(io),
            regs,
        }
    }

    /// 取回底层总线
    pub fn into_inner(self) -> P {
        self.bus.into_inner()
    }
}

impl<P: PortIo> AtaPio<P> {
    fn lba(block_id: usize) -> Result<u32, DeviceError> {
        if block_id > Self::MAX_LBA {
            error!("ata: lba {block_id:#x} exceeds 28 bits");
            return Err(DeviceError::OutOfRange);
        }
        Ok(block_id as u32)
    }

    fn select(&self, io: &mut P, lba: u32, command: Command) {
        let regs = &self.regs;
        regs.drive_head
            .write(io, DRIVE_MASTER_LBA | ((lba >> 24) & 0x0F) as u8);
        regs.sector_count.write(io, 1);
        regs.lba_low.write(io, lba as u8);
        regs.lba_mid.write(io, (lba >> 8) as u8);
        regs.lba_high.write(io, (lba >> 16) as u8);
        regs.issue(io, command);
    }

    /// 等待设备进入可传输状态
    fn wait_data(&self, io: &mut P) -> Result<(), DeviceError> {
        for _ in 0..Self::POLL_BUDGET {
            let status = self.regs.status(io);
            if status.contains(Status::Bsy) {
                continue;
            }
            if status.intersects(Status::Err | Status::Df) {
                let code = self.regs.error.read(io);
                error!("ata: device fault, status={status:?}, error={code:#04x}");
                return Err(DeviceError::Fault);
            }
            if status.contains(Status::Drq) {
                return Ok(());
            }
        }

        error!("ata: DRQ not raised within {} polls", Self::POLL_BUDGET);
        Err(DeviceError::Timeout)
    }

    fn settle(&self, io: &mut P) {
        for _ in 0..Self::SETTLE_READS {
            self.regs.alt_status.read(io);
        }
    }
}

impl<P: PortIo + 'static> BlockDevice for AtaPio<P> {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        assert_eq!(buf.len(), SECTOR_SIZE, "not a complete sector!");
        let lba = Self::lba(block_id)?;

        let mut bus = self.bus.lock();
        let io = &mut *bus;
        self.select(io, lba, Command::ReadSectors);
        self.wait_data(io)?;

        for word in buf.chunks_exact_mut(2) {
            word.copy_from_slice(&self.regs.data.read(io).to_le_bytes());
        }
        self.settle(io);

        trace!("ata: read lba {lba:#x}");
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<Flush, DeviceError> {
        assert_eq!(buf.len(), SECTOR_SIZE, "not a complete sector!");
        let lba = Self::lba(block_id)?;

        let mut bus = self.bus.lock();
        let io = &mut *bus;
        self.select(io, lba, Command::WriteSectors);
        self.wait_data(io)?;

        for word in buf.chunks_exact(2) {
            self.regs
                .data
                .write(io, u16::from_le_bytes([word[0], word[1]]));
        }
        self.settle(io);

        // NOTE: 刷新结果不检查，调用者只能得到`Flush::Unconfirmed`
        self.regs.issue(io, Command::CacheFlush);

        trace!("ata: wrote lba {lba:#x}, flush unconfirmed");
        Ok(Flush::Unconfirmed)
    }
}
