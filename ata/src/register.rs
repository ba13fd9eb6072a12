//! ATA 主通道的寄存器组
//!
//! | 端口       | 读            | 写            |
//! |------------|---------------|---------------|
//! | base + 0   | 数据(16位)    | 数据(16位)    |
//! | base + 1   | 错误          | 特性          |
//! | base + 2   | -             | 扇区数        |
//! | base + 3~5 | -             | LBA 0~23 位   |
//! | base + 6   | -             | 驱动器/磁头   |
//! | base + 7   | 状态          | 命令          |
//! | ctrl       | 备用状态      | 设备控制      |

use enumflags2::{BitFlags, bitflags};

use crate::port::{PortIo, ReadOnly, ReadWrite, WriteOnly};

#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub data: ReadWrite<u16>,
    pub error: ReadOnly<u8>,
    pub sector_count: WriteOnly<u8>,
    pub lba_low: WriteOnly<u8>,
    pub lba_mid: WriteOnly<u8>,
    pub lba_high: WriteOnly<u8>,
    pub drive_head: WriteOnly<u8>,
    pub status: ReadOnly<u8>,
    pub command: WriteOnly<u8>,
    /// 读取不会清除挂起的中断，适合用来消磨时间
    pub alt_status: ReadOnly<u8>,
}

impl Registers {
    /// 主通道：0x1F0 ~ 0x1F7，控制端口 0x3F6
    pub const PRIMARY: Self = Self::new(0x1F0, 0x3F6);

    pub const fn new(io_base: u16, ctrl: u16) -> Self {
        Self {
            data: ReadWrite::new(io_base),
            error: ReadOnly::new(io_base + 1),
            sector_count: WriteOnly::new(io_base + 2),
            lba_low: WriteOnly::new(io_base + 3),
            lba_mid: WriteOnly::new(io_base + 4),
            lba_high: WriteOnly::new(io_base + 5),
            drive_head: WriteOnly::new(io_base + 6),
            status: ReadOnly::new(io_base + 7),
            command: WriteOnly::new(io_base + 7),
            alt_status: ReadOnly::new(ctrl),
        }
    }

    #[inline]
    pub fn status<P: PortIo + ?Sized>(&self, io: &mut P) -> BitFlags<Status> {
        BitFlags::from_bits_truncate(self.status.read(io))
    }

    #[inline]
    pub fn issue<P: PortIo + ?Sized>(&self, io: &mut P, command: Command) {
        self.command.write(io, command as u8);
    }
}

/// 状态寄存器的各个位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum Status {
    /// 上一条命令出错，详情见错误寄存器
    Err = 0b0000_0001,
    /// 设备已准备好传输数据
    Drq = 0b0000_1000,
    /// Drive fault
    Df = 0b0010_0000,
    /// Drive ready
    Drdy = 0b0100_0000,
    /// 忙碌时其余位皆无意义
    Bsy = 0b1000_0000,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    ReadSectors = 0x20,
    WriteSectors = 0x30,
    CacheFlush = 0xE7,
}

/// 驱动器/磁头寄存器：LBA 模式、主盘
pub const DRIVE_MASTER_LBA: u8 = 0xE0;
