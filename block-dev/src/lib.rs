//! # 块设备接口层
//!
//! 块设备以**扇区**为单位存储数据；
//! [`BlockDevice`] 是对读写块设备的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 每次读写恰好传输一个扇区，不存在部分传输。
//! 驱动不做重试，重试策略属于调用者。

#![no_std]

use core::any::Any;

use derive_more::Display;

/// 扇区字节数
pub const SECTOR_SIZE: usize = 512;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any {
    /// 读出编号为`block_id`的扇区，`buf`长度须为[`SECTOR_SIZE`]
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 写入编号为`block_id`的扇区，`buf`长度须为[`SECTOR_SIZE`]
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<Flush, DeviceError>;
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 轮询次数用尽，设备仍未就绪
    #[display(fmt = "device timed out")]
    Timeout,
    /// 设备在状态寄存器中报告了错误
    #[display(fmt = "device fault")]
    Fault,
    /// 块地址超出设备的寻址宽度
    #[display(fmt = "block address out of range")]
    OutOfRange,
}

/// 写入之后，数据是否确认落盘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    Confirmed,
    /// 已发出刷新命令，但未等待其完成
    Unconfirmed,
}

impl Flush {
    /// 合并多次写入的结果：只要有一次未确认，整体即未确认
    #[inline]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Confirmed, Self::Confirmed) => Self::Confirmed,
            _ => Self::Unconfirmed,
        }
    }

    #[inline]
    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}
