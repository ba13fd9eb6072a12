//! # ATA 块设备驱动
//!
//! 通过 I/O 端口以 PIO 方式访问主通道主盘，
//! 实现 [`block_dev::BlockDevice`]。

#![no_std]

#[cfg(test)]
extern crate alloc;

mod driver;
pub mod port;
pub mod register;
#[cfg(test)]
mod sim;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use self::port::CpuPorts;
pub use self::{
    driver::AtaPio,
    port::PortIo,
    register::{Command, Registers, Status},
};
