//! # 程序装载器
//!
//! 从 binofs 读出可执行文件，放入执行区，交出控制权。
//! 支持两种格式：
//!
//! - 扁平二进制：整体放在执行区开头，从偏移 0 开始执行；
//! - 32 位小端 ELF：只处理 PT_LOAD 段，不做重定位与符号解析。

#![no_std]

extern crate alloc;

mod arena;
mod context;
mod elf;
mod error;

use alloc::{boxed::Box, vec};

use bino_fs::BinoFileSystem;
use log::debug;

pub use self::{
    arena::{Entry, ExecArena},
    context::PushadFrame,
    elf::{Placed, place},
    error::{Error, MalformedImage},
};

/// 装载缓冲区与执行区的大小
pub const RUN_BUF_SIZE: usize = 64 * 1024;

/// 装载器，持有装载缓冲区与执行区
#[derive(Debug)]
pub struct Loader {
    file_buf: Box<[u8]>,
    arena: ExecArena,
}

impl Loader {
    pub fn new() -> Self {
        Self {
            file_buf: vec![0; RUN_BUF_SIZE].into_boxed_slice(),
            arena: ExecArena::new(),
        }
    }

    #[inline]
    pub fn arena(&self) -> &ExecArena {
        &self.arena
    }

    /// 读出文件并装入执行区，返回入口
    pub fn load(&mut self, fs: &mut BinoFileSystem, name: &str) -> Result<Entry<'_>, Error> {
        let file = fs.lookup(name)?;
        if file.size as usize > RUN_BUF_SIZE {
            return Err(Error::OversizedLoad);
        }

        let len = fs.read(name, &mut self.file_buf)?;
        let offset = self.arena.fill(&self.file_buf[..len])?;
        debug!("loader: {name:?} loaded, entry at +{offset:#x}");

        self.arena.entry(offset).ok_or(Error::Malformed(MalformedImage::EntryOutOfRange))
    }

    /// 装载并执行，例程返回后本函数返回
    ///
    /// # Safety
    ///
    /// 文件内容须是当前 CPU 上可执行、遵循 C 调用约定的例程。
    pub unsafe fn run(&mut self, fs: &mut BinoFileSystem, name: &str) -> Result<(), Error> {
        let entry = self.load(fs, name)?;
        unsafe { entry.jump() };
        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}
