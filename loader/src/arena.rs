use alloc::{boxed::Box, vec};
use core::mem;

use crate::{MalformedImage, RUN_BUF_SIZE, elf};

/// 执行区
///
/// 装载后的程序就在这里运行。只有落在已装载范围内的偏移才能成为[`Entry`]。
#[derive(Debug)]
pub struct ExecArena {
    mem: Box<[u8]>,
    /// 已装载的字节数
    mapped: usize,
}

impl ExecArena {
    pub fn new() -> Self {
        Self {
            mem: vec![0; RUN_BUF_SIZE].into_boxed_slice(),
            mapped: 0,
        }
    }

    /// 已装载的内容
    #[inline]
    pub fn loaded(&self) -> &[u8] {
        &self.mem[..self.mapped]
    }

    /// 放入映像，返回入口偏移
    pub(crate) fn fill(&mut self, image: &[u8]) -> Result<usize, MalformedImage> {
        self.mapped = 0;
        let placed = elf::place(image, &mut self.mem)?;
        self.mapped = placed.span;
        Ok(placed.entry)
    }

    pub(crate) fn entry(&self, offset: usize) -> Option<Entry<'_>> {
        (offset < self.mapped).then_some(Entry {
            arena: self,
            offset,
        })
    }
}

impl Default for ExecArena {
    fn default() -> Self {
        Self::new()
    }
}

/// 已验证的程序入口，借用执行区，执行区在跳转前不会被改写
#[derive(Debug)]
pub struct Entry<'a> {
    arena: &'a ExecArena,
    offset: usize,
}

impl Entry<'_> {
    /// 相对执行区起点的偏移
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn address(&self) -> usize {
        self.arena.mem.as_ptr() as usize + self.offset
    }

    /// 跳到入口执行，例程返回后本函数返回
    ///
    /// # Safety
    ///
    /// 执行区内须是当前 CPU 上可执行、遵循 C 调用约定的代码，
    /// 且执行区所在内存可执行。
    pub unsafe fn jump(self) {
        let routine: extern "C" fn() =
            unsafe { mem::transmute::<*const u8, extern "C" fn()>(self.address() as *const u8) };
        routine();
    }
}
