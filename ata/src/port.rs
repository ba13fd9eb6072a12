//! 端口映射的 I/O 寄存器
//!
//! x86 的 ATA 控制器挂在 I/O 端口空间上，只能用`in`/`out`指令访问。
//! 驱动不直接写汇编，而是经由 [`PortIo`] 读写端口，
//! 这样同一套驱动既能跑在裸机上，也能对接模拟的控制器。

use core::marker::PhantomData;

/// 端口总线
pub trait PortIo: Send {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);
}

/// 可经由端口传输的数据宽度
pub trait PortValue: Copy {
    fn read_from<P: PortIo + ?Sized>(io: &mut P, port: u16) -> Self;
    fn write_to<P: PortIo + ?Sized>(io: &mut P, port: u16, value: Self);
}

impl PortValue for u8 {
    #[inline]
    fn read_from<P: PortIo + ?Sized>(io: &mut P, port: u16) -> Self {
        io.read_u8(port)
    }

    #[inline]
    fn write_to<P: PortIo + ?Sized>(io: &mut P, port: u16, value: Self) {
        io.write_u8(port, value)
    }
}

impl PortValue for u16 {
    #[inline]
    fn read_from<P: PortIo + ?Sized>(io: &mut P, port: u16) -> Self {
        io.read_u16(port)
    }

    #[inline]
    fn write_to<P: PortIo + ?Sized>(io: &mut P, port: u16, value: Self) {
        io.write_u16(port, value)
    }
}

/// A port register which can only be read from.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly<T> {
    port: u16,
    _value: PhantomData<T>,
}

/// A port register which can only be written to.
#[derive(Debug, Clone, Copy)]
pub struct WriteOnly<T> {
    port: u16,
    _value: PhantomData<T>,
}

/// A port register which may be both read and written.
#[derive(Debug, Clone, Copy)]
pub struct ReadWrite<T> {
    port: u16,
    _value: PhantomData<T>,
}

impl<T: PortValue> ReadOnly<T> {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _value: PhantomData,
        }
    }

    #[inline]
    pub fn read<P: PortIo + ?Sized>(&self, io: &mut P) -> T {
        T::read_from(io, self.port)
    }
}

impl<T: PortValue> WriteOnly<T> {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _value: PhantomData,
        }
    }

    #[inline]
    pub fn write<P: PortIo + ?Sized>(&self, io: &mut P, value: T) {
        T::write_to(io, self.port, value)
    }
}

impl<T: PortValue> ReadWrite<T> {
    pub const fn new(port: u16) -> Self {
        Self {
            port,
            _value: PhantomData,
        }
    }

    #[inline]
    pub fn read<P: PortIo + ?Sized>(&self, io: &mut P) -> T {
        T::read_from(io, self.port)
    }

    #[inline]
    pub fn write<P: PortIo + ?Sized>(&self, io: &mut P, value: T) {
        T::write_to(io, self.port, value)
    }
}

/// 真实的 CPU 端口空间
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Debug)]
pub struct CpuPorts {
    _private: (),
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuPorts {
    /// # Safety
    ///
    /// 调用者须处于特权级 0（或拥有对应的 I/O 权限），
    /// 且保证没有其它代码同时操作这些端口。
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for CpuPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                out("al") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        let value: u16;
        unsafe {
            core::arch::asm!(
                "in ax, dx",
                out("ax") value,
                in("dx") port,
                options(nomem, nostack, preserves_flags),
            );
        }
        value
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        unsafe {
            core::arch::asm!(
                "out dx, ax",
                in("dx") port,
                in("ax") value,
                options(nomem, nostack, preserves_flags),
            );
        }
    }
}
