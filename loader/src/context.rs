/// 中断入口处`pushad`保存的寄存器，按内存中由低到高的顺序排列
///
/// 系统调用号在`eax`，参数依次在`ebx`、`ecx`、`edx`，返回值写回`eax`。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushadFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// `pushad`执行前的栈顶
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

impl PushadFrame {
    /// 不支持的调用写回的返回值，即 -1
    pub const UNSUPPORTED: u32 = u32::MAX;

    #[inline]
    pub fn syscall_id(&self) -> u32 {
        self.eax
    }

    #[inline]
    pub fn args(&self) -> [u32; 3] {
        [self.ebx, self.ecx, self.edx]
    }

    #[inline]
    pub fn set_return(&mut self, value: u32) {
        self.eax = value;
    }

    /// 从栈上保存区的原始字中取出寄存器
    pub fn from_words(words: [u32; 8]) -> Self {
        let [edi, esi, ebp, esp, ebx, edx, ecx, eax] = words;
        Self {
            edi,
            esi,
            ebp,
            esp,
            ebx,
            edx,
            ecx,
            eax,
        }
    }
}
