use bino_fs::FsError;
use derive_more::{Display, From};

#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "{}", _0)]
    Fs(FsError),
    /// 文件超出装载缓冲区
    #[from(ignore)]
    #[display(fmt = "image larger than the run buffer")]
    OversizedLoad,
    #[display(fmt = "malformed image: {}", _0)]
    Malformed(MalformedImage),
}

/// 无法装载的映像，各类问题分别报告
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum MalformedImage {
    #[display(fmt = "empty file")]
    Empty,
    /// 不是 32 位 ELF
    #[display(fmt = "not a 32-bit ELF")]
    BadClass,
    /// 不是小端序
    #[display(fmt = "not little-endian")]
    BadEncoding,
    /// ELF 头或程序头表越出文件
    #[display(fmt = "header out of bounds")]
    HeaderOutOfBounds,
    /// 段的文件内容越出文件，或文件大小超过内存大小
    #[display(fmt = "segment out of bounds")]
    SegmentOutOfBounds,
    #[display(fmt = "no loadable segment")]
    NoLoadableSegment,
    /// 各段跨度超出执行区
    #[display(fmt = "segments span more than the arena")]
    SpanTooLarge,
    /// 入口不在装载范围内
    #[display(fmt = "entry point outside loaded span")]
    EntryOutOfRange,
}
