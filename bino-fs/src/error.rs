use block_dev::DeviceError;
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 设备轮询超时
    #[display(fmt = "device timed out")]
    DeviceTimeout,
    /// 设备报告错误
    #[display(fmt = "device error")]
    DeviceError,
    /// 超级块魔数不符，设备上没有可用的文件系统
    #[display(fmt = "filesystem not mounted")]
    NotMounted,
    #[display(fmt = "file not found")]
    NotFound,
    /// 文件名为空、过长或含有`\0`
    #[display(fmt = "invalid file name")]
    InvalidName,
    /// 没有足够长的连续空闲块，或目录已满
    #[display(fmt = "no space left")]
    NoSpace,
    /// 目录项指向数据区之外的块，只可能出现在损坏的镜像上
    #[display(fmt = "corrupted directory entry")]
    Corrupted,
}

impl From<DeviceError> for FsError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::Timeout => Self::DeviceTimeout,
            DeviceError::Fault | DeviceError::OutOfRange => Self::DeviceError,
        }
    }
}
