/// IO 抽象层 - trait 定义
use std::path::Path;
use crate::error::{LoadError, WriteError};

/// 插件文件原始数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPluginData {
    /// 文件的原始字节数据
    pub bytes: Vec<u8>,
}

/// 插件读取 trait
///
/// 只负责 IO，不负责解析。文件句柄必须在 `read` 返回前释放。
pub trait PluginReader {
    fn read(&self, path: &Path) -> Result<RawPluginData, LoadError>;
}

/// 插件写入 trait
///
/// 只负责 IO，不负责序列化。失败时目标路径上不得留下写了一半的文件。
pub trait PluginWriter {
    fn write(&self, data: &RawPluginData, path: &Path) -> Result<(), WriteError>;
}
