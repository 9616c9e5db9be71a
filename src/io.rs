/// IO 抽象层模块
///
/// 插件的读取与写出通过 trait 注入，解析与序列化本身不接触文件系统，
/// 测试中可以替换为内存实现。
///
/// - **traits**: 定义 Reader/Writer trait 接口
/// - **plugin_io**: 基于文件系统的默认实现（写出为临时文件 + 原子替换）
///
/// ```rust,ignore
/// use glam_patcher::io::{DefaultPluginReader, PluginReader};
///
/// let reader = DefaultPluginReader;
/// let data = reader.read(Path::new("ArmorModA.esp"))?;
/// ```
pub mod traits;
pub mod plugin_io;

pub use traits::{PluginReader, PluginWriter, RawPluginData};
pub use plugin_io::{DefaultPluginReader, DefaultPluginWriter};
