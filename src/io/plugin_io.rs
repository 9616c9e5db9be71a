/// 插件文件 IO 实现
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use super::traits::{PluginReader, PluginWriter, RawPluginData};
use crate::error::{LoadError, WriteError};

/// 默认的插件读取器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct DefaultPluginReader;

impl PluginReader for DefaultPluginReader {
    fn read(&self, path: &Path) -> Result<RawPluginData, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
            _ => LoadError::from(e),
        })?;
        Ok(RawPluginData { bytes })
    }
}

/// 默认的插件写入器
///
/// 先写入同目录下的临时文件，再原子地重命名为目标文件名，
/// 写入失败时临时文件随 `NamedTempFile` 一起删除。
#[derive(Debug, Clone, Default)]
pub struct DefaultPluginWriter;

impl PluginWriter for DefaultPluginWriter {
    fn write(&self, data: &RawPluginData, path: &Path) -> Result<(), WriteError> {
        let parent = match path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(WriteError::PathInvalid(path.to_path_buf())),
        };
        if path.file_name().is_none() || !parent.is_dir() {
            return Err(WriteError::PathInvalid(path.to_path_buf()));
        }

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| WriteError::from_io(e, path))?;
        temp.write_all(&data.bytes).map_err(|e| WriteError::from_io(e, path))?;
        temp.as_file().sync_all().map_err(|e| WriteError::from_io(e, path))?;
        temp.persist(path).map_err(|e| WriteError::from_io(e.error, path))?;

        tracing::debug!(path = %path.display(), bytes = data.bytes.len(), "插件已写出");
        Ok(())
    }
}
