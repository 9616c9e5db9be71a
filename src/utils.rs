use crate::error::WriteError;
use std::path::{Path, PathBuf};

/// 格式化 FormID 为 8 位十六进制
pub fn format_form_id(form_id: u32) -> String {
    format!("{:08X}", form_id)
}

/// 截断过长的显示文本
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 创建文件备份：`<文件名>.<时间戳>.bak`
pub fn create_backup(file_path: &Path) -> Result<PathBuf, WriteError> {
    if !file_path.exists() {
        return Err(WriteError::PathInvalid(file_path.to_path_buf()));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bak");
    let backup_path = file_path.with_extension(format!("{}.{}.bak", extension, timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(|e| WriteError::from_io(e, &backup_path))?;

    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_form_id() {
        assert_eq!(format_form_id(0x800), "00000800");
        assert_eq!(format_form_id(0x0100_0D62), "01000D62");
    }

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display("Iron Helmet", 50), "Iron Helmet");
        assert_eq!(truncate_display("铁头盔铁头盔", 3), "铁头盔...");
    }

    #[test]
    fn test_create_backup() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("RequiemGlamPatcher.esp");
        std::fs::write(&original, b"TES4").unwrap();

        let backup = create_backup(&original).unwrap();
        assert!(backup.to_string_lossy().ends_with(".bak"));
        assert!(backup.file_name().unwrap().to_string_lossy().starts_with("RequiemGlamPatcher.esp."));
        assert_eq!(std::fs::read(&backup).unwrap(), b"TES4");
    }

    #[test]
    fn test_backup_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.esp");
        assert!(matches!(create_backup(&missing), Err(WriteError::PathInvalid(_))));
    }
}
