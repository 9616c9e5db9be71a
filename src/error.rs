use std::path::PathBuf;
use thiserror::Error;

/// 单个插件加载失败（可恢复：扫描会跳过该文件继续）
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("文件头损坏: {0}")]
    CorruptHeader(String),

    #[error("不支持的插件版本: {0}")]
    UnsupportedVersion(f32),

    #[error("数据截断: {0}")]
    Truncated(String),

    #[error("记录数据损坏: {0}")]
    CorruptRecord(String),

    #[error("文件不存在: {0:?}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => LoadError::Truncated(e.to_string()),
            _ => LoadError::Io(e),
        }
    }
}

/// 操作员输入校验失败（可恢复：重新提示）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("超出范围: {input}（有效范围 1-{max}）")]
    OutOfRange { input: usize, max: usize },

    #[error("不是有效数字: {0:?}")]
    NotANumber(String),

    #[error("无效的选择: {0:?}")]
    InvalidChoice(String),
}

// ENOSPC
#[cfg(not(windows))]
const DISK_FULL_CODES: &[i32] = &[28];
// ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
#[cfg(windows)]
const DISK_FULL_CODES: &[i32] = &[39, 112];

/// 写出补丁失败（致命：本次运行终止）
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("没有写入权限: {0:?}")]
    PermissionDenied(PathBuf),

    #[error("磁盘空间不足: {0:?}")]
    DiskFull(PathBuf),

    #[error("无效的输出路径: {0:?}")]
    PathInvalid(PathBuf),

    #[error("序列化失败: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriteError {
    /// 按 IO 错误类别归类
    pub fn from_io(e: std::io::Error, path: &std::path::Path) -> Self {
        use std::io::ErrorKind;

        if e.raw_os_error().is_some_and(|code| DISK_FULL_CODES.contains(&code)) {
            return WriteError::DiskFull(path.to_path_buf());
        }

        match e.kind() {
            ErrorKind::PermissionDenied => WriteError::PermissionDenied(path.to_path_buf()),
            ErrorKind::NotFound | ErrorKind::InvalidInput => WriteError::PathInvalid(path.to_path_buf()),
            _ => WriteError::Io(e),
        }
    }
}

/// 构建补丁内容失败
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("插件不能把自己声明为主文件: {0}")]
    SelfMaster(String),

    #[error("本地化插件的名称保存在 STRINGS 文件中，无法为其生成补丁: {0}")]
    LocalizedSource(String),

    #[error("FormID {form_id:08X} 引用了未声明的主文件索引 {index:02X}")]
    DanglingMaster { form_id: u32, index: u8 },

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// 交互流程中的错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// 配置或模板加载失败
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
