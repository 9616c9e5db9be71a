use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// 插件类型（由扩展名决定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    /// 主文件 (ESM)
    Master,
    /// 普通插件 (ESP)
    Plugin,
    /// 轻量级文件 (ESL)
    Light,
}

impl PluginKind {
    /// 从扩展名识别（大小写不敏感）
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "esm" => Some(PluginKind::Master),
            "esp" => Some(PluginKind::Plugin),
            "esl" => Some(PluginKind::Light),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            PluginKind::Master => "esm",
            PluginKind::Plugin => "esp",
            PluginKind::Light => "esl",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Master => write!(f, "主文件 (ESM)"),
            PluginKind::Plugin => write!(f, "插件 (ESP)"),
            PluginKind::Light => write!(f, "轻量级文件 (ESL)"),
        }
    }
}

/// 插件身份：文件名 + 类型
///
/// 比较与哈希都对文件名大小写不敏感，`Skyrim.esm` 与 `SKYRIM.ESM` 是同一个插件。
/// 未知扩展名的文件名按普通插件处理。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginIdentity {
    name: String,
    kind: PluginKind,
}

impl PluginIdentity {
    /// 从完整文件名构造，例如 `Requiem.esp`
    pub fn from_file_name(name: &str) -> Self {
        let kind = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(PluginKind::from_extension)
            .unwrap_or(PluginKind::Plugin);

        PluginIdentity { name: name.to_string(), kind }
    }

    /// 从不带扩展名的名称和类型构造，例如 (`RequiemGlamPatcher`, Plugin)
    pub fn new(stem: &str, kind: PluginKind) -> Self {
        PluginIdentity {
            name: format!("{}.{}", stem, kind.extension()),
            kind,
        }
    }

    /// 从路径的文件名部分构造
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(Self::from_file_name)
    }

    /// 完整文件名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// 文件名是否包含给定子串（大小写不敏感）
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }

    /// 文件名是否等于给定名称（大小写不敏感）
    pub fn matches_name(&self, other: &str) -> bool {
        self.name.to_lowercase() == other.to_lowercase()
    }
}

impl PartialEq for PluginIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.matches_name(&other.name)
    }
}

impl Eq for PluginIdentity {}

impl Hash for PluginIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_lowercase().hash(state);
    }
}

impl fmt::Display for PluginIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(PluginIdentity::from_file_name("Skyrim.esm").kind(), PluginKind::Master);
        assert_eq!(PluginIdentity::from_file_name("Requiem.ESP").kind(), PluginKind::Plugin);
        assert_eq!(PluginIdentity::from_file_name("ccBGSSSE001-Fish.esl").kind(), PluginKind::Light);
        assert_eq!(PluginIdentity::from_file_name("readme").kind(), PluginKind::Plugin);
    }

    #[test]
    fn test_case_insensitive_identity() {
        let a = PluginIdentity::from_file_name("Requiem.esp");
        let b = PluginIdentity::from_file_name("REQUIEM.ESP");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1, "大小写不同的同名插件应该去重");
    }

    #[test]
    fn test_new_appends_extension() {
        let patch = PluginIdentity::new("RequiemGlamPatcher", PluginKind::Plugin);
        assert_eq!(patch.name(), "RequiemGlamPatcher.esp");
        assert!(patch.name_contains("requiem"));
    }
}
