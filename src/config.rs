use crate::classifier::ClassifierKind;
use crate::error::ConfigError;
use crate::plugin::{PluginIdentity, PluginKind};
use crate::template::TemplateSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 数据目录中可选的配置文件名
pub const CONFIG_FILE_NAME: &str = "glam_patcher.json";

/// 补丁生成配置
///
/// 所有字段都有默认值；数据目录中存在 `glam_patcher.json` 时，
/// 文件中出现的字段覆盖默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// 游戏本体文件（不参与扫描）
    pub excluded_base_names: Vec<String>,
    /// 目标系统主文件名子串（已依赖它的插件跳过）
    pub target_master_substring: String,
    /// 目标系统的主文件（补丁总会依赖它）
    pub target_provider: String,
    /// 补丁文件名（不含扩展名）
    pub patch_name: String,
    /// 补丁类型
    pub patch_kind: PluginKind,
    /// 写入 CNAM 的作者
    pub author: String,
    /// 覆盖已有补丁前是否备份
    pub backup_existing: bool,
    /// 槽位分类策略
    pub classifier: ClassifierKind,
    /// 自定义模板文件（相对数据目录）；为空时使用内置模板
    pub templates_file: Option<PathBuf>,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        PatcherConfig {
            excluded_base_names: [
                "Skyrim.esm",
                "Update.esm",
                "Dawnguard.esm",
                "HearthFires.esm",
                "Dragonborn.esm",
                "_ResourcePack.esl",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            target_master_substring: "Requiem".to_string(),
            target_provider: "Requiem.esp".to_string(),
            patch_name: "RequiemGlamPatcher".to_string(),
            patch_kind: PluginKind::Plugin,
            author: "RequiemGlamPatcher".to_string(),
            backup_existing: true,
            classifier: ClassifierKind::Keyword,
            templates_file: None,
        }
    }
}

impl PatcherConfig {
    /// 从数据目录加载配置；配置文件不存在时使用默认值
    pub fn load_or_default(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: PatcherConfig = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), "已加载配置文件");
        Ok(config)
    }

    /// 补丁插件身份
    pub fn patch_identity(&self) -> PluginIdentity {
        PluginIdentity::new(&self.patch_name, self.patch_kind)
    }

    /// 目标系统主文件身份
    pub fn target_identity(&self) -> PluginIdentity {
        PluginIdentity::from_file_name(&self.target_provider)
    }

    /// 补丁输出路径：`<数据目录>/<补丁名>.<扩展名>`
    pub fn output_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.patch_identity().name())
    }

    /// 加载模板：配置了 `templates_file` 时从文件读取，否则使用内置模板
    pub fn load_templates(&self, data_dir: &Path) -> Result<TemplateSet, ConfigError> {
        match &self.templates_file {
            Some(file) => {
                let path = data_dir.join(file);
                tracing::info!(path = %path.display(), "使用自定义模板");
                TemplateSet::from_file(&path)
            }
            None => TemplateSet::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PatcherConfig::default();
        assert_eq!(config.patch_identity().name(), "RequiemGlamPatcher.esp");
        assert_eq!(config.target_identity().name(), "Requiem.esp");
        assert!(config.excluded_base_names.iter().any(|n| n == "Skyrim.esm"));
        assert_eq!(
            config.output_path(Path::new("Data")),
            Path::new("Data").join("RequiemGlamPatcher.esp")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(PatcherConfig::load_or_default(dir.path()).unwrap(), PatcherConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "patch_name": "MyPatch", "patch_kind": "Light", "classifier": "biped" }"#,
        )
        .unwrap();

        let config = PatcherConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.patch_identity().name(), "MyPatch.esl");
        assert_eq!(config.target_master_substring, "Requiem");
        assert_eq!(config.classifier, ClassifierKind::Biped);
    }

    #[test]
    fn test_templates_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("my_templates.json"),
            r#"{ "Head": [ { "name": "Feather Cap", "armor_rating": 2.0 } ] }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "templates_file": "my_templates.json" }"#,
        )
        .unwrap();

        let config = PatcherConfig::load_or_default(dir.path()).unwrap();
        let templates = config.load_templates(dir.path()).unwrap();
        assert_eq!(templates.templates_for(crate::classifier::SlotTag::Head)[0].name, "Feather Cap");
        assert!(templates.templates_for(crate::classifier::SlotTag::Body).is_empty());
    }

    #[test]
    fn test_templates_default_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let templates = PatcherConfig::default().load_templates(dir.path()).unwrap();
        assert_eq!(templates, TemplateSet::builtin().unwrap());
    }

    #[test]
    fn test_missing_templates_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = PatcherConfig {
            templates_file: Some(PathBuf::from("nope.json")),
            ..PatcherConfig::default()
        };
        assert!(matches!(config.load_templates(dir.path()), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert!(matches!(
            PatcherConfig::load_or_default(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
