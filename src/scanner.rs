use crate::config::PatcherConfig;
use crate::error::LoadError;
use crate::plugin::{Plugin, PluginIdentity};
use crate::SUPPORTED_EXTENSIONS;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

/// 扫描条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// 按文件名排除（大小写不敏感）
    pub excluded_base_names: Vec<String>,
    /// 主文件名包含该子串的插件视为已适配
    pub target_master_substring: String,
}

impl From<&PatcherConfig> for ScanOptions {
    fn from(config: &PatcherConfig) -> Self {
        let mut excluded_base_names = config.excluded_base_names.clone();
        // 上一次运行生成的补丁本身也不参与扫描
        excluded_base_names.push(config.patch_identity().name().to_string());

        ScanOptions {
            excluded_base_names,
            target_master_substring: config.target_master_substring.clone(),
        }
    }
}

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 游戏本体文件
    BaseContent,
    /// 已依赖目标系统（附带匹配到的主文件名）
    AlreadyPatched(String),
    /// 本地化插件（名称在 STRINGS 文件中）
    Localized,
    /// 没有护甲记录
    NoArmor,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BaseContent => write!(f, "游戏本体文件"),
            SkipReason::AlreadyPatched(master) => write!(f, "已依赖 {}", master),
            SkipReason::Localized => write!(f, "本地化插件，名称保存在 STRINGS 文件中，暂不支持"),
            SkipReason::NoArmor => write!(f, "没有护甲记录"),
        }
    }
}

/// 可供选择的插件
#[derive(Debug)]
pub struct ScannedPlugin {
    pub display_name: String,
    pub plugin: Plugin,
}

/// 加载失败的文件
#[derive(Debug)]
pub struct ScanDiagnostic {
    pub file_name: String,
    pub error: LoadError,
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.error)
    }
}

/// 扫描结果
#[derive(Debug, Default)]
pub struct ScanReport {
    /// 按文件名排序
    pub plugins: Vec<ScannedPlugin>,
    pub diagnostics: Vec<ScanDiagnostic>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.display_name.as_str()).collect()
    }
}

/// 列出目录中的候选插件，按文件名升序
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::NotFound(dir.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)));
        if recognized {
            candidates.push(path);
        }
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

/// 扫描数据目录
///
/// 每个文件独立加载，单个文件失败只记录诊断信息。按名称排除的文件不会被加载。
/// 目录不存在时返回 `LoadError::NotFound`；空目录返回空结果。
pub fn scan(dir: &Path, options: &ScanOptions) -> Result<ScanReport, LoadError> {
    let mut report = ScanReport::default();
    let mut to_load = Vec::new();

    for path in list_candidates(dir)? {
        let Some(identity) = PluginIdentity::from_path(&path) else {
            continue;
        };
        if options.excluded_base_names.iter().any(|n| identity.matches_name(n)) {
            tracing::debug!(plugin = identity.name(), "跳过游戏本体文件");
            report.skipped.push((identity.name().to_string(), SkipReason::BaseContent));
        } else {
            to_load.push((identity, path));
        }
    }

    // rayon 的 collect 保持输入顺序
    let loaded: Vec<(PluginIdentity, Result<Plugin, LoadError>)> = to_load
        .into_par_iter()
        .map(|(identity, path)| {
            let result = Plugin::load(path);
            (identity, result)
        })
        .collect();

    for (identity, result) in loaded {
        let name = identity.name().to_string();
        let plugin = match result {
            Ok(plugin) => plugin,
            Err(error) => {
                tracing::warn!(plugin = %name, error = %error, "插件加载失败，已跳过");
                report.diagnostics.push(ScanDiagnostic { file_name: name, error });
                continue;
            }
        };

        if let Some(master) = plugin.master_matching(&options.target_master_substring) {
            let master = master.name().to_string();
            tracing::debug!(plugin = %name, master = %master, "已依赖目标系统，跳过");
            report.skipped.push((name, SkipReason::AlreadyPatched(master)));
            continue;
        }

        if plugin.is_localized() {
            tracing::warn!(plugin = %name, "本地化插件，已跳过");
            report.skipped.push((name, SkipReason::Localized));
            continue;
        }

        if plugin.armor_records().is_empty() {
            report.skipped.push((name, SkipReason::NoArmor));
            continue;
        }

        report.plugins.push(ScannedPlugin { display_name: name, plugin });
    }

    tracing::info!(
        eligible = report.plugins.len(),
        skipped = report.skipped.len(),
        failed = report.diagnostics.len(),
        "扫描完成"
    );

    Ok(report)
}
