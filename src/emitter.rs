use crate::armor::{RecordOrigin, FORM_ID_SUBRECORDS};
use crate::config::PatcherConfig;
use crate::datatypes::{put_u32_at, u32_at, RecordFlags};
use crate::error::{EmitError, WriteError};
use crate::io::PluginWriter;
use crate::plugin::{Plugin, PluginIdentity};
use crate::record::Record;
use crate::selection::SlotGroup;
use crate::template::ArmorTemplate;
use crate::utils::{create_backup, format_form_id};
use std::fmt;
use std::path::{Path, PathBuf};

/// 单条覆盖记录的摘要
#[derive(Debug, Clone, PartialEq)]
pub struct PatchEntry {
    pub display_name: String,
    /// 补丁中的 FormID
    pub form_id: u32,
    pub rating_before: Option<f32>,
    pub rating_after: Option<f32>,
}

/// 补丁摘要（展示给操作员）
#[derive(Debug, Clone, PartialEq)]
pub struct PatchReport {
    pub source: String,
    pub template: String,
    pub masters: Vec<String>,
    pub entries: Vec<PatchEntry>,
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== 补丁摘要 ===")?;
        writeln!(f, "来源: {}", self.source)?;
        writeln!(f, "模板: {}", self.template)?;
        writeln!(f, "主文件: {}", self.masters.join(", "))?;
        writeln!(f, "覆盖记录: {}", self.entries.len())?;

        let rating = |r: Option<f32>| r.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());
        for entry in &self.entries {
            writeln!(
                f,
                "  [{}] {}: {} -> {}",
                format_form_id(entry.form_id),
                entry.display_name,
                rating(entry.rating_before),
                rating(entry.rating_after)
            )?;
        }
        Ok(())
    }
}

/// 生成结果：补丁插件 + 摘要
#[derive(Debug, Clone)]
pub struct PatchResult {
    pub patch: Plugin,
    pub report: PatchReport,
}

/// 补丁的依赖闭包
///
/// 顺序：源插件的主文件（按声明顺序）→ 源插件本身 → 目标系统主文件（尚未出现时）。
/// 源插件的主文件排在前面，使源 FormID 的主文件索引在补丁中保持不变。
pub fn dependency_closure(source: &Plugin, target: &PluginIdentity) -> Vec<PluginIdentity> {
    let mut closure: Vec<PluginIdentity> = Vec::with_capacity(source.masters().len() + 2);

    let candidates = source
        .masters()
        .iter()
        .chain(std::iter::once(source.identity()))
        .chain(std::iter::once(target));

    for identity in candidates {
        if !closure.contains(identity) {
            closure.push(identity.clone());
        }
    }

    closure
}

/// FormID 主文件索引重映射
///
/// 表下标为源插件的主文件索引，最后一项对应源插件自身
/// （索引 ≥ 主文件数的 FormID 都属于插件自身）。
#[derive(Debug, Clone)]
pub struct FormIdRemapper {
    table: Vec<Option<u8>>,
}

impl FormIdRemapper {
    pub fn new(source: &Plugin, patch: &Plugin) -> Self {
        let table = source
            .masters()
            .iter()
            .chain(std::iter::once(source.identity()))
            .map(|identity| patch.master_index(identity))
            .collect();
        FormIdRemapper { table }
    }

    /// 重映射单个 FormID（0 是空引用，保持不变）
    pub fn remap(&self, form_id: u32) -> Result<u32, EmitError> {
        if form_id == 0 {
            return Ok(0);
        }

        let index = (form_id >> 24) as u8;
        let slot = (index as usize).min(self.table.len().saturating_sub(1));
        match self.table.get(slot).copied().flatten() {
            Some(new_index) => Ok(((new_index as u32) << 24) | (form_id & 0x00FF_FFFF)),
            None => Err(EmitError::DanglingMaster { form_id, index }),
        }
    }

    /// 重映射记录自身及其引用子记录中的 FormID
    pub fn remap_record(&self, record: &mut Record) -> Result<(), EmitError> {
        record.form_id = self.remap(record.form_id)?;

        for subrecord in record
            .subrecords
            .iter_mut()
            .filter(|sr| FORM_ID_SUBRECORDS.contains(&sr.record_type.as_str()))
        {
            let offsets: Vec<usize> = if subrecord.record_type == "KWDA" {
                (0..subrecord.data.len() / 4).map(|i| i * 4).collect()
            } else if subrecord.data.len() == 4 {
                vec![0]
            } else {
                Vec::new()
            };

            for offset in offsets {
                if let Some(form_id) = u32_at(&subrecord.data, offset) {
                    put_u32_at(&mut subrecord.data, offset, self.remap(form_id)?);
                }
            }
        }

        Ok(())
    }
}

/// 记录引用的全部 FormID（记录自身 + 引用子记录，不含空引用）
pub fn referenced_form_ids(record: &Record) -> Vec<u32> {
    let mut ids = vec![record.form_id];

    for subrecord in record
        .subrecords
        .iter()
        .filter(|sr| FORM_ID_SUBRECORDS.contains(&sr.record_type.as_str()))
    {
        if subrecord.record_type == "KWDA" {
            ids.extend((0..subrecord.data.len() / 4).filter_map(|i| u32_at(&subrecord.data, i * 4)));
        } else if subrecord.data.len() == 4 {
            ids.extend(u32_at(&subrecord.data, 0));
        }
    }

    ids.retain(|&id| id != 0);
    ids
}

/// 无法在插件主文件列表中解析的 FormID
///
/// 补丁本身不定义新记录，所以主文件索引 ≥ 主文件数的引用都视为悬空。
pub fn dangling_references(plugin: &Plugin) -> Vec<u32> {
    let master_count = plugin.masters().len();
    plugin
        .armor_records()
        .iter()
        .flat_map(|armor| referenced_form_ids(armor.record()))
        .filter(|id| (id >> 24) as usize >= master_count)
        .collect()
}

/// 为选中的分组生成补丁
///
/// 每条记录生成一个覆盖记录：FormID 重映射到补丁的主文件列表，
/// 模板只覆盖它给出的字段。不写磁盘，写出见 [`write_patch`]。
pub fn emit(
    source: &Plugin,
    group: &SlotGroup<'_>,
    template: &ArmorTemplate,
    config: &PatcherConfig,
) -> Result<PatchResult, EmitError> {
    // FULL 只是 StringID，复制到非本地化的补丁里会变成乱码
    if source.is_localized() {
        return Err(EmitError::LocalizedSource(source.get_name().to_string()));
    }

    let mut patch = Plugin::new(config.patch_identity());
    patch.header.author = Some(config.author.clone());
    patch.replace_masters(dependency_closure(source, &config.target_identity()))?;

    let remapper = FormIdRemapper::new(source, &patch);
    let mut entries = Vec::with_capacity(group.len());

    for armor in &group.records {
        let mut record = armor.record().clone();
        record.flags &= !RecordFlags::COMPRESSED.bits();
        record.timestamp = 0;
        record.version_control_info = 0;

        remapper.remap_record(&mut record)?;
        template.overlay(&mut record);

        let origin = RecordOrigin {
            plugin: armor.owner().clone(),
            form_id: armor.form_id(),
        };
        patch.add_override(origin, record);

        if let Some(overridden) = patch.armor_records().last() {
            entries.push(PatchEntry {
                display_name: armor.display_name(),
                form_id: overridden.form_id(),
                rating_before: armor.armor_rating(),
                rating_after: overridden.armor_rating(),
            });
        }
    }

    if let Some(&form_id) = dangling_references(&patch).first() {
        return Err(EmitError::DanglingMaster { form_id, index: (form_id >> 24) as u8 });
    }

    tracing::info!(
        source = source.get_name(),
        slot = %group.tag,
        template = %template.name,
        records = entries.len(),
        "补丁已生成"
    );

    let report = PatchReport {
        source: source.get_name().to_string(),
        template: template.name.clone(),
        masters: patch.masters().iter().map(|m| m.name().to_string()).collect(),
        entries,
    };

    Ok(PatchResult { patch, report })
}

/// 写出补丁
///
/// 目标文件已存在且 `backup` 为真时先备份，返回备份路径。
pub fn write_patch(
    patch: &Plugin,
    path: &Path,
    writer: &dyn PluginWriter,
    backup: bool,
) -> Result<Option<PathBuf>, WriteError> {
    let backup_path = if backup && path.is_file() {
        let backup_path = create_backup(path)?;
        tracing::info!(backup = %backup_path.display(), "已备份旧补丁");
        Some(backup_path)
    } else {
        None
    };

    patch.write(path, writer)?;
    tracing::info!(path = %path.display(), "补丁已写出");
    Ok(backup_path)
}
