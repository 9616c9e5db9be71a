use crate::armor::{armor_type_offset, ArmorType};
use crate::classifier::SlotTag;
use crate::datatypes::put_u32_at;
use crate::error::ConfigError;
use crate::record::Record;
use crate::subrecord::Subrecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 属性模板
///
/// 只有给出的字段会覆盖到记录上，未给出的字段保留源记录的值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorTemplate {
    pub name: String,
    #[serde(default)]
    pub armor_rating: Option<f32>,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub armor_type: Option<ArmorType>,
}

impl ArmorTemplate {
    /// 把模板值覆盖到记录上
    ///
    /// 缺少 DNAM / DATA 时会补上对应子记录；没有 BOD2/BODT 的记录无法设置护甲类型。
    pub fn overlay(&self, record: &mut Record) {
        if let Some(rating) = self.armor_rating {
            let raw = (rating * 100.0).round() as i32 as u32;
            match record.find_subrecord_mut("DNAM") {
                Some(dnam) if dnam.data.len() >= 4 => {
                    put_u32_at(&mut dnam.data, 0, raw);
                }
                Some(dnam) => dnam.data = raw.to_le_bytes().to_vec(),
                None => record.subrecords.push(Subrecord::new(b"DNAM", raw.to_le_bytes().to_vec())),
            }
        }

        if self.value.is_some() || self.weight.is_some() {
            if record.find_subrecord("DATA").is_none() {
                record.subrecords.push(Subrecord::new(b"DATA", vec![0u8; 8]));
            }
            if let Some(data) = record.find_subrecord_mut("DATA") {
                if data.data.len() < 8 {
                    data.data.resize(8, 0);
                }
                if let Some(value) = self.value {
                    put_u32_at(&mut data.data, 0, value);
                }
                if let Some(weight) = self.weight {
                    put_u32_at(&mut data.data, 4, weight.to_bits());
                }
            }
        }

        if let Some(armor_type) = self.armor_type {
            if let Some((name, offset)) = armor_type_offset(record) {
                if let Some(sr) = record.find_subrecord_mut(name) {
                    if sr.data.len() < offset + 4 {
                        sr.data.resize(offset + 4, 0);
                    }
                    put_u32_at(&mut sr.data, offset, armor_type.to_u32());
                }
            } else {
                tracing::debug!(form_id = record.form_id, "记录没有 BOD2/BODT，跳过护甲类型");
            }
        }
    }
}

/// 槽位 → 模板列表
///
/// 进程内只读配置，启动时加载一次后按引用传递。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    slots: HashMap<SlotTag, Vec<ArmorTemplate>>,
}

impl TemplateSet {
    /// 内置模板（data/templates.json）
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(include_str!("../data/templates.json"))
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 某个槽位可用的模板（没有时为空）
    pub fn templates_for(&self, tag: SlotTag) -> &[ArmorTemplate] {
        self.slots.get(&tag).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 按名称查找（大小写不敏感）
    pub fn find(&self, tag: SlotTag, name: &str) -> Option<&ArmorTemplate> {
        self.templates_for(tag)
            .iter()
            .find(|t| t.name.to_lowercase() == name.to_lowercase())
    }
}
