use crate::datatypes::{f32_at, u32_at, BipedFlags, RawString};
use crate::plugin::PluginIdentity;
use crate::record::Record;
use crate::utils::format_form_id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 含有 FormID 引用的 ARMO 子记录
///
/// `KWDA` 是 FormID 数组，其余都是单个 FormID。
pub const FORM_ID_SUBRECORDS: &[&str] = &[
    "KWDA", "MODL", "ETYP", "BIDS", "BAMT", "YNAM", "ZNAM", "RNAM", "TNAM", "EITM",
];

/// 护甲类型（BOD2 第二个 u32）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmorType {
    Light,
    Heavy,
    Clothing,
}

impl ArmorType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ArmorType::Light),
            1 => Some(ArmorType::Heavy),
            2 => Some(ArmorType::Clothing),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            ArmorType::Light => 0,
            ArmorType::Heavy => 1,
            ArmorType::Clothing => 2,
        }
    }
}

impl fmt::Display for ArmorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmorType::Light => write!(f, "轻甲"),
            ArmorType::Heavy => write!(f, "重甲"),
            ArmorType::Clothing => write!(f, "服装"),
        }
    }
}

/// 覆盖记录的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrigin {
    /// 源记录所在插件
    pub plugin: PluginIdentity,
    /// 源记录在其插件中的 FormID
    pub form_id: u32,
}

/// 护甲记录
///
/// 归属插件在构造时确定且不可更改；复制到另一个插件时会生成新的
/// `ArmorRecord`，并通过 `origin` 指回源记录。
#[derive(Debug, Clone, PartialEq)]
pub struct ArmorRecord {
    owner: PluginIdentity,
    localized: bool,
    origin: Option<RecordOrigin>,
    record: Record,
}

impl ArmorRecord {
    pub fn new(owner: PluginIdentity, localized: bool, record: Record) -> Self {
        ArmorRecord { owner, localized, origin: None, record }
    }

    /// 构造覆盖记录
    pub fn new_override(owner: PluginIdentity, origin: RecordOrigin, record: Record) -> Self {
        ArmorRecord { owner, localized: false, origin: Some(origin), record }
    }

    pub fn owner(&self) -> &PluginIdentity {
        &self.owner
    }

    pub fn origin(&self) -> Option<&RecordOrigin> {
        self.origin.as_ref()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn form_id(&self) -> u32 {
        self.record.form_id
    }

    pub fn editor_id(&self) -> Option<String> {
        self.record.get_editor_id()
    }

    /// 显示名称（本地化插件的 FULL 是 StringID，不可直接显示）
    pub fn full_name(&self) -> Option<String> {
        if self.localized {
            return None;
        }
        self.record
            .find_subrecord("FULL")
            .map(|sr| RawString::parse_zstring(&sr.data).content)
            .filter(|s| !s.is_empty())
    }

    /// 面向操作员的标识：EditorID，其次 FULL，最后 FormID
    pub fn display_name(&self) -> String {
        self.editor_id()
            .or_else(|| self.full_name())
            .unwrap_or_else(|| format_form_id(self.record.form_id))
    }

    /// Biped 槽位（BOD2 优先，其次旧格式 BODT）
    pub fn biped_flags(&self) -> Option<BipedFlags> {
        self.record
            .find_subrecord("BOD2")
            .or_else(|| self.record.find_subrecord("BODT"))
            .and_then(|sr| u32_at(&sr.data, 0))
            .map(BipedFlags::from_bits_truncate)
    }

    pub fn armor_type(&self) -> Option<ArmorType> {
        armor_type_offset(&self.record)
            .and_then(|(name, offset)| {
                self.record.find_subrecord(name).and_then(|sr| u32_at(&sr.data, offset))
            })
            .and_then(ArmorType::from_u32)
    }

    /// 护甲值（DNAM 以 ×100 的整数存储）
    pub fn armor_rating(&self) -> Option<f32> {
        self.record
            .find_subrecord("DNAM")
            .and_then(|sr| u32_at(&sr.data, 0))
            .map(|raw| raw as i32 as f32 / 100.0)
    }

    pub fn value(&self) -> Option<u32> {
        self.record.find_subrecord("DATA").and_then(|sr| u32_at(&sr.data, 0))
    }

    pub fn weight(&self) -> Option<f32> {
        self.record.find_subrecord("DATA").and_then(|sr| f32_at(&sr.data, 4))
    }
}

/// 护甲类型字段所在的子记录与偏移
///
/// BOD2: 槽位 u32 + 护甲类型 u32；BODT: 槽位 u32 + 通用标志 u8 + 3 字节填充 + 护甲类型 u32。
pub(crate) fn armor_type_offset(record: &Record) -> Option<(&'static str, usize)> {
    if record.find_subrecord("BOD2").is_some() {
        Some(("BOD2", 4))
    } else if record.find_subrecord("BODT").is_some_and(|sr| sr.data.len() >= 12) {
        Some(("BODT", 8))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subrecord::Subrecord;

    fn iron_helmet() -> Record {
        let mut record = Record::new(b"ARMO", 0x0001_2E4D);
        record.subrecords.push(Subrecord::new(b"EDID", b"ArmorIronHelmet\0".to_vec()));
        record.subrecords.push(Subrecord::new(b"FULL", b"Iron Helmet\0".to_vec()));
        let mut bod2 = BipedFlags::HEAD.union(BipedFlags::HAIR).bits().to_le_bytes().to_vec();
        bod2.extend_from_slice(&1u32.to_le_bytes());
        record.subrecords.push(Subrecord::new(b"BOD2", bod2));
        let mut data = 60u32.to_le_bytes().to_vec();
        data.extend_from_slice(&5.0f32.to_le_bytes());
        record.subrecords.push(Subrecord::new(b"DATA", data));
        record.subrecords.push(Subrecord::new(b"DNAM", 1500i32.to_le_bytes().to_vec()));
        record
    }

    #[test]
    fn test_field_accessors() {
        let armor = ArmorRecord::new(PluginIdentity::from_file_name("Skyrim.esm"), false, iron_helmet());
        assert_eq!(armor.display_name(), "ArmorIronHelmet");
        assert_eq!(armor.full_name().as_deref(), Some("Iron Helmet"));
        assert_eq!(armor.armor_rating(), Some(15.0));
        assert_eq!(armor.value(), Some(60));
        assert_eq!(armor.weight(), Some(5.0));
        assert_eq!(armor.armor_type(), Some(ArmorType::Heavy));
        assert!(armor.biped_flags().unwrap().contains(BipedFlags::HEAD));
        assert_eq!(armor.owner().name(), "Skyrim.esm");
        assert!(armor.origin().is_none());
    }

    #[test]
    fn test_localized_full_is_hidden() {
        let mut record = iron_helmet();
        record.subrecords.retain(|sr| sr.record_type != "EDID");
        let armor = ArmorRecord::new(PluginIdentity::from_file_name("Skyrim.esm"), true, record);
        assert_eq!(armor.full_name(), None);
        assert_eq!(armor.display_name(), "00012E4D");
    }

    #[test]
    fn test_bodt_armor_type() {
        let mut record = Record::new(b"ARMO", 0x800);
        let mut bodt = BipedFlags::FEET.bits().to_le_bytes().to_vec();
        bodt.extend_from_slice(&[0u8; 4]);
        bodt.extend_from_slice(&0u32.to_le_bytes());
        record.subrecords.push(Subrecord::new(b"BODT", bodt));

        let armor = ArmorRecord::new(PluginIdentity::from_file_name("Old.esp"), false, record);
        assert_eq!(armor.armor_type(), Some(ArmorType::Light));
        assert_eq!(armor.biped_flags(), Some(BipedFlags::FEET));
    }
}
