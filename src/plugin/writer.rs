use super::Plugin;
use crate::datatypes::RawString;
use crate::error::WriteError;
use crate::group::{Group, GroupChild};
use crate::io::{DefaultPluginWriter, PluginWriter, RawPluginData};
use crate::record::Record;
use crate::subrecord::Subrecord;
use std::path::Path;

impl Plugin {
    /// 序列化为字节
    ///
    /// 输出只由内存状态决定（不写入时间戳），同一状态多次序列化结果完全一致。
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let group = self.armor_group();
        let mut output = Vec::new();

        self.build_header_record(group.as_ref()).write_to(&mut output)?;
        if let Some(group) = group {
            group.write_to(&mut output)?;
        }

        Ok(output)
    }

    /// 通过指定 writer 写出
    pub fn write(&self, path: &Path, writer: &dyn PluginWriter) -> Result<(), WriteError> {
        let bytes = self.to_bytes()?;
        writer.write(&RawPluginData { bytes }, path)
    }

    /// 写入文件（临时文件 + 原子替换）
    pub fn write_to_file(&self, path: &Path) -> Result<(), WriteError> {
        self.write(path, &DefaultPluginWriter)
    }

    /// ARMO 顶级组（没有记录时不写出空组）
    fn armor_group(&self) -> Option<Group> {
        if self.armor.is_empty() {
            return None;
        }

        let mut group = Group::top_level(b"ARMO");
        group.children = self
            .armor
            .iter()
            .map(|armor| GroupChild::Record(armor.record().clone()))
            .collect();
        Some(group)
    }

    /// 构建 TES4 头部记录
    fn build_header_record(&self, group: Option<&Group>) -> Record {
        // HEDR 的记录数包含组本身
        let record_count = match group {
            Some(g) => g.children.len() as u32 + 1,
            None => 0,
        };

        let mut hedr = Vec::with_capacity(12);
        hedr.extend_from_slice(&self.header.version.to_le_bytes());
        hedr.extend_from_slice(&record_count.to_le_bytes());
        hedr.extend_from_slice(&self.header.next_object_id.to_le_bytes());

        let mut header = Record::new(b"TES4", 0);
        header.flags = self.header.flags;
        header.subrecords.push(Subrecord::new(b"HEDR", hedr));

        if let Some(author) = &self.header.author {
            header.subrecords.push(Subrecord::new(b"CNAM", RawString::to_zstring(author)));
        }
        if let Some(description) = &self.header.description {
            header.subrecords.push(Subrecord::new(b"SNAM", RawString::to_zstring(description)));
        }

        for master in &self.masters {
            header.subrecords.push(Subrecord::new(b"MAST", RawString::to_zstring(master.name())));
            header.subrecords.push(Subrecord::new(b"DATA", 0u64.to_le_bytes().to_vec()));
        }

        header
    }
}

#[cfg(test)]
mod tests {
    use crate::plugin::{Plugin, PluginIdentity};
    use crate::record::Record;
    use crate::subrecord::Subrecord;

    fn sample_plugin() -> Plugin {
        let mut plugin = Plugin::new(PluginIdentity::from_file_name("ArmorModA.esp"));
        plugin.header.author = Some("Orcax".into());
        plugin.add_master(PluginIdentity::from_file_name("Skyrim.esm")).unwrap();

        let mut helmet = Record::new(b"ARMO", 0x0100_0800);
        helmet.subrecords.push(Subrecord::new(b"EDID", b"IronHelmet\0".to_vec()));
        helmet.subrecords.push(Subrecord::new(b"DNAM", 1500i32.to_le_bytes().to_vec()));
        plugin.add_armor_record(helmet);
        plugin
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ArmorModA.esp");

        let plugin = sample_plugin();
        plugin.write_to_file(&path).unwrap();

        let loaded = Plugin::load(path).unwrap();
        assert_eq!(loaded.masters(), plugin.masters());
        assert_eq!(loaded.header.author.as_deref(), Some("Orcax"));
        assert_eq!(loaded.armor_records().len(), 1);
        assert_eq!(loaded.armor_records()[0].record(), plugin.armor_records()[0].record());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let plugin = sample_plugin();
        assert_eq!(plugin.to_bytes().unwrap(), plugin.clone().to_bytes().unwrap());
    }

    #[test]
    fn test_empty_plugin_has_no_groups() {
        let plugin = Plugin::new(PluginIdentity::from_file_name("Empty.esp"));
        let bytes = plugin.to_bytes().unwrap();
        // TES4 头部 24 字节 + HEDR 子记录 18 字节
        assert_eq!(bytes.len(), 24 + 18);
        assert_eq!(&bytes[..4], b"TES4");
    }
}
