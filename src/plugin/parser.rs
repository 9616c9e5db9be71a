use super::{Plugin, PluginHeader, PluginIdentity};
use crate::datatypes::{read_f32, read_u32, RawString};
use crate::error::LoadError;
use crate::group::{Group, GROUP_HEADER_SIZE};
use crate::io::PluginReader;
use crate::record::Record;
use memmap2::Mmap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// 支持的 HEDR 版本：Skyrim LE (0.94)、Skyrim SE (1.70 / 1.71)
pub const SUPPORTED_HEADER_VERSIONS: &[f32] = &[0.94, 1.70, 1.71];

impl Plugin {
    /// 加载插件文件
    ///
    /// 使用内存映射读取，映射和文件句柄在函数返回前释放，无论成功与否。
    pub fn load(path: PathBuf) -> Result<Self, LoadError> {
        let identity = Self::identity_for(&path)?;

        let file = std::fs::File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(path.clone()),
            _ => LoadError::from(e),
        })?;

        if file.metadata()?.len() == 0 {
            return Err(LoadError::Truncated("空文件".into()));
        }

        // SAFETY: 映射只在本函数内使用，解析结果全部复制到自有内存
        let mmap = unsafe { Mmap::map(&file)? };
        let mut plugin = Self::parse(identity, &mmap[..])?;
        plugin.path = Some(path);
        Ok(plugin)
    }

    /// 使用自定义 Reader 加载插件文件（测试中可注入内存实现）
    pub fn load_with_reader(path: PathBuf, reader: &dyn PluginReader) -> Result<Self, LoadError> {
        let identity = Self::identity_for(&path)?;
        let raw = reader.read(&path)?;
        let mut plugin = Self::parse(identity, &raw.bytes)?;
        plugin.path = Some(path);
        Ok(plugin)
    }

    fn identity_for(path: &Path) -> Result<PluginIdentity, LoadError> {
        PluginIdentity::from_path(path).ok_or_else(|| LoadError::NotFound(path.to_path_buf()))
    }

    /// 从字节解析插件
    pub fn parse(identity: PluginIdentity, data: &[u8]) -> Result<Self, LoadError> {
        let mut cursor = Cursor::new(data);

        let header_record = Self::parse_header_record(&mut cursor)?;
        let header = Self::extract_header(&header_record)?;
        let masters = Self::extract_masters(&header_record, &identity)?;

        let mut plugin = Plugin::new(identity);
        plugin.header = header;
        plugin.masters = masters;

        for group in Self::parse_armor_groups(&mut cursor, data)? {
            for record in group.get_records() {
                if record.record_type == "ARMO" {
                    plugin.add_armor_record(record.clone());
                }
            }
        }

        tracing::debug!(
            plugin = %plugin.identity,
            masters = plugin.masters.len(),
            armor = plugin.armor.len(),
            "插件解析完成"
        );

        Ok(plugin)
    }

    /// 解析 TES4 头部记录
    fn parse_header_record(cursor: &mut Cursor<&[u8]>) -> Result<Record, LoadError> {
        let data = *cursor.get_ref();
        if data.len() < 4 {
            return Err(LoadError::Truncated("文件不足 4 字节".into()));
        }
        if &data[..4] != b"TES4" {
            return Err(LoadError::CorruptHeader(format!(
                "期望 TES4，实际为 {}",
                String::from_utf8_lossy(&data[..4])
            )));
        }

        Record::parse(cursor).map_err(|e| match e {
            LoadError::CorruptRecord(msg) => LoadError::CorruptHeader(msg),
            other => other,
        })
    }

    /// 提取 HEDR / CNAM / SNAM
    fn extract_header(header: &Record) -> Result<PluginHeader, LoadError> {
        let hedr = header
            .find_subrecord("HEDR")
            .ok_or_else(|| LoadError::CorruptHeader("缺少 HEDR 子记录".into()))?;

        if hedr.data.len() < 12 {
            return Err(LoadError::CorruptHeader(format!("HEDR 长度异常: {} bytes", hedr.data.len())));
        }

        let mut cursor = Cursor::new(&hedr.data[..]);
        let version = read_f32(&mut cursor)?;
        let _record_count = read_u32(&mut cursor)?;
        let next_object_id = read_u32(&mut cursor)?;

        if !SUPPORTED_HEADER_VERSIONS.iter().any(|v| (v - version).abs() < 0.001) {
            return Err(LoadError::UnsupportedVersion(version));
        }

        let text = |name: &str| {
            header
                .find_subrecord(name)
                .map(|sr| RawString::parse_zstring(&sr.data).content)
                .filter(|s| !s.is_empty())
        };

        Ok(PluginHeader {
            version,
            flags: header.flags,
            next_object_id,
            author: text("CNAM"),
            description: text("SNAM"),
        })
    }

    /// 从头部记录提取主文件列表
    fn extract_masters(header: &Record, identity: &PluginIdentity) -> Result<Vec<PluginIdentity>, LoadError> {
        let mut masters: Vec<PluginIdentity> = Vec::new();

        for sr in header.subrecords.iter().filter(|sr| sr.record_type == "MAST") {
            let master = PluginIdentity::from_file_name(&RawString::parse_zstring(&sr.data).content);

            if &master == identity {
                return Err(LoadError::CorruptHeader(format!("{} 把自己声明为主文件", identity)));
            }
            // 主文件位置决定 FormID 高字节，重复项不能简单丢弃
            if masters.contains(&master) {
                return Err(LoadError::CorruptHeader(format!("{} 重复声明主文件 {}", identity, master)));
            }
            masters.push(master);
        }

        Ok(masters)
    }

    /// 遍历顶级组：ARMO 组完整解析，其余组只校验边界后跳过
    fn parse_armor_groups(cursor: &mut Cursor<&[u8]>, data: &[u8]) -> Result<Vec<Group>, LoadError> {
        let mut groups = Vec::new();

        while cursor.position() < data.len() as u64 {
            let pos = cursor.position();

            if pos + GROUP_HEADER_SIZE as u64 > data.len() as u64 {
                return Err(LoadError::Truncated(format!("位置 {} 的组头部不完整", pos)));
            }

            let mut type_bytes = [0u8; 4];
            cursor.read_exact(&mut type_bytes)?;
            if &type_bytes != b"GRUP" {
                return Err(LoadError::CorruptRecord(format!(
                    "在位置 {} 期望 GRUP，但找到 {}",
                    pos,
                    String::from_utf8_lossy(&type_bytes)
                )));
            }

            let size = read_u32(cursor)?;
            if size < GROUP_HEADER_SIZE || size > 200_000_000 {
                return Err(LoadError::CorruptRecord(format!("在位置 {} 发现异常组大小: {} bytes", pos, size)));
            }

            let end = pos + size as u64;
            if end > data.len() as u64 {
                return Err(LoadError::Truncated(format!(
                    "位置 {} 的组需要 {} 字节，文件只剩 {} 字节",
                    pos,
                    size,
                    data.len() as u64 - pos
                )));
            }

            let mut label = [0u8; 4];
            cursor.read_exact(&mut label)?;

            if &label == b"ARMO" {
                let mut group_cursor = Cursor::new(&data[pos as usize..end as usize]);
                groups.push(Group::parse(&mut group_cursor)?);
            }

            cursor.set_position(end);
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subrecord::Subrecord;

    fn header_bytes(version: f32, masters: &[&str]) -> Vec<u8> {
        let mut header = Record::new(b"TES4", 0);
        let mut hedr = version.to_le_bytes().to_vec();
        hedr.extend_from_slice(&0u32.to_le_bytes());
        hedr.extend_from_slice(&0x800u32.to_le_bytes());
        header.subrecords.push(Subrecord::new(b"HEDR", hedr));
        for master in masters {
            header.subrecords.push(Subrecord::new(b"MAST", RawString::to_zstring(master)));
            header.subrecords.push(Subrecord::new(b"DATA", 0u64.to_le_bytes().to_vec()));
        }
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        bytes
    }

    fn id(name: &str) -> PluginIdentity {
        PluginIdentity::from_file_name(name)
    }

    #[test]
    fn test_parse_header_only() {
        let bytes = header_bytes(1.71, &["Skyrim.esm", "Update.esm"]);
        let plugin = Plugin::parse(id("ArmorModA.esp"), &bytes).unwrap();

        let names: Vec<_> = plugin.masters().iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Skyrim.esm", "Update.esm"]);
        assert!(plugin.armor_records().is_empty());
        assert_eq!(plugin.header.next_object_id, 0x800);
    }

    #[test]
    fn test_wrong_magic_is_corrupt_header() {
        let mut bytes = header_bytes(1.71, &[]);
        bytes[..4].copy_from_slice(b"TES3");
        assert!(matches!(
            Plugin::parse(id("Bad.esp"), &bytes),
            Err(LoadError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let bytes = header_bytes(1.0, &[]);
        assert!(matches!(
            Plugin::parse(id("Fallout.esp"), &bytes),
            Err(LoadError::UnsupportedVersion(v)) if (v - 1.0).abs() < f32::EPSILON
        ));
    }

    #[test]
    fn test_legacy_version_accepted() {
        let bytes = header_bytes(0.94, &["Skyrim.esm"]);
        assert!(Plugin::parse(id("Legacy.esp"), &bytes).is_ok());
    }

    #[test]
    fn test_missing_hedr() {
        let header = Record::new(b"TES4", 0);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        assert!(matches!(
            Plugin::parse(id("NoHedr.esp"), &bytes),
            Err(LoadError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = header_bytes(1.71, &["Skyrim.esm"]);
        assert!(matches!(
            Plugin::parse(id("Cut.esp"), &bytes[..bytes.len() - 5]),
            Err(LoadError::Truncated(_))
        ));
        assert!(matches!(Plugin::parse(id("Tiny.esp"), b"TE"), Err(LoadError::Truncated(_))));
    }

    #[test]
    fn test_self_master_is_corrupt() {
        let bytes = header_bytes(1.71, &["Skyrim.esm", "armormoda.esp"]);
        assert!(matches!(
            Plugin::parse(id("ArmorModA.esp"), &bytes),
            Err(LoadError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_non_armor_groups_are_skipped() {
        let mut bytes = header_bytes(1.71, &["Skyrim.esm"]);

        let mut weap_group = Group::top_level(b"WEAP");
        let mut weapon = Record::new(b"WEAP", 0x0100_0800);
        weapon.subrecords.push(Subrecord::new(b"EDID", RawString::to_zstring("IronSword")));
        weap_group.children.push(crate::group::GroupChild::Record(weapon));
        weap_group.write_to(&mut bytes).unwrap();

        let mut armo_group = Group::top_level(b"ARMO");
        let mut helmet = Record::new(b"ARMO", 0x0100_0801);
        helmet.subrecords.push(Subrecord::new(b"EDID", RawString::to_zstring("IronHelmet")));
        armo_group.children.push(crate::group::GroupChild::Record(helmet));
        armo_group.write_to(&mut bytes).unwrap();

        let plugin = Plugin::parse(id("ArmorModA.esp"), &bytes).unwrap();
        assert_eq!(plugin.armor_records().len(), 1);
        assert_eq!(plugin.armor_records()[0].display_name(), "IronHelmet");
        assert_eq!(plugin.armor_records()[0].owner().name(), "ArmorModA.esp");
    }

    #[test]
    fn test_truncated_group_reported() {
        let mut bytes = header_bytes(1.71, &[]);
        let mut group = Group::top_level(b"WEAP");
        group.children.push(crate::group::GroupChild::Record(Record::new(b"WEAP", 0x800)));
        group.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 4);

        assert!(matches!(
            Plugin::parse(id("Cut.esp"), &bytes),
            Err(LoadError::Truncated(_))
        ));
    }

    struct MemoryReader(Vec<u8>);

    impl PluginReader for MemoryReader {
        fn read(&self, _path: &Path) -> Result<crate::io::RawPluginData, LoadError> {
            Ok(crate::io::RawPluginData { bytes: self.0.clone() })
        }
    }

    #[test]
    fn test_load_with_memory_reader() {
        let reader = MemoryReader(header_bytes(1.70, &["Skyrim.esm"]));
        let plugin = Plugin::load_with_reader(PathBuf::from("Data/ArmorModA.esp"), &reader).unwrap();

        assert_eq!(plugin.get_name(), "ArmorModA.esp");
        assert_eq!(plugin.path.as_deref(), Some(Path::new("Data/ArmorModA.esp")));
        assert!(plugin.declares_master(&id("skyrim.esm")));
    }

    #[test]
    fn test_duplicate_master_is_corrupt() {
        let bytes = header_bytes(1.71, &["Skyrim.esm", "Update.esm", "SKYRIM.ESM"]);
        assert!(matches!(
            Plugin::parse(id("ArmorModA.esp"), &bytes),
            Err(LoadError::CorruptHeader(msg)) if msg.contains("重复")
        ));
    }
}
