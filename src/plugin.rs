mod identity;
mod parser;
mod stats;
mod writer;

pub use identity::{PluginIdentity, PluginKind};
pub use stats::PluginStats;

use crate::armor::{ArmorRecord, RecordOrigin};
use crate::datatypes::RecordFlags;
use crate::error::EmitError;
use crate::record::Record;
use std::path::PathBuf;

/// 写出新插件时使用的头部版本（Skyrim SE）
pub const DEFAULT_HEADER_VERSION: f32 = 1.71;

/// 新插件的第一个可用对象 ID
pub const DEFAULT_NEXT_OBJECT_ID: u32 = 0x800;

/// TES4 头部信息
#[derive(Debug, Clone, PartialEq)]
pub struct PluginHeader {
    /// HEDR 版本
    pub version: f32,
    /// TES4 记录标志
    pub flags: u32,
    /// HEDR 中的下一个可用对象 ID
    pub next_object_id: u32,
    /// CNAM 作者
    pub author: Option<String>,
    /// SNAM 描述
    pub description: Option<String>,
}

impl Default for PluginHeader {
    fn default() -> Self {
        PluginHeader {
            version: DEFAULT_HEADER_VERSION,
            flags: 0,
            next_object_id: DEFAULT_NEXT_OBJECT_ID,
            author: None,
            description: None,
        }
    }
}

/// 插件容器
///
/// 只保留头部、主文件列表和 ARMO 记录，其他顶级组在加载时校验后跳过。
/// 主文件列表只能追加；整体替换只在生成补丁时的依赖重写阶段进行。
#[derive(Debug, Clone)]
pub struct Plugin {
    identity: PluginIdentity,
    /// 来源文件路径（内存中新建的插件为 None）
    pub path: Option<PathBuf>,
    /// 头部信息
    pub header: PluginHeader,
    masters: Vec<PluginIdentity>,
    armor: Vec<ArmorRecord>,
}

impl Plugin {
    /// 创建空插件
    pub fn new(identity: PluginIdentity) -> Self {
        let mut header = PluginHeader::default();
        if identity.kind() == PluginKind::Master {
            header.flags |= RecordFlags::MASTER_FILE.bits();
        }

        Plugin {
            identity,
            path: None,
            header,
            masters: Vec::new(),
            armor: Vec::new(),
        }
    }

    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    /// 获取插件名称
    pub fn get_name(&self) -> &str {
        self.identity.name()
    }

    /// 获取插件类型
    pub fn get_type(&self) -> PluginKind {
        self.identity.kind()
    }

    /// 是否主文件
    pub fn is_master(&self) -> bool {
        self.identity.kind() == PluginKind::Master
            || self.header.flags & RecordFlags::MASTER_FILE.bits() != 0
    }

    /// 是否本地化
    pub fn is_localized(&self) -> bool {
        self.header.flags & RecordFlags::LOCALIZED.bits() != 0
    }

    /// 是否轻量级插件
    pub fn is_light(&self) -> bool {
        self.identity.kind() == PluginKind::Light
            || self.header.flags & RecordFlags::LIGHT_MASTER.bits() != 0
    }

    /// 主文件列表（按声明顺序）
    pub fn masters(&self) -> &[PluginIdentity] {
        &self.masters
    }

    /// 追加主文件
    ///
    /// 已存在（大小写不敏感）时不重复添加，返回 `Ok(false)`。
    pub fn add_master(&mut self, master: PluginIdentity) -> Result<bool, EmitError> {
        if master == self.identity {
            return Err(EmitError::SelfMaster(master.name().to_string()));
        }
        if self.declares_master(&master) {
            return Ok(false);
        }
        self.masters.push(master);
        Ok(true)
    }

    /// 依赖重写：整体替换主文件列表
    pub(crate) fn replace_masters(&mut self, masters: Vec<PluginIdentity>) -> Result<(), EmitError> {
        let mut deduped: Vec<PluginIdentity> = Vec::with_capacity(masters.len());
        for master in masters {
            if master == self.identity {
                return Err(EmitError::SelfMaster(master.name().to_string()));
            }
            if !deduped.contains(&master) {
                deduped.push(master);
            }
        }
        self.masters = deduped;
        Ok(())
    }

    /// 是否声明了某个主文件（大小写不敏感）
    pub fn declares_master(&self, candidate: &PluginIdentity) -> bool {
        self.masters.iter().any(|m| m == candidate)
    }

    /// 查找名称包含给定子串的主文件（大小写不敏感）
    pub fn master_matching(&self, substring: &str) -> Option<&PluginIdentity> {
        self.masters.iter().find(|m| m.name_contains(substring))
    }

    /// 主文件在列表中的索引（即 FormID 高字节）
    pub fn master_index(&self, master: &PluginIdentity) -> Option<u8> {
        self.masters
            .iter()
            .position(|m| m == master)
            .and_then(|i| u8::try_from(i).ok())
    }

    /// 护甲记录（文件中的顺序）
    pub fn armor_records(&self) -> &[ArmorRecord] {
        &self.armor
    }

    /// 追加本插件定义的 ARMO 记录
    pub fn add_armor_record(&mut self, record: Record) {
        let localized = self.is_localized();
        self.armor.push(ArmorRecord::new(self.identity.clone(), localized, record));
    }

    /// 追加覆盖记录
    pub fn add_override(&mut self, origin: RecordOrigin, record: Record) {
        self.armor.push(ArmorRecord::new_override(self.identity.clone(), origin, record));
    }
}
