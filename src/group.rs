use crate::datatypes::{read_i32, read_u16, read_u32};
use crate::error::{LoadError, WriteError};
use crate::record::Record;
use std::io::{Cursor, Read};

/// 组头部大小
pub const GROUP_HEADER_SIZE: u32 = 24;

/// 组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    /// 普通组（顶级记录组）
    Normal,
    /// 世界组
    World,
    /// 单元格组
    Cell,
    /// 未知类型
    Unknown(i32),
}

impl GroupType {
    /// 转换为i32值
    pub fn to_i32(&self) -> i32 {
        match self {
            GroupType::Normal => 0,
            GroupType::World => 1,
            GroupType::Cell => 6,
            GroupType::Unknown(value) => *value,
        }
    }
}

impl From<i32> for GroupType {
    fn from(value: i32) -> Self {
        match value {
            0 => GroupType::Normal,
            1 => GroupType::World,
            6 => GroupType::Cell,
            _ => GroupType::Unknown(value),
        }
    }
}

/// 组结构
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// 标签（顶级组为记录类型）
    pub label: [u8; 4],
    /// 组类型
    pub group_type: GroupType,
    /// 时间戳
    pub timestamp: u16,
    /// 版本控制信息
    pub version_control_info: u16,
    /// 未知字段
    pub unknown: u32,
    /// 子元素
    pub children: Vec<GroupChild>,
}

/// 组子元素
#[derive(Debug, Clone, PartialEq)]
pub enum GroupChild {
    /// 子组
    Group(Box<Group>),
    /// 记录
    Record(Record),
}

impl Group {
    /// 创建空的顶级组
    pub fn top_level(label: &[u8; 4]) -> Self {
        Group {
            label: *label,
            group_type: GroupType::Normal,
            timestamp: 0,
            version_control_info: 0,
            unknown: 0,
            children: Vec::new(),
        }
    }

    /// 解析组
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self, LoadError> {
        if cursor.position() + GROUP_HEADER_SIZE as u64 > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated("组头部不完整".into()));
        }

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;
        if &type_bytes != b"GRUP" {
            return Err(LoadError::CorruptRecord(format!(
                "期望 GRUP，实际为 {}",
                String::from_utf8_lossy(&type_bytes)
            )));
        }

        let size = read_u32(cursor)?;
        if size < GROUP_HEADER_SIZE || size > 200_000_000 {
            return Err(LoadError::CorruptRecord(format!("组大小异常: {} bytes", size)));
        }

        let mut label = [0u8; 4];
        cursor.read_exact(&mut label)?;
        let group_type = GroupType::from(read_i32(cursor)?);
        let timestamp = read_u16(cursor)?;
        let version_control_info = read_u16(cursor)?;
        let unknown = read_u32(cursor)?;

        let data_end = cursor.position() + (size - GROUP_HEADER_SIZE) as u64;
        if data_end > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated(format!(
                "组 {} 需要 {} 字节数据",
                String::from_utf8_lossy(&label),
                size - GROUP_HEADER_SIZE
            )));
        }

        let mut children = Vec::new();
        while cursor.position() < data_end {
            let peek_pos = cursor.position();
            let mut peek_bytes = [0u8; 4];
            cursor.read_exact(&mut peek_bytes)?;
            cursor.set_position(peek_pos);

            if &peek_bytes == b"GRUP" {
                children.push(GroupChild::Group(Box::new(Group::parse(cursor)?)));
            } else {
                children.push(GroupChild::Record(Record::parse(cursor)?));
            }
        }

        if cursor.position() != data_end {
            return Err(LoadError::CorruptRecord(format!(
                "组 {} 的子元素越过了组边界",
                String::from_utf8_lossy(&label)
            )));
        }

        Ok(Group {
            label,
            group_type,
            timestamp,
            version_control_info,
            unknown,
            children,
        })
    }

    /// 获取所有记录（深度优先，保持文件顺序）
    pub fn get_records(&self) -> Vec<&Record> {
        let mut records = Vec::new();
        self.collect_records(&mut records);
        records
    }

    fn collect_records<'a>(&'a self, records: &mut Vec<&'a Record>) {
        for child in &self.children {
            match child {
                GroupChild::Group(group) => group.collect_records(records),
                GroupChild::Record(record) => records.push(record),
            }
        }
    }

    /// 获取组标签字符串
    pub fn get_label_string(&self) -> String {
        String::from_utf8_lossy(&self.label).into_owned()
    }

    /// 写入组（大小在写完子元素后回填）
    pub fn write_to(&self, output: &mut Vec<u8>) -> Result<(), WriteError> {
        let start = output.len();
        output.extend_from_slice(b"GRUP");
        output.extend_from_slice(&[0u8; 4]);
        output.extend_from_slice(&self.label);
        output.extend_from_slice(&self.group_type.to_i32().to_le_bytes());
        output.extend_from_slice(&self.timestamp.to_le_bytes());
        output.extend_from_slice(&self.version_control_info.to_le_bytes());
        output.extend_from_slice(&self.unknown.to_le_bytes());

        for child in &self.children {
            match child {
                GroupChild::Group(subgroup) => subgroup.write_to(output)?,
                GroupChild::Record(record) => record.write_to(output)?,
            }
        }

        let actual_size = u32::try_from(output.len() - start)
            .map_err(|_| WriteError::Serialize("组大小超过 4GB".into()))?;
        output[start + 4..start + 8].copy_from_slice(&actual_size.to_le_bytes());

        Ok(())
    }
}
