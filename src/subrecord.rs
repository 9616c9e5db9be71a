use crate::datatypes::read_u16;
use crate::error::{LoadError, WriteError};
use std::io::{Cursor, Read};

/// 子记录结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subrecord {
    /// 4字符记录类型（原始字节）
    pub record_type_bytes: [u8; 4],
    /// 4字符记录类型（字符串，用于比较）
    pub record_type: String,
    /// 原始数据
    pub data: Vec<u8>,
}

impl Subrecord {
    /// 构造子记录
    pub fn new(record_type: &[u8; 4], data: Vec<u8>) -> Self {
        Subrecord {
            record_type_bytes: *record_type,
            record_type: String::from_utf8_lossy(record_type).into_owned(),
            data,
        }
    }

    /// 解析子记录
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self, LoadError> {
        if cursor.position() + 6 > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated("子记录头部不完整".into()));
        }

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;

        let size = read_u16(cursor)?;

        if cursor.position() + size as u64 > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated(format!(
                "子记录 {} 需要 {} 字节数据",
                String::from_utf8_lossy(&type_bytes),
                size
            )));
        }

        let mut data = vec![0u8; size as usize];
        cursor.read_exact(&mut data)?;

        Ok(Subrecord::new(&type_bytes, data))
    }

    /// 序列化子记录（类型 + u16 大小 + 数据）
    pub fn write_to(&self, output: &mut Vec<u8>) -> Result<(), WriteError> {
        let size = u16::try_from(self.data.len()).map_err(|_| {
            WriteError::Serialize(format!(
                "子记录 {} 超过 65535 字节: {}",
                self.record_type,
                self.data.len()
            ))
        })?;

        output.extend_from_slice(&self.record_type_bytes);
        output.extend_from_slice(&size.to_le_bytes());
        output.extend_from_slice(&self.data);
        Ok(())
    }

    /// 获取子记录类型
    pub fn get_type(&self) -> &str {
        &self.record_type
    }
}
