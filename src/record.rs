use crate::datatypes::{read_u16, read_u32, RawString, RecordFlags};
use crate::error::{LoadError, WriteError};
use crate::subrecord::Subrecord;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};

/// 记录头部大小（类型 + 大小 + 标志 + FormID + 时间戳 + 版本控制 + 内部版本 + 未知）
pub const RECORD_HEADER_SIZE: u64 = 24;

/// 记录结构
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 记录类型（原始4字节）
    pub record_type_bytes: [u8; 4],
    /// 记录类型字符串（用于比较）
    pub record_type: String,
    /// 标志位（原始32位数据）
    pub flags: u32,
    /// FormID
    pub form_id: u32,
    /// 时间戳
    pub timestamp: u16,
    /// 版本控制信息
    pub version_control_info: u16,
    /// 内部版本
    pub internal_version: u16,
    /// 未知字段
    pub unknown: u16,
    /// 子记录列表（压缩记录保存解压后的内容）
    pub subrecords: Vec<Subrecord>,
}

impl Record {
    /// 构造空记录
    pub fn new(record_type: &[u8; 4], form_id: u32) -> Self {
        Record {
            record_type_bytes: *record_type,
            record_type: String::from_utf8_lossy(record_type).into_owned(),
            flags: 0,
            form_id,
            timestamp: 0,
            version_control_info: 0,
            internal_version: 0,
            unknown: 0,
            subrecords: Vec::new(),
        }
    }

    /// 解析记录
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self, LoadError> {
        if cursor.position() + RECORD_HEADER_SIZE > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated("记录头部不完整".into()));
        }

        let mut type_bytes = [0u8; 4];
        cursor.read_exact(&mut type_bytes)?;
        let record_type = String::from_utf8_lossy(&type_bytes).into_owned();

        let data_size = read_u32(cursor)?;
        Self::validate_data_size(data_size, &record_type)?;

        let flags = read_u32(cursor)?;
        let form_id = read_u32(cursor)?;
        let timestamp = read_u16(cursor)?;
        let version_control_info = read_u16(cursor)?;
        let internal_version = read_u16(cursor)?;
        let unknown = read_u16(cursor)?;

        if cursor.position() + data_size as u64 > cursor.get_ref().len() as u64 {
            return Err(LoadError::Truncated(format!(
                "记录 {} [{:08X}] 需要 {} 字节数据",
                record_type, form_id, data_size
            )));
        }

        let mut data = vec![0u8; data_size as usize];
        cursor.read_exact(&mut data)?;

        let payload = if flags & RecordFlags::COMPRESSED.bits() != 0 {
            let decompressed = Self::decompress_data(&data).map_err(|e| {
                LoadError::CorruptRecord(format!("记录 {} [{:08X}] 解压失败: {}", record_type, form_id, e))
            })?;
            tracing::trace!(record_type = %record_type, form_id, from = data.len(), to = decompressed.len(), "解压记录");
            decompressed
        } else {
            data
        };

        let subrecords = Self::parse_subrecords(&payload)?;

        Ok(Record {
            record_type_bytes: type_bytes,
            record_type,
            flags,
            form_id,
            timestamp,
            version_control_info,
            internal_version,
            unknown,
            subrecords,
        })
    }

    /// 验证数据大小
    fn validate_data_size(data_size: u32, record_type: &str) -> Result<(), LoadError> {
        if data_size > 100_000_000 {  // 100MB限制
            return Err(LoadError::CorruptRecord(format!(
                "记录 {} 数据大小异常: {} bytes", record_type, data_size
            )));
        }
        Ok(())
    }

    /// 解压缩数据
    fn decompress_data(data: &[u8]) -> Result<Vec<u8>, String> {
        if data.len() < 4 {
            return Err("压缩数据太短，无法包含解压大小".into());
        }

        let mut data_cursor = Cursor::new(data);
        let decompressed_size = read_u32(&mut data_cursor).map_err(|e| e.to_string())?;

        if decompressed_size == 0 || decompressed_size > 50_000_000 {
            return Err(format!("解压大小异常: {} bytes", decompressed_size));
        }

        let mut decoder = ZlibDecoder::new(&data[4..]);
        let mut decompressed = Vec::with_capacity(decompressed_size as usize);
        decoder.read_to_end(&mut decompressed).map_err(|e| e.to_string())?;

        if decompressed.len() != decompressed_size as usize {
            return Err(format!("解压大小不匹配: 期望 {} bytes，实际 {} bytes",
                decompressed_size, decompressed.len()));
        }

        Ok(decompressed)
    }

    /// 解析子记录
    fn parse_subrecords(data: &[u8]) -> Result<Vec<Subrecord>, LoadError> {
        let mut subrecords = Vec::new();
        let mut cursor = Cursor::new(data);

        while cursor.position() < data.len() as u64 {
            let remaining = data.len() as u64 - cursor.position();

            // 子记录最小头部为 6 字节；不足时只允许 NULL 填充
            if remaining < 6 {
                let remaining_bytes = &data[cursor.position() as usize..];
                if remaining_bytes.iter().all(|&b| b == 0) {
                    break;
                }
                return Err(LoadError::CorruptRecord(format!(
                    "记录末尾有 {} 字节非 NULL 数据: {:02X?}",
                    remaining, remaining_bytes
                )));
            }

            subrecords.push(Subrecord::parse(&mut cursor)?);
        }

        Ok(subrecords)
    }

    /// 获取记录类型
    pub fn get_type(&self) -> &str {
        &self.record_type
    }

    /// 获取标志位
    pub fn get_flags(&self) -> RecordFlags {
        RecordFlags::from_bits_truncate(self.flags)
    }

    /// FormID 高字节：主文件索引
    pub fn master_index(&self) -> u8 {
        (self.form_id >> 24) as u8
    }

    /// 查找子记录
    pub fn find_subrecord(&self, record_type: &str) -> Option<&Subrecord> {
        self.subrecords.iter().find(|sr| sr.record_type == record_type)
    }

    /// 查找子记录（可变）
    pub fn find_subrecord_mut(&mut self, record_type: &str) -> Option<&mut Subrecord> {
        self.subrecords.iter_mut().find(|sr| sr.record_type == record_type)
    }

    /// 获取编辑器ID
    pub fn get_editor_id(&self) -> Option<String> {
        self.find_subrecord("EDID")
            .map(|sr| RawString::parse_zstring(&sr.data).content)
            .filter(|s| !s.is_empty())
    }

    /// 序列化子记录负载（未压缩）
    fn payload(&self) -> Result<Vec<u8>, WriteError> {
        let mut payload = Vec::new();
        for subrecord in &self.subrecords {
            subrecord.write_to(&mut payload)?;
        }
        Ok(payload)
    }

    /// 重新压缩数据：u32 解压大小 + zlib 流
    fn recompress_data(payload: &[u8]) -> Result<Vec<u8>, WriteError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(payload)?;
        let compressed_data = encoder.finish()?;

        let mut result = Vec::with_capacity(compressed_data.len() + 4);
        result.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        result.extend_from_slice(&compressed_data);
        Ok(result)
    }

    /// 写入记录（保持原有的压缩标志）
    pub fn write_to(&self, output: &mut Vec<u8>) -> Result<(), WriteError> {
        let payload = self.payload()?;
        let data = if self.get_flags().contains(RecordFlags::COMPRESSED) {
            Self::recompress_data(&payload)?
        } else {
            payload
        };

        output.extend_from_slice(&self.record_type_bytes);
        output.extend_from_slice(&(data.len() as u32).to_le_bytes());
        output.extend_from_slice(&self.flags.to_le_bytes());
        output.extend_from_slice(&self.form_id.to_le_bytes());
        output.extend_from_slice(&self.timestamp.to_le_bytes());
        output.extend_from_slice(&self.version_control_info.to_le_bytes());
        output.extend_from_slice(&self.internal_version.to_le_bytes());
        output.extend_from_slice(&self.unknown.to_le_bytes());
        output.extend_from_slice(&data);

        Ok(())
    }
}
