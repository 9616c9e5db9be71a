use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use encoding_rs;

// 基础类型读取函数
pub fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, std::io::Error> {
    cursor.read_u16::<LittleEndian>()
}

pub fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, std::io::Error> {
    cursor.read_u32::<LittleEndian>()
}

pub fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32, std::io::Error> {
    cursor.read_i32::<LittleEndian>()
}

pub fn read_f32(cursor: &mut Cursor<&[u8]>) -> Result<f32, std::io::Error> {
    cursor.read_f32::<LittleEndian>()
}

/// 读取子记录数据中指定偏移处的 u32（数据不足时返回 None）
pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// 读取子记录数据中指定偏移处的 f32
pub fn f32_at(data: &[u8], offset: usize) -> Option<f32> {
    u32_at(data, offset).map(f32::from_bits)
}

/// 覆写指定偏移处的 4 字节（越界时不做修改，返回 false）
pub fn put_u32_at(data: &mut [u8], offset: usize, value: u32) -> bool {
    match data.get_mut(offset..offset + 4) {
        Some(slot) => {
            slot.copy_from_slice(&value.to_le_bytes());
            true
        }
        None => false,
    }
}

// 支持的编码
const SUPPORTED_ENCODINGS: &[&str] = &["utf-8", "windows-1252", "windows-1250", "windows-1251"];

#[derive(Debug, Clone)]
pub struct RawString {
    pub content: String,
    pub encoding: String,
}

impl RawString {
    /// 尝试多种编码解码
    pub fn decode(data: &[u8]) -> Self {
        for encoding_name in SUPPORTED_ENCODINGS {
            if let Some(encoding) = encoding_rs::Encoding::for_label(encoding_name.as_bytes()) {
                let (decoded, _, had_errors) = encoding.decode(data);
                if !had_errors {
                    return RawString {
                        content: decoded.into_owned(),
                        encoding: encoding_name.to_string(),
                    };
                }
            }
        }

        // 回退到UTF-8，忽略错误
        RawString {
            content: String::from_utf8_lossy(data).into_owned(),
            encoding: "utf-8".to_string(),
        }
    }

    /// Z字符串解析(以null结尾)
    pub fn parse_zstring(data: &[u8]) -> Self {
        let null_pos = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Self::decode(&data[..null_pos])
    }

    /// 编码为以 null 结尾的字节序列（ASCII 以外按 UTF-8 写出）
    pub fn to_zstring(text: &str) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        bytes
    }
}

// 记录标志位定义
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordFlags: u32 {
        const MASTER_FILE = 0x00000001;        // ESM标志
        const DELETED = 0x00000020;            // 已删除
        const LOCALIZED = 0x00000080;          // 本地化
        const LIGHT_MASTER = 0x00000200;       // 轻量级主文件
        const COMPRESSED = 0x00040000;         // 压缩
    }
}

// BOD2 / BODT 中的 Biped 槽位标志（只列出分类用得到的位）
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BipedFlags: u32 {
        const HEAD = 0x00000001;     // 30
        const HAIR = 0x00000002;     // 31
        const BODY = 0x00000004;     // 32
        const HANDS = 0x00000008;    // 33
        const FOREARMS = 0x00000010; // 34
        const CIRCLET = 0x00001000;  // 42
        const FEET = 0x00000080;     // 37
        const CALVES = 0x00000100;   // 38
        const SHIELD = 0x00000200;   // 39
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstring_stops_at_null() {
        let raw = RawString::parse_zstring(b"Requiem.esp\0junk");
        assert_eq!(raw.content, "Requiem.esp");
    }

    #[test]
    fn test_zstring_roundtrip_bytes() {
        assert_eq!(RawString::to_zstring("Skyrim.esm"), b"Skyrim.esm\0".to_vec());
    }

    #[test]
    fn test_offset_helpers() {
        let mut data = vec![0u8; 8];
        assert!(put_u32_at(&mut data, 4, 2500));
        assert_eq!(u32_at(&data, 4), Some(2500));
        assert_eq!(u32_at(&data, 6), None);
        assert!(!put_u32_at(&mut data, 5, 1), "越界写入应该被拒绝");

        put_u32_at(&mut data, 0, 1.5f32.to_bits());
        assert_eq!(f32_at(&data, 0), Some(1.5));
    }
}
