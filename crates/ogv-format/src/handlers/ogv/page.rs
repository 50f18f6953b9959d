//! Ogg 页面读写.
//!
//! ```text
//! Capture pattern: "OggS" (4 bytes)
//! Version:         1 byte (always 0)
//! Header type:     1 byte (flags: continued=0x01, BOS=0x02, EOS=0x04)
//! Granule pos:     8 bytes (little-endian, codec-specific)
//! Serial number:   4 bytes (identifies logical stream)
//! Page seq no:     4 bytes
//! CRC checksum:    4 bytes
//! Num segments:    1 byte
//! Segment table:   N bytes
//! Page data:       sum(segment_table) bytes
//! ```

use ogv_core::{OgvError, OgvResult};

use crate::io::ByteStream;

/// Ogg 同步字 (capture pattern)
pub const OGG_SYNC: &[u8; 4] = b"OggS";
/// Ogg CRC-32 多项式
const OGG_CRC_POLY: u32 = 0x04C1_1DB7;
/// 固定头部长度 (不含段表)
const HEADER_SIZE: usize = 27;

/// 页面头部标志
pub const FLAG_CONTINUED: u8 = 0x01;
pub const FLAG_BOS: u8 = 0x02;
pub const FLAG_EOS: u8 = 0x04;

/// 已解析的 Ogg 页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPage {
    /// 头部标志
    pub header_type: u8,
    /// 粒度位置
    pub granule_position: i64,
    /// 逻辑流序列号
    pub serial_number: u32,
    /// 页面序号
    pub page_sequence: u32,
    /// 段表
    pub segment_table: Vec<u8>,
    /// 页面数据
    pub data: Vec<u8>,
}

impl OggPage {
    /// 用单个完整 packet 构造页面 (自动生成段表)
    ///
    /// 段表超过 255 项时返回 `InvalidArgument`.
    pub fn with_packet(
        header_type: u8,
        granule_position: i64,
        serial_number: u32,
        page_sequence: u32,
        packet: &[u8],
    ) -> OgvResult<Self> {
        let mut segment_table = vec![255u8; packet.len() / 255];
        segment_table.push((packet.len() % 255) as u8);
        if segment_table.len() > 255 {
            return Err(OgvError::InvalidArgument(format!(
                "packet 过大, 无法放入单个 Ogg 页面: {} 字节",
                packet.len()
            )));
        }
        Ok(Self {
            header_type,
            granule_position,
            serial_number,
            page_sequence,
            segment_table,
            data: packet.to_vec(),
        })
    }

    /// 是否为 BOS (beginning of stream) 页面
    pub fn is_bos(&self) -> bool {
        self.header_type & FLAG_BOS != 0
    }

    /// 是否为 EOS (end of stream) 页面
    pub fn is_eos(&self) -> bool {
        self.header_type & FLAG_EOS != 0
    }

    /// 是否为续延页面
    pub fn is_continued(&self) -> bool {
        self.header_type & FLAG_CONTINUED != 0
    }

    /// 页面内第一个 packet 的数据
    ///
    /// 段表中连续的 255 段与其后第一个小于 255 的段组成一个 packet.
    pub fn first_packet(&self) -> &[u8] {
        let mut length = 0usize;
        for &seg_size in &self.segment_table {
            length += seg_size as usize;
            if seg_size < 255 {
                break;
            }
        }
        &self.data[..length.min(self.data.len())]
    }

    /// 页面 CRC (CRC 字段按 0 参与计算)
    pub fn checksum(&self) -> u32 {
        ogg_crc32(&self.serialize_with_crc(0))
    }

    /// 序列化为字节 (含正确的 CRC)
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize_with_crc(self.checksum())
    }

    fn serialize_with_crc(&self, crc: u32) -> Vec<u8> {
        let mut page = Vec::with_capacity(HEADER_SIZE + self.segment_table.len() + self.data.len());
        page.extend_from_slice(OGG_SYNC);
        page.push(0);
        page.push(self.header_type);
        page.extend_from_slice(&(self.granule_position as u64).to_le_bytes());
        page.extend_from_slice(&self.serial_number.to_le_bytes());
        page.extend_from_slice(&self.page_sequence.to_le_bytes());
        page.extend_from_slice(&crc.to_le_bytes());
        page.push(self.segment_table.len() as u8);
        page.extend_from_slice(&self.segment_table);
        page.extend_from_slice(&self.data);
        page
    }
}

/// 计算 Ogg 页面 CRC-32
pub fn ogg_crc32(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        crc ^= u32::from(byte) << 24;
        for _ in 0..8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ OGG_CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// 从字节流读取一个 Ogg 页面并校验 CRC
pub fn read_page(stream: &mut ByteStream) -> OgvResult<OggPage> {
    let sync = stream.read_tag()?;
    if &sync != OGG_SYNC {
        return Err(OgvError::InvalidData("无效的 Ogg 同步字".into()));
    }

    let version = stream.read_u8()?;
    if version != 0 {
        return Err(OgvError::InvalidData(format!(
            "不支持的 Ogg 版本: {version}"
        )));
    }

    let header_type = stream.read_u8()?;
    let granule_position = stream.read_u64_le()? as i64;
    let serial_number = stream.read_u32_le()?;
    let page_sequence = stream.read_u32_le()?;
    let crc = stream.read_u32_le()?;
    let num_segments = stream.read_u8()? as usize;
    let segment_table = stream.read_bytes(num_segments)?;
    let data_size: usize = segment_table.iter().map(|&s| s as usize).sum();
    let data = stream.read_bytes(data_size)?;

    let page = OggPage {
        header_type,
        granule_position,
        serial_number,
        page_sequence,
        segment_table,
        data,
    };

    let crc_calc = page.checksum();
    if crc != crc_calc {
        return Err(OgvError::InvalidData(format!(
            "Ogg 页面 CRC 校验失败: 读取=0x{crc:08X}, 计算=0x{crc_calc:08X}",
        )));
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_roundtrip_through_stream() {
        let page = OggPage::with_packet(FLAG_BOS, 0, 0x1234_5678, 0, b"\x80theora").unwrap();
        let mut stream = ByteStream::from_memory(page.to_bytes());
        let parsed = read_page(&mut stream).unwrap();
        assert_eq!(parsed, page);
        assert!(parsed.is_bos());
        assert!(!parsed.is_eos());
        assert_eq!(parsed.first_packet(), b"\x80theora");
    }

    #[test]
    fn test_crc_mismatch_rejected() {
        let page = OggPage::with_packet(0, 10, 1, 3, &[1, 2, 3, 4]).unwrap();
        let mut bytes = page.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let mut stream = ByteStream::from_memory(bytes);
        assert!(matches!(
            read_page(&mut stream),
            Err(OgvError::InvalidData(msg)) if msg.contains("CRC")
        ));
    }

    #[test]
    fn test_bad_sync_rejected() {
        let mut stream = ByteStream::from_memory(b"RIFF\0\0\0\0WAVE".to_vec());
        assert!(matches!(
            read_page(&mut stream),
            Err(OgvError::InvalidData(_))
        ));
    }

    #[test]
    fn test_lacing_for_long_packet() {
        let packet = vec![7u8; 600];
        let page = OggPage::with_packet(0, 0, 9, 1, &packet).unwrap();
        assert_eq!(page.segment_table, vec![255, 255, 90]);
        assert_eq!(page.first_packet().len(), 600);

        // 长度恰为 255 的倍数时需要一个 0 段作为结束
        let page = OggPage::with_packet(0, 0, 9, 1, &[0u8; 255]).unwrap();
        assert_eq!(page.segment_table, vec![255, 0]);
    }

    #[test]
    fn test_truncated_page_is_eof() {
        let page = OggPage::with_packet(FLAG_BOS, 0, 1, 0, &[0u8; 40]).unwrap();
        let bytes = page.to_bytes();
        let mut stream = ByteStream::from_memory(bytes[..bytes.len() - 10].to_vec());
        assert!(matches!(read_page(&mut stream), Err(OgvError::Eof)));
    }
}
