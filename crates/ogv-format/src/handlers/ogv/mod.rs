//! Ogg/Theora 字节流处理器.
//!
//! 处理器标识为 `OgvSource.OgvByteStreamHandler`, 为 `.ogv` / `video/ogg`
//! 创建 [`OgvSource`] 媒体源.

pub mod page;
pub mod source;
pub mod stream;

use log::debug;
use ogv_core::{OgvError, OgvResult};

pub use page::{OGG_SYNC, OggPage};
pub use source::{MAX_STREAMS, OgvSource};
pub use stream::{OggCodec, OgvStream};

use crate::handler::{ByteStreamHandler, ResolutionFlags};
use crate::io::ByteStream;
use crate::probe::{ContainerFormat, FormatProbe, ProbeScore, SCORE_MAX, probe_extension};
use crate::source::MediaSource;

/// 处理器标识
pub const HANDLER_ID: &str = "OgvSource.OgvByteStreamHandler";

/// Ogg/Theora 字节流处理器
#[derive(Debug, Default)]
pub struct OgvByteStreamHandler {
    /// 宿主传入的配置
    properties: Vec<(String, String)>,
}

impl OgvByteStreamHandler {
    /// 创建处理器实例 (工厂函数)
    pub fn create() -> OgvResult<Box<dyn ByteStreamHandler>> {
        Ok(Box::new(Self::default()))
    }

    /// 宿主传入的配置
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }
}

impl ByteStreamHandler for OgvByteStreamHandler {
    fn name(&self) -> &str {
        HANDLER_ID
    }

    fn set_properties(&mut self, properties: &[(String, String)]) -> OgvResult<()> {
        self.properties = properties.to_vec();
        Ok(())
    }

    fn create_object(
        &self,
        stream: ByteStream,
        url: &str,
        flags: ResolutionFlags,
    ) -> OgvResult<Box<dyn MediaSource>> {
        if !flags.contains(ResolutionFlags::MEDIA_SOURCE) {
            return Err(OgvError::InvalidArgument(format!(
                "{HANDLER_ID} 只能创建媒体源, flags={flags:?}"
            )));
        }
        debug!("{}: 为 {} 创建媒体源, flags={:?}", HANDLER_ID, url, flags);

        let mut source = OgvSource::new();
        source.open(stream)?;
        Ok(Box::new(source))
    }
}

/// ID3v2 标签头长度
pub(crate) const ID3V2_HEADER_SIZE: usize = 10;

/// ID3v2 标签总长度 (含头部), 数据不以 ID3v2 标签开头时返回 `None`
///
/// 标签体长度为 4 字节 syncsafe 整数, 每字节只用低 7 位.
pub(crate) fn id3v2_tag_size(data: &[u8]) -> Option<usize> {
    if data.len() < ID3V2_HEADER_SIZE || &data[0..3] != b"ID3" {
        return None;
    }
    let size = ((data[6] & 0x7F) as usize) << 21
        | ((data[7] & 0x7F) as usize) << 14
        | ((data[8] & 0x7F) as usize) << 7
        | (data[9] & 0x7F) as usize;
    Some(ID3V2_HEADER_SIZE + size)
}

/// Ogg 探测器
pub struct OggProbe;

impl FormatProbe for OggProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 4 && &data[0..4] == OGG_SYNC {
            return Some(SCORE_MAX);
        }
        // 某些文件会在 Ogg 前附带 ID3v2 标签, 尝试从标签后匹配
        if let Some(ogg_offset) = id3v2_tag_size(data) {
            if data.len() >= ogg_offset + 4 && &data[ogg_offset..ogg_offset + 4] == OGG_SYNC {
                return Some(SCORE_MAX - 2);
            }
        }
        probe_extension(filename, ContainerFormat::Ogg)
    }

    fn format(&self) -> ContainerFormat {
        ContainerFormat::Ogg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ogv::page::FLAG_BOS;
    use crate::handlers::ogv::stream::tests::theora_header;
    use crate::probe::SCORE_EXTENSION;
    use crate::source::SourceState;

    fn theora_only() -> Vec<u8> {
        OggPage::with_packet(FLAG_BOS, 0, 42, 0, &theora_header(176, 144, 15, 1))
            .unwrap()
            .to_bytes()
    }

    #[test]
    fn test_create_object_opens_source() {
        let handler = OgvByteStreamHandler::create().unwrap();
        assert_eq!(handler.name(), HANDLER_ID);

        let source = handler
            .create_object(
                ByteStream::from_memory(theora_only()),
                "/media/sharks.ogv",
                ResolutionFlags::MEDIA_SOURCE,
            )
            .unwrap();
        assert_eq!(source.state(), SourceState::Stopped);
        assert_eq!(source.streams().len(), 1);
        assert_eq!(source.streams()[0].codec, "theora");
    }

    #[test]
    fn test_create_object_requires_media_source_flag() {
        let handler = OgvByteStreamHandler::default();
        let result = handler.create_object(
            ByteStream::from_memory(theora_only()),
            "/media/sharks.ogv",
            ResolutionFlags::BYTE_STREAM,
        );
        assert!(matches!(result, Err(OgvError::InvalidArgument(_))));
    }

    #[test]
    fn test_create_object_rejects_non_ogg() {
        let handler = OgvByteStreamHandler::default();
        let result = handler.create_object(
            ByteStream::from_memory(b"\0\0\0\x18ftypisom".to_vec()),
            "/media/sharks.ogv",
            ResolutionFlags::MEDIA_SOURCE,
        );
        assert!(matches!(result, Err(OgvError::InvalidData(_))));
    }

    #[test]
    fn test_set_properties_kept() {
        let mut handler = OgvByteStreamHandler::default();
        handler
            .set_properties(&[("buffering".to_string(), "low".to_string())])
            .unwrap();
        assert_eq!(handler.properties().len(), 1);
    }

    #[test]
    fn test_ogg_probe() {
        assert_eq!(OggProbe.probe(b"OggS\0\x02", None), Some(SCORE_MAX));

        let mut id3 = b"ID3\x04\0\0\0\0\0\x02".to_vec();
        id3.extend_from_slice(&[0, 0]);
        id3.extend_from_slice(b"OggS");
        assert_eq!(OggProbe.probe(&id3, None), Some(SCORE_MAX - 2));

        assert_eq!(
            OggProbe.probe(&[0u8; 8], Some("sharks.ogv")),
            Some(SCORE_EXTENSION)
        );
        assert_eq!(OggProbe.probe(&[0u8; 8], Some("sharks.mp4")), None);
    }
}
