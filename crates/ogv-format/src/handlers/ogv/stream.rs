//! Ogg 逻辑流识别与流对象.
//!
//! 每个 BOS 页面的第一个 packet 是该逻辑流的识别头, 由它确定编解码器:
//! - Theora: `0x80 "theora"` (视频)
//! - Vorbis: `0x01 "vorbis"` (音频)
//! - Opus:   `"OpusHead"` (音频)

use std::fmt;

use log::debug;
use ogv_core::{MediaType, Rational};

use crate::source::{StreamDescriptor, StreamParams};

/// Ogg 逻辑流的编解码器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OggCodec {
    /// Theora 视频
    Theora,
    /// Vorbis 音频
    Vorbis,
    /// Opus 音频
    Opus,
    /// 无法识别
    Unknown,
}

impl OggCodec {
    /// 从识别头 packet 判断编解码器
    pub fn identify(packet: &[u8]) -> Self {
        if packet.len() >= 7 && packet[0] == 0x80 && &packet[1..7] == b"theora" {
            return Self::Theora;
        }
        if packet.len() >= 7 && packet[0] == 0x01 && &packet[1..7] == b"vorbis" {
            return Self::Vorbis;
        }
        if packet.len() >= 8 && &packet[0..8] == b"OpusHead" {
            return Self::Opus;
        }
        Self::Unknown
    }

    /// 编解码器短名
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Theora => "theora",
            Self::Vorbis => "vorbis",
            Self::Opus => "opus",
            Self::Unknown => "unknown",
        }
    }

    /// 媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Theora => MediaType::Video,
            Self::Vorbis | Self::Opus => MediaType::Audio,
            Self::Unknown => MediaType::Data,
        }
    }
}

impl fmt::Display for OggCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 读取 24 位大端整数
fn read_u24_be(data: &[u8]) -> u32 {
    (u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2])
}

/// 读取 32 位大端整数
fn read_u32_be(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// 解析 Theora identification header
///
/// 返回 (图像宽, 图像高, 帧率, 像素宽高比).
fn parse_theora_header(data: &[u8]) -> Option<(u32, u32, Rational, Rational)> {
    // 0x80 "theora" (7) + VMAJ/VMIN/VREV (3) + FMBW/FMBH (4) + PICW/PICH (6)
    // + PICX/PICY (2) + FRN/FRD (8) + PARN/PARD (6) + ... 共 42 字节
    if data.len() < 42 || OggCodec::identify(data) != OggCodec::Theora {
        return None;
    }
    let width = read_u24_be(&data[14..17]);
    let height = read_u24_be(&data[17..20]);
    let frame_rate = Rational::new(read_u32_be(&data[22..26]), read_u32_be(&data[26..30]));
    let pixel_aspect = Rational::new(read_u24_be(&data[30..33]), read_u24_be(&data[33..36]));
    Some((width, height, frame_rate, pixel_aspect))
}

/// 解析 Vorbis identification header, 返回 (采样率, 声道数)
fn parse_vorbis_header(data: &[u8]) -> Option<(u32, u32)> {
    // packet type (1) + "vorbis" (6) + version (4) + channels (1) + sample_rate (4)
    if data.len() < 16 || OggCodec::identify(data) != OggCodec::Vorbis {
        return None;
    }
    let channels = u32::from(data[11]);
    let sample_rate = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    Some((sample_rate, channels))
}

/// 解析 Opus header, 返回 (采样率, 声道数)
fn parse_opus_header(data: &[u8]) -> Option<(u32, u32)> {
    // "OpusHead" (8) + version (1) + channels (1) + pre_skip (2) + sample_rate (4)
    if data.len() < 16 || OggCodec::identify(data) != OggCodec::Opus {
        return None;
    }
    let channels = u32::from(data[9]);
    let sample_rate = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    Some((sample_rate, channels))
}

/// 根据识别头构造流参数, 头部被截断时退回默认值
fn build_params(codec: OggCodec, packet: &[u8]) -> StreamParams {
    match codec {
        OggCodec::Theora => {
            let (width, height, frame_rate, pixel_aspect) = parse_theora_header(packet)
                .unwrap_or((0, 0, Rational::UNDEFINED, Rational::new(1, 1)));
            StreamParams::Video {
                width,
                height,
                frame_rate,
                pixel_aspect,
            }
        }
        OggCodec::Vorbis => {
            let (sample_rate, channels) = parse_vorbis_header(packet).unwrap_or((44100, 2));
            StreamParams::Audio {
                sample_rate,
                channels,
            }
        }
        OggCodec::Opus => {
            let (sample_rate, channels) = parse_opus_header(packet).unwrap_or((48000, 2));
            StreamParams::Audio {
                sample_rate,
                channels,
            }
        }
        OggCodec::Unknown => StreamParams::Other,
    }
}

/// 流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Stopped,
    Started,
    Paused,
    Shutdown,
}

/// Ogg 媒体源中的单个流
pub struct OgvStream {
    /// 流描述
    descriptor: StreamDescriptor,
    /// 编解码器
    codec: OggCodec,
    /// 当前状态
    state: StreamState,
    /// 播放速率
    rate: f32,
}

impl OgvStream {
    /// 从 BOS 页面的识别头创建流
    ///
    /// 无法识别的逻辑流保留为未选中的数据流.
    pub fn from_header(index: usize, serial_number: u32, packet: &[u8]) -> Self {
        let codec = OggCodec::identify(packet);
        let descriptor = StreamDescriptor {
            index,
            id: serial_number,
            media_type: codec.media_type(),
            codec: codec.name(),
            selected: codec != OggCodec::Unknown,
            params: build_params(codec, packet),
        };
        debug!(
            "Ogg: 发现流 #{}: {} ({}), serial=0x{:08X}",
            index,
            codec,
            codec.media_type(),
            serial_number,
        );
        Self {
            descriptor,
            codec,
            state: StreamState::Stopped,
            rate: 1.0,
        }
    }

    /// 流描述
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// 编解码器
    pub fn codec(&self) -> OggCodec {
        self.codec
    }

    /// 逻辑流序列号
    pub fn serial_number(&self) -> u32 {
        self.descriptor.id
    }

    /// 当前状态
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// 是否参与播放 (已选中且未关闭)
    pub fn is_active(&self) -> bool {
        self.descriptor.selected && self.state != StreamState::Shutdown
    }

    /// 当前播放速率
    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub(crate) fn start(&mut self) {
        self.state = StreamState::Started;
    }

    pub(crate) fn pause(&mut self) {
        self.state = StreamState::Paused;
    }

    pub(crate) fn stop(&mut self) {
        self.state = StreamState::Stopped;
    }

    pub(crate) fn shutdown(&mut self) {
        self.state = StreamState::Shutdown;
    }

    pub(crate) fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }
}
