//! Ogg/Theora 媒体源.
//!
//! 打开时读取文件开头连续的 BOS 页面, 每个 BOS 页面对应一个逻辑流.
//! 状态转换在调用时同步完成, 成功后向事件队列追加对应事件.

use std::collections::VecDeque;
use std::io::SeekFrom;

use log::{debug, info, warn};
use ogv_core::{OgvError, OgvResult};

use super::page::read_page;
use super::stream::OgvStream;
use super::{ID3V2_HEADER_SIZE, id3v2_tag_size};
use crate::io::ByteStream;
use crate::source::{MediaSource, SourceEvent, SourceState, StreamDescriptor};

/// 单个媒体源最多支持的流数量
pub const MAX_STREAMS: usize = 32;

/// Ogg/Theora 媒体源
pub struct OgvSource {
    /// 当前状态
    state: SourceState,
    /// 字节流 (关闭后释放)
    stream: Option<ByteStream>,
    /// 流列表
    streams: Vec<OgvStream>,
    /// 流描述缓存 (与 streams 一一对应)
    descriptors: Vec<StreamDescriptor>,
    /// 待取出的事件
    events: VecDeque<SourceEvent>,
    /// 播放速率
    rate: f32,
    /// 头部之后第一个数据页的偏移
    data_offset: u64,
}

impl OgvSource {
    /// 创建处于 `Invalid` 状态的媒体源
    pub fn new() -> Self {
        Self {
            state: SourceState::Invalid,
            stream: None,
            streams: Vec::new(),
            descriptors: Vec::new(),
            events: VecDeque::new(),
            rate: 1.0,
            data_offset: 0,
        }
    }

    /// 打开字节流并解析所有逻辑流的识别头
    ///
    /// # 错误
    /// - `InvalidState`: 已经打开过
    /// - `Unsupported`: 字节流不可读
    /// - `InvalidData`: 没有 BOS 页面, 或流数量超过 [`MAX_STREAMS`]
    pub fn open(&mut self, mut stream: ByteStream) -> OgvResult<()> {
        self.check_shutdown()?;
        if self.state != SourceState::Invalid {
            return Err(OgvError::InvalidState(format!(
                "媒体源已打开, 当前状态: {}",
                self.state
            )));
        }
        if !stream.is_readable() {
            return Err(OgvError::Unsupported("字节流不可读".into()));
        }

        self.state = SourceState::Opening;
        match self.read_headers(&mut stream) {
            Ok(()) => {
                self.stream = Some(stream);
                self.state = SourceState::Stopped;
                self.events.push_back(SourceEvent::Opened);
                info!(
                    "Ogg 媒体源已打开: {} 个流, 数据起始于 {} 字节",
                    self.streams.len(),
                    self.data_offset,
                );
                Ok(())
            }
            Err(err) => {
                self.streams.clear();
                self.descriptors.clear();
                self.state = SourceState::Invalid;
                Err(err)
            }
        }
    }

    /// 读取连续的 BOS 页面
    fn read_headers(&mut self, stream: &mut ByteStream) -> OgvResult<()> {
        skip_id3v2(stream)?;
        loop {
            let position = stream.position()?;
            let page = match read_page(stream) {
                Ok(page) => page,
                // 只有 BOS 页面的文件同样有效
                Err(OgvError::Eof) if !self.streams.is_empty() => {
                    self.data_offset = position;
                    break;
                }
                Err(OgvError::Eof) => {
                    return Err(OgvError::InvalidData("Ogg 文件中没有 BOS 页面".into()));
                }
                Err(err) => return Err(err),
            };

            if !page.is_bos() {
                if self.streams.is_empty() {
                    return Err(OgvError::InvalidData("Ogg 文件中没有 BOS 页面".into()));
                }
                self.data_offset = position;
                break;
            }

            if self.streams.iter().any(|s| s.serial_number() == page.serial_number) {
                warn!(
                    "Ogg: 重复的 BOS 序列号 0x{:08X}, 忽略",
                    page.serial_number
                );
                continue;
            }
            if self.streams.len() >= MAX_STREAMS {
                return Err(OgvError::InvalidData(format!(
                    "Ogg 逻辑流数量超过上限 {MAX_STREAMS}"
                )));
            }

            let stream_entry =
                OgvStream::from_header(self.streams.len(), page.serial_number, page.first_packet());
            self.descriptors.push(stream_entry.descriptor().clone());
            self.streams.push(stream_entry);
        }

        if self.streams.iter().all(|s| !s.is_active()) {
            warn!("Ogg: 没有可识别的音视频流");
        }
        Ok(())
    }

    /// 数据页起始偏移
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// 字节流总长度 (未打开或已关闭时为 `None`)
    pub fn byte_length(&self) -> Option<u64> {
        self.stream.as_ref().and_then(ByteStream::size)
    }

    /// 所有流对象
    pub fn ogv_streams(&self) -> &[OgvStream] {
        &self.streams
    }

    fn check_shutdown(&self) -> OgvResult<()> {
        if self.state == SourceState::Shutdown {
            return Err(OgvError::Shutdown);
        }
        Ok(())
    }

    fn check_opened(&self) -> OgvResult<()> {
        self.check_shutdown()?;
        if matches!(self.state, SourceState::Invalid | SourceState::Opening) {
            return Err(OgvError::InvalidState(format!(
                "媒体源尚未打开, 当前状态: {}",
                self.state
            )));
        }
        Ok(())
    }

    fn require_started(&self, operation: &str) -> OgvResult<()> {
        self.check_opened()?;
        if self.state != SourceState::Started {
            return Err(OgvError::InvalidState(format!(
                "{operation} 需要处于 started 状态, 当前状态: {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl Default for OgvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSource for OgvSource {
    fn state(&self) -> SourceState {
        self.state
    }

    fn streams(&self) -> &[StreamDescriptor] {
        &self.descriptors
    }

    fn start(&mut self, position: Option<f64>) -> OgvResult<()> {
        self.check_opened()?;
        if let Some(position) = position {
            if !position.is_finite() || position < 0.0 {
                return Err(OgvError::InvalidArgument(format!(
                    "无效的起始位置: {position}"
                )));
            }
        }
        for stream in self.streams.iter_mut().filter(|s| s.is_active()) {
            stream.start();
        }
        debug!("Ogg 媒体源: {} -> started, position={:?}", self.state, position);
        self.state = SourceState::Started;
        self.events.push_back(SourceEvent::Started { position });
        Ok(())
    }

    fn pause(&mut self) -> OgvResult<()> {
        self.require_started("pause")?;
        for stream in self.streams.iter_mut().filter(|s| s.is_active()) {
            stream.pause();
        }
        self.state = SourceState::Paused;
        self.events.push_back(SourceEvent::Paused);
        Ok(())
    }

    fn stop(&mut self) -> OgvResult<()> {
        self.require_started("stop")?;
        for stream in self.streams.iter_mut().filter(|s| s.is_active()) {
            stream.stop();
        }
        self.state = SourceState::Stopped;
        self.events.push_back(SourceEvent::Stopped);
        Ok(())
    }

    fn shutdown(&mut self) -> OgvResult<()> {
        self.check_shutdown()?;
        for stream in &mut self.streams {
            stream.shutdown();
        }
        self.stream = None;
        self.state = SourceState::Shutdown;
        self.events.clear();
        self.events.push_back(SourceEvent::Shutdown);
        debug!("Ogg 媒体源已关闭");
        Ok(())
    }

    fn set_rate(&mut self, thin: bool, rate: f32) -> OgvResult<()> {
        if thin {
            return Err(OgvError::Unsupported("不支持丢帧播放".into()));
        }
        if !rate.is_finite() || rate < 0.0 {
            return Err(OgvError::Unsupported(format!("不支持的播放速率: {rate}")));
        }
        self.check_shutdown()?;
        if rate == self.rate {
            return Ok(());
        }
        self.require_started("set_rate")?;
        for stream in &mut self.streams {
            stream.set_rate(rate);
        }
        self.rate = rate;
        self.events.push_back(SourceEvent::RateChanged(rate));
        Ok(())
    }

    fn rate(&self) -> f32 {
        self.rate
    }

    fn next_event(&mut self) -> Option<SourceEvent> {
        self.events.pop_front()
    }
}

/// 跳过文件开头的 ID3v2 标签
///
/// 不可随机访问的字节流无法回退预读的数据, 此时不做检查.
fn skip_id3v2(stream: &mut ByteStream) -> OgvResult<()> {
    if !stream.is_seekable() {
        return Ok(());
    }
    let start = stream.position()?;
    let head = stream.read_up_to(ID3V2_HEADER_SIZE)?;
    let offset = match id3v2_tag_size(&head) {
        Some(tag_size) => {
            debug!("Ogg: 跳过 {} 字节的 ID3v2 标签", tag_size);
            start + tag_size as u64
        }
        None => start,
    };
    stream.seek(SeekFrom::Start(offset))?;
    Ok(())
}
