//! 媒体源 (MediaSource) trait 定义.
//!
//! 字节流处理器解析容器后产出媒体源, 宿主管线通过它控制播放状态.
//!
//! 状态机:
//! ```text
//! Invalid --open--> Opening --头部解析完成--> Stopped
//! Stopped/Paused/Started --start--> Started
//! Started --pause--> Paused
//! Started --stop--> Stopped
//! 任意状态 --shutdown--> Shutdown (终态)
//! ```

use std::fmt;

use ogv_core::{MediaType, OgvResult, Rational};

/// 媒体源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// 初始状态, 尚未开始打开
    Invalid,
    /// 正在解析头部
    Opening,
    /// 已停止 (打开完成后的初始可播放状态)
    Stopped,
    /// 已暂停
    Paused,
    /// 正在播放
    Started,
    /// 已关闭
    Shutdown,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Opening => "opening",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Started => "started",
            Self::Shutdown => "shutdown",
        };
        write!(f, "{name}")
    }
}

/// 媒体源事件, 按发生顺序排队
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// 头部解析完成
    Opened,
    /// 开始播放, 附带起始位置 (秒)
    Started { position: Option<f64> },
    /// 已暂停
    Paused,
    /// 已停止
    Stopped,
    /// 播放速率已变更
    RateChanged(f32),
    /// 已关闭
    Shutdown,
}

/// 流描述
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// 流索引 (按发现顺序)
    pub index: usize,
    /// 容器内的逻辑流标识 (Ogg 序列号)
    pub id: u32,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器短名
    pub codec: &'static str,
    /// 是否默认选中
    pub selected: bool,
    /// 编码参数
    pub params: StreamParams,
}

/// 流参数
#[derive(Debug, Clone, PartialEq)]
pub enum StreamParams {
    /// 视频参数
    Video {
        width: u32,
        height: u32,
        frame_rate: Rational,
        pixel_aspect: Rational,
    },
    /// 音频参数
    Audio { sample_rate: u32, channels: u32 },
    /// 无参数
    Other,
}

/// 媒体源 trait
///
/// 使用流程:
/// 1. 由字节流处理器创建并打开
/// 2. 调用 `streams()` 获取流信息
/// 3. 调用 `start()` / `pause()` / `stop()` 控制状态
/// 4. 调用 `shutdown()` 释放资源
pub trait MediaSource: Send {
    /// 当前状态
    fn state(&self) -> SourceState;

    /// 所有流描述
    fn streams(&self) -> &[StreamDescriptor];

    /// 开始播放
    ///
    /// # 参数
    /// - `position`: 起始位置 (秒), `None` 表示从当前位置继续
    fn start(&mut self, position: Option<f64>) -> OgvResult<()>;

    /// 暂停 (仅在 `Started` 状态下允许)
    fn pause(&mut self) -> OgvResult<()>;

    /// 停止 (仅在 `Started` 状态下允许)
    fn stop(&mut self) -> OgvResult<()>;

    /// 关闭媒体源, 之后的所有操作都返回 `Shutdown` 错误
    fn shutdown(&mut self) -> OgvResult<()>;

    /// 设置播放速率
    ///
    /// # 参数
    /// - `thin`: 是否允许丢帧 (thinning)
    /// - `rate`: 播放速率, 1.0 为正常速度
    fn set_rate(&mut self, thin: bool, rate: f32) -> OgvResult<()>;

    /// 当前播放速率
    fn rate(&self) -> f32;

    /// 取出下一个排队的事件
    fn next_event(&mut self) -> Option<SourceEvent>;
}
