//! 格式探测.
//!
//! 当 URI 没有可用扩展名, 或扩展名未注册时, 宿主管线读取文件头部数据,
//! 通过探测器识别容器格式, 再以该格式的规范扩展名和 MIME 类型查询注册表.

use std::fmt;

use crate::extension::extension_from_uri;

/// 探测置信度
///
/// 数值越高, 表示对格式判断越有信心.
pub type ProbeScore = u32;

/// 最低探测分数 (仅根据扩展名)
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 中等探测分数 (特征 box/标签匹配)
pub const SCORE_MIME: ProbeScore = 75;

/// 最高探测分数 (魔数完全匹配)
pub const SCORE_MAX: ProbeScore = 100;

/// 探测时读取的头部字节数
pub const PROBE_SIZE: usize = 4096;

/// 容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerFormat {
    /// Ogg (Theora/Vorbis/Opus)
    Ogg,
    /// MPEG-4 Part 14
    Mp4,
    /// WebM
    Webm,
    /// WAV (RIFF WAVE)
    Wav,
    /// MP3 裸流
    Mp3,
}

impl ContainerFormat {
    /// 所有已知格式
    pub const ALL: &[ContainerFormat] = &[Self::Ogg, Self::Mp4, Self::Webm, Self::Wav, Self::Mp3];

    /// 格式短名
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ogg => "ogg",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    /// 常用扩展名 (含 `.`), 第一个为规范扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Ogg => &[".ogv", ".ogg", ".oga", ".ogx", ".opus", ".spx"],
            Self::Mp4 => &[".mp4", ".m4v", ".m4a", ".mov"],
            Self::Webm => &[".webm"],
            Self::Wav => &[".wav"],
            Self::Mp3 => &[".mp3"],
        }
    }

    /// 规范 MIME 类型
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Ogg => "video/ogg",
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// 规范扩展名
    pub fn canonical_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// 根据扩展名 (含 `.`, 大小写不敏感) 猜测格式
    pub fn from_extension(extension: &str) -> Option<ContainerFormat> {
        let lower = extension.to_lowercase();
        Self::ALL
            .iter()
            .find(|format| format.extensions().contains(&lower.as_str()))
            .copied()
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 扩展名对应的默认 MIME 类型
///
/// 音频专用扩展名返回音频 MIME, 其余沿用容器的规范 MIME.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        ".oga" | ".opus" | ".spx" => Some("audio/ogg"),
        ".ogx" => Some("application/ogg"),
        ".m4a" => Some("audio/mp4"),
        ".mov" => Some("video/quicktime"),
        other => ContainerFormat::from_extension(other).map(|format| format.mime_type()),
    }
}

/// 探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// 识别出的格式
    pub format: ContainerFormat,
    /// 置信度分数
    pub score: ProbeScore,
}

/// 格式探测器 trait
pub trait FormatProbe: Send + Sync {
    /// 根据文件头部数据探测格式
    ///
    /// # 参数
    /// - `data`: 文件开头的若干字节
    /// - `filename`: 文件名或 URI (可选, 用于扩展名匹配)
    ///
    /// # 返回
    /// - `Some(score)`: 探测成功, 返回置信度
    /// - `None`: 不是此格式
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore>;

    /// 此探测器对应的格式
    fn format(&self) -> ContainerFormat;
}

/// 按扩展名匹配格式, 供各探测器复用
pub(crate) fn probe_extension(
    filename: Option<&str>,
    format: ContainerFormat,
) -> Option<ProbeScore> {
    let extension = extension_from_uri(filename?)?;
    format
        .extensions()
        .contains(&extension.as_str())
        .then_some(SCORE_EXTENSION)
}

/// MP4 探测器
pub struct Mp4Probe;

impl FormatProbe for Mp4Probe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 8 && &data[4..8] == b"ftyp" {
            return Some(SCORE_MAX);
        }
        if data.len() >= 8 && matches!(&data[4..8], b"moov" | b"mdat" | b"free" | b"wide") {
            return Some(SCORE_MIME);
        }
        probe_extension(filename, ContainerFormat::Mp4)
    }

    fn format(&self) -> ContainerFormat {
        ContainerFormat::Mp4
    }
}

/// 探测器集合
pub struct Prober {
    probes: Vec<Box<dyn FormatProbe>>,
}

impl Prober {
    /// 创建空的探测器集合
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// 创建包含所有内置探测器的集合
    pub fn with_builtin() -> Self {
        let mut prober = Self::new();
        prober.register(Box::new(crate::handlers::ogv::OggProbe));
        prober.register(Box::new(Mp4Probe));
        prober
    }

    /// 注册一个探测器
    pub fn register(&mut self, probe: Box<dyn FormatProbe>) {
        self.probes.push(probe);
    }

    /// 探测数据的容器格式
    ///
    /// 遍历所有探测器, 返回置信度最高的结果. 分数相同时保留先注册的探测器.
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                let is_better = best.as_ref().is_none_or(|b| score > b.score);
                if is_better {
                    best = Some(ProbeResult {
                        format: probe.format(),
                        score,
                    });
                }
            }
        }
        best
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::with_builtin()
    }
}
