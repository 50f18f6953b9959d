//! 宿主媒体管线.
//!
//! 播放器通过 `set_source` 指定 URI, 再调用 `load` 加载:
//! 1. 扩展名属于原生格式时由宿主直接播放
//! 2. 否则按 `(扩展名, 默认 MIME)` 查询注册表, 再退回到仅按扩展名查询
//! 3. 仍未找到时读取文件头部探测容器格式, 用格式的规范扩展名/MIME 再查一次
//! 4. 找到处理器后创建实例, 由 `create_object` 打开媒体源
//!
//! 设置新的 URI 会关闭当前媒体源, 这是唯一的取消方式.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ogv_core::{OgvError, OgvResult};
use ogv_format::probe::{PROBE_SIZE, mime_for_extension};
use ogv_format::{
    ByteStream, HandlerRegistry, MediaSource, Prober, ResolutionFlags, StreamDescriptor,
    extension_from_uri,
};
use tracing::{debug, info, warn};

/// 宿主原生支持的扩展名
pub const DEFAULT_NATIVE_EXTENSIONS: &[&str] = &[".mp4", ".m4v", ".wav", ".mp3"];

/// 管线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 未设置 URI
    Idle,
    /// 已设置 URI, 尚未加载
    SourceSet,
    /// 加载成功
    Loaded,
    /// 最近一次加载失败
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::SourceSet => "source-set",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// `load` 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// 宿主原生播放
    Native { uri: String, extension: String },
    /// 由字节流处理器创建媒体源
    Handler {
        uri: String,
        handler_id: String,
        streams: Vec<StreamDescriptor>,
    },
}

impl LoadOutcome {
    /// 加载的 URI
    pub fn uri(&self) -> &str {
        match self {
            Self::Native { uri, .. } | Self::Handler { uri, .. } => uri,
        }
    }

    /// 处理器标识, 原生播放时为 `None`
    pub fn handler_id(&self) -> Option<&str> {
        match self {
            Self::Native { .. } => None,
            Self::Handler { handler_id, .. } => Some(handler_id),
        }
    }
}

/// 宿主媒体管线
pub struct MediaPipeline {
    registry: Arc<HandlerRegistry>,
    media_root: PathBuf,
    native_extensions: Vec<String>,
    prober: Prober,
    source: Option<String>,
    media_source: Option<Box<dyn MediaSource>>,
    state: PipelineState,
}

impl MediaPipeline {
    /// 创建管线
    ///
    /// # 参数
    /// - `registry`: 共享的处理器注册表
    /// - `media_root`: 以 `/` 开头的 URI 相对于此目录解析
    pub fn new(registry: Arc<HandlerRegistry>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            media_root: media_root.into(),
            native_extensions: DEFAULT_NATIVE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            prober: Prober::with_builtin(),
            source: None,
            media_source: None,
            state: PipelineState::Idle,
        }
    }

    /// 替换原生支持的扩展名列表
    pub fn with_native_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.native_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().to_lowercase())
            .collect();
        self
    }

    /// 设置要播放的 URI, 关闭当前媒体源
    pub fn set_source(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        self.release_media_source();
        debug!("管线设置 URI: {}", uri);
        self.source = Some(uri);
        self.state = PipelineState::SourceSet;
    }

    /// 当前 URI
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// 管线状态
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 当前媒体源 (仅处理器路径加载成功后存在)
    pub fn media_source(&self) -> Option<&dyn MediaSource> {
        self.media_source.as_deref()
    }

    /// 当前媒体源的可变引用
    pub fn media_source_mut(&mut self) -> Option<&mut (dyn MediaSource + 'static)> {
        self.media_source.as_deref_mut()
    }

    /// 媒体根目录
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// 把 URI 解析为本地路径
    ///
    /// 查询串与片段被丢弃; 以 `/` 开头的 URI 相对于媒体根目录.
    pub fn resolve_path(&self, uri: &str) -> PathBuf {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        match path.strip_prefix('/') {
            Some(relative) => self.media_root.join(relative),
            None => PathBuf::from(path),
        }
    }

    /// 加载当前 URI
    ///
    /// # 错误
    /// - `InvalidState`: 未设置 URI
    /// - `NotFound`: 没有可处理该 URI 的处理器
    /// - 其他: 打开文件或创建媒体源失败
    pub fn load(&mut self) -> OgvResult<LoadOutcome> {
        let uri = self
            .source
            .clone()
            .ok_or_else(|| OgvError::InvalidState("管线未设置 URI".into()))?;
        self.release_media_source();

        match self.load_uri(&uri) {
            Ok(outcome) => {
                self.state = PipelineState::Loaded;
                Ok(outcome)
            }
            Err(err) => {
                warn!("加载 {} 失败: {}", uri, err);
                self.state = PipelineState::Failed;
                Err(err)
            }
        }
    }

    fn load_uri(&mut self, uri: &str) -> OgvResult<LoadOutcome> {
        let extension = extension_from_uri(uri);

        if let Some(ext) = extension.as_ref().filter(|ext| self.is_native(ext)) {
            info!("原生播放: {}", uri);
            return Ok(LoadOutcome::Native {
                uri: uri.to_string(),
                extension: ext.clone(),
            });
        }

        let path = self.resolve_path(uri);
        let mut stream = ByteStream::open_read(&path)?;

        // 按内容选出的处理器不要求内容与扩展名/MIME 一致
        let (handler_id, flags) =
            match extension.as_deref().and_then(|ext| self.lookup_by_extension(ext)) {
                Some(id) => (id, ResolutionFlags::MEDIA_SOURCE),
                None => (
                    self.lookup_by_content(&mut stream, uri)?,
                    ResolutionFlags::MEDIA_SOURCE
                        | ResolutionFlags::CONTENT_DOES_NOT_HAVE_TO_MATCH_EXTENSION_OR_MIME_TYPE,
                ),
            };

        let handler = self.registry.create_handler(&handler_id)?;
        let source = handler.create_object(stream, uri, flags)?;
        let streams = source.streams().to_vec();
        info!(
            "{} 由 {} 打开, {} 个流",
            uri,
            handler_id,
            streams.len()
        );
        self.media_source = Some(source);

        Ok(LoadOutcome::Handler {
            uri: uri.to_string(),
            handler_id,
            streams,
        })
    }

    fn is_native(&self, extension: &str) -> bool {
        self.native_extensions.iter().any(|native| native == extension)
    }

    fn lookup_by_extension(&self, extension: &str) -> Option<String> {
        let exact = mime_for_extension(extension)
            .and_then(|mime_type| self.registry.lookup(extension, mime_type));
        if exact.is_some() {
            return exact;
        }
        self.registry
            .lookup_extension(extension)
            .into_iter()
            .next()
            .map(|entry| entry.handler_id)
    }

    /// 探测文件头部, 用格式的规范扩展名与 MIME 类型查询
    fn lookup_by_content(&self, stream: &mut ByteStream, uri: &str) -> OgvResult<String> {
        let head = stream.read_up_to(PROBE_SIZE)?;
        stream.seek(SeekFrom::Start(0))?;

        let result = self.prober.probe(&head, Some(uri)).ok_or_else(|| {
            OgvError::NotFound(format!("无法识别 {uri} 的格式"))
        })?;
        debug!(
            "探测 {}: {} (置信度: {})",
            uri, result.format, result.score
        );

        self.registry
            .lookup(result.format.canonical_extension(), result.format.mime_type())
            .ok_or_else(|| {
                OgvError::NotFound(format!(
                    "没有处理器可以播放 {uri} (格式: {})",
                    result.format
                ))
            })
    }

    fn release_media_source(&mut self) {
        if let Some(mut source) = self.media_source.take() {
            match source.shutdown() {
                Ok(()) | Err(OgvError::Shutdown) => {}
                Err(err) => warn!("关闭媒体源失败: {}", err),
            }
        }
    }
}

impl Drop for MediaPipeline {
    fn drop(&mut self) {
        self.release_media_source();
    }
}
