//! 应用配置.
//!
//! JSON 格式, 所有字段均有默认值, 缺省的字段按默认值补齐:
//!
//! ```json
//! {
//!   "logging": { "level": "info", "directory": "logs" },
//!   "media": {
//!     "media_root": ".",
//!     "native_extensions": [".mp4", ".m4v", ".wav", ".mp3"],
//!     "bindings": [{ "control": "play-ogv", "uri": "/media/sharks.ogv" }],
//!     "extra_handlers": []
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ogv_format::HandlerRegistry;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::logging::LoggingConfig;

/// 控件与播放 URI 的绑定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlaybackBinding {
    /// 控件标识
    pub control: String,
    /// 点击后播放的 URI
    pub uri: String,
}

impl PlaybackBinding {
    pub fn new(control: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            control: control.into(),
            uri: uri.into(),
        }
    }
}

/// 额外注册的处理器映射
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HandlerRegistration {
    pub extension: String,
    pub mime_type: String,
    pub handler_id: String,
}

/// 媒体相关配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MediaConfig {
    /// 以 `/` 开头的 URI 相对于此目录解析
    pub media_root: PathBuf,
    /// 宿主管线原生支持的扩展名
    pub native_extensions: Vec<String>,
    /// 播放控件绑定
    pub bindings: Vec<PlaybackBinding>,
    /// 启动后追加注册的处理器映射
    pub extra_handlers: Vec<HandlerRegistration>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("."),
            native_extensions: crate::pipeline::DEFAULT_NATIVE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            bindings: vec![
                PlaybackBinding::new("play-mp4", "/media/sharks.mp4"),
                PlaybackBinding::new("play-ogv", "/media/sharks.ogv"),
            ],
            extra_handlers: Vec::new(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    /// 加载配置, 未指定路径时返回默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("配置文件无效, path={}", path.display()))
    }

    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("解析配置 JSON 失败")
    }

    /// 把 `extra_handlers` 写入注册表
    pub fn apply_registrations(&self, registry: &HandlerRegistry) -> Result<()> {
        for item in &self.media.extra_handlers {
            registry
                .register(&item.extension, &item.mime_type, item.handler_id.as_str())
                .with_context(|| {
                    format!(
                        "注册处理器失败: {} ({}) -> {}",
                        item.extension, item.mime_type, item.handler_id
                    )
                })?;
            info!(
                "配置注册处理器: {} ({}) -> {}",
                item.extension, item.mime_type, item.handler_id
            );
        }
        Ok(())
    }
}
