//! # ogv
//!
//! 为宿主媒体管线扩展 Ogg/Theora (`.ogv`) 播放支持.
//!
//! - **处理器注册表**: `(扩展名, MIME 类型) -> 处理器标识`
//! - **启动钩子**: 进程启动时注册一次 `.ogv` 处理器
//! - **宿主管线**: `set_source` + `load`, 按注册表选择字节流处理器
//! - **播放触发器**: 把控件点击转为播放请求
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ogv::format::MediaExtensions;
//! use ogv::pipeline::MediaPipeline;
//!
//! let registry = ogv::default_handler_registry();
//! MediaExtensions::new(Arc::clone(&registry)).ensure_initialized()?;
//!
//! let mut pipeline = MediaPipeline::new(registry, "assets");
//! pipeline.set_source("/media/sharks.ogv");
//! let outcome = pipeline.load()?;
//! println!("{outcome:?}");
//! # Ok::<(), ogv::core::OgvError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `ogv-core` | 错误类型与基础类型 |
//! | `ogv-format` | 注册表、字节流、Ogg 媒体源 |

use std::sync::Arc;

/// 错误类型与基础类型
pub use ogv_core as core;

/// 处理器注册表与 Ogg 媒体源
pub use ogv_format as format;

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod trigger;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已绑定所有内置处理器工厂的注册表
///
/// 只绑定工厂, 扩展名映射仍由启动钩子或配置写入.
pub fn default_handler_registry() -> Arc<ogv_format::HandlerRegistry> {
    let registry = ogv_format::HandlerRegistry::new();
    ogv_format::handlers::register_all_handlers(&registry);
    Arc::new(registry)
}
