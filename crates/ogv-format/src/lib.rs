//! # ogv-format
//!
//! 字节流处理器注册表与 Ogg/Theora 媒体源.
//!
//! 宿主媒体管线按 `(扩展名, MIME 类型)` 查询 [`HandlerRegistry`] 得到处理器标识,
//! 由注册表中绑定的工厂创建 [`ByteStreamHandler`], 再把字节流交给处理器
//! 解析为 [`MediaSource`].

pub mod activation;
pub mod extension;
pub mod handler;
pub mod handlers;
pub mod io;
pub mod probe;
pub mod registry;
pub mod source;

// 重导出常用类型
pub use activation::MediaExtensions;
pub use extension::{HandlerKey, extension_from_uri};
pub use handler::{ByteStreamHandler, HandlerFactory, ResolutionFlags};
pub use io::{ByteStream, ByteStreamCaps};
pub use probe::{ContainerFormat, ProbeResult, Prober};
pub use registry::{HandlerEntry, HandlerRegistry};
pub use source::{MediaSource, SourceEvent, SourceState, StreamDescriptor, StreamParams};
