//! 字节流处理器 (ByteStreamHandler) trait 定义.
//!
//! 宿主管线遇到自身不支持的扩展名/MIME 类型时, 通过注册表找到处理器标识,
//! 实例化对应的处理器, 再由处理器把字节流解析为 [`MediaSource`].

use bitflags::bitflags;
use ogv_core::OgvResult;

use crate::io::ByteStream;
use crate::source::MediaSource;

bitflags! {
    /// 解析请求标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResolutionFlags: u32 {
        /// 请求创建媒体源
        const MEDIA_SOURCE = 1 << 0;
        /// 请求创建字节流
        const BYTE_STREAM = 1 << 1;
        /// 内容不必与扩展名/MIME 类型一致
        const CONTENT_DOES_NOT_HAVE_TO_MATCH_EXTENSION_OR_MIME_TYPE = 1 << 4;
    }
}

/// 处理器工厂函数类型
pub type HandlerFactory = fn() -> OgvResult<Box<dyn ByteStreamHandler>>;

/// 字节流处理器 trait
pub trait ByteStreamHandler: Send {
    /// 处理器名称
    fn name(&self) -> &str;

    /// 接收宿主传入的配置
    ///
    /// 默认实现忽略所有配置项.
    fn set_properties(&mut self, _properties: &[(String, String)]) -> OgvResult<()> {
        Ok(())
    }

    /// 从字节流创建媒体源
    ///
    /// # 参数
    /// - `stream`: 已打开的字节流, 必须可读
    /// - `url`: 字节流对应的 URI (仅用于日志)
    /// - `flags`: 必须包含 [`ResolutionFlags::MEDIA_SOURCE`]
    fn create_object(
        &self,
        stream: ByteStream,
        url: &str,
        flags: ResolutionFlags,
    ) -> OgvResult<Box<dyn MediaSource>>;
}
