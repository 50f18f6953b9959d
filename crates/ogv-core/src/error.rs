//! 统一错误类型定义.
//!
//! 所有 ogv crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// ogv 统一错误类型
#[derive(Debug, Error)]
pub enum OgvError {
    /// 无效参数 (如扩展名缺少 `.` 前缀, MIME 类型为空)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 未找到处理器或资源
    #[error("未找到: {0}")]
    NotFound(String),

    /// 不支持的操作或字节流类型
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 无效数据 (损坏的页面等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 当前状态下不允许的状态转换
    #[error("无效状态转换: {0}")]
    InvalidState(String),

    /// 对象已关闭
    #[error("对象已关闭")]
    Shutdown,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

/// ogv 统一 Result 类型
pub type OgvResult<T> = Result<T, OgvError>;
