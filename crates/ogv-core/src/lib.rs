//! # ogv-core
//!
//! ogv 核心库, 提供统一错误类型和媒体基础类型.
//!
//! 注册表、媒体源与宿主管线共用本 crate 中的定义.

pub mod error;
pub mod media_type;
pub mod rational;

// 重导出常用类型
pub use error::{OgvError, OgvResult};
pub use media_type::MediaType;
pub use rational::Rational;
