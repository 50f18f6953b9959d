//! 启动钩子.
//!
//! 应用可能从多条激活路径进入 (冷启动、从挂起恢复), 每条路径都会调用
//! [`MediaExtensions::ensure_initialized`]. 钩子保证在其生命周期内只注册一次
//! `.ogv` 处理器, 重复调用既不会重复注册也不会报错.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use ogv_core::OgvResult;

use crate::handlers::{self, ogv};
use crate::registry::HandlerRegistry;

/// 启动时注册的扩展名
pub const OGV_EXTENSION: &str = ".ogv";
/// 启动时注册的 MIME 类型
pub const OGV_MIME_TYPE: &str = "video/ogg";
/// 启动时注册的处理器标识
pub const OGV_HANDLER_ID: &str = ogv::HANDLER_ID;

/// 媒体扩展启动钩子
pub struct MediaExtensions {
    /// 共享的处理器注册表
    registry: Arc<HandlerRegistry>,
    /// 是否已完成注册 (仅在注册成功后置位)
    initialized: Mutex<bool>,
}

impl MediaExtensions {
    /// 创建钩子, 此时不做任何注册
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            initialized: Mutex::new(false),
        }
    }

    /// 共享的处理器注册表
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// 是否已完成注册
    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 确保 `.ogv` 处理器已注册
    ///
    /// 返回 `true` 表示本次调用执行了注册, `false` 表示此前已注册.
    pub fn ensure_initialized(&self) -> OgvResult<bool> {
        let mut initialized = self
            .initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *initialized {
            debug!("媒体扩展已初始化, 跳过");
            return Ok(false);
        }

        handlers::register_all_handlers(&self.registry);
        self.registry
            .register(OGV_EXTENSION, OGV_MIME_TYPE, OGV_HANDLER_ID)?;
        *initialized = true;

        info!(
            "已注册字节流处理器 {} ({} / {})",
            OGV_HANDLER_ID, OGV_EXTENSION, OGV_MIME_TYPE
        );
        Ok(true)
    }
}
