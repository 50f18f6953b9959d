//! 字节流处理器实现模块.

pub mod ogv;

use crate::registry::HandlerRegistry;

/// 绑定所有内置处理器的工厂函数
///
/// 只建立 `处理器标识 -> 工厂` 绑定, 不注册任何扩展名映射.
pub fn register_all_handlers(registry: &HandlerRegistry) {
    registry.bind_factory(ogv::HANDLER_ID, ogv::OgvByteStreamHandler::create);
}
