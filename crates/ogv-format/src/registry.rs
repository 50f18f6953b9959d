//! 字节流处理器注册表.
//!
//! 维护 `(扩展名, MIME 类型) -> 处理器标识` 映射, 以及
//! `处理器标识 -> 工厂函数` 绑定. 宿主管线打开新媒体时查询此表.
//!
//! 注册表在进程启动时创建一次, 以 `Arc` 句柄共享给所有需要查询的组件.
//! 内部用读写锁保护, 可从事件循环线程写入、从管线线程读取.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info};
use ogv_core::{OgvError, OgvResult};

use crate::extension::{HandlerKey, normalize_extension};
use crate::handler::{ByteStreamHandler, HandlerFactory};

/// 注册条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerEntry {
    /// 小写扩展名 (含前导 `.`)
    pub extension: String,
    /// MIME 类型
    pub mime_type: String,
    /// 处理器标识 (如 "OgvSource.OgvByteStreamHandler")
    pub handler_id: String,
}

/// 处理器注册表
pub struct HandlerRegistry {
    /// 扩展名/MIME 映射
    entries: RwLock<HashMap<HandlerKey, HandlerEntry>>,
    /// 处理器工厂映射
    factories: RwLock<HashMap<String, HandlerFactory>>,
}

impl HandlerRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// 注册 (或替换) 一个处理器映射
    ///
    /// 同一 `(扩展名, MIME 类型)` 只保留最后一次注册的处理器.
    /// 以相同参数重复注册不产生任何可观察变化.
    ///
    /// # 错误
    /// - `InvalidArgument`: 扩展名不以 `.` 开头, MIME 类型或处理器标识为空
    pub fn register(
        &self,
        extension: &str,
        mime_type: &str,
        handler_id: impl Into<String>,
    ) -> OgvResult<()> {
        let key = HandlerKey::new(extension, mime_type)?;
        let handler_id = handler_id.into();
        if handler_id.trim().is_empty() {
            return Err(OgvError::InvalidArgument("处理器标识不能为空".into()));
        }

        let entry = HandlerEntry {
            extension: key.extension.clone(),
            mime_type: key.mime_type.clone(),
            handler_id,
        };

        let mut entries = self.write_entries();
        match entries.insert(key, entry.clone()) {
            Some(previous) if previous == entry => {}
            Some(previous) => info!(
                "替换处理器: {} ({}) {} -> {}",
                entry.extension, entry.mime_type, previous.handler_id, entry.handler_id,
            ),
            None => debug!(
                "注册处理器: {} ({}) -> {}",
                entry.extension, entry.mime_type, entry.handler_id,
            ),
        }
        Ok(())
    }

    /// 查找处理器标识
    ///
    /// 扩展名大小写不敏感, MIME 类型精确匹配. 未找到或参数无效时返回 `None`.
    pub fn lookup(&self, extension: &str, mime_type: &str) -> Option<String> {
        let key = HandlerKey::new(extension, mime_type).ok()?;
        self.read_entries()
            .get(&key)
            .map(|entry| entry.handler_id.clone())
    }

    /// 查找某扩展名下的所有条目 (按 MIME 类型排序)
    ///
    /// 用于 MIME 类型未知的场景.
    pub fn lookup_extension(&self, extension: &str) -> Vec<HandlerEntry> {
        let Ok(extension) = normalize_extension(extension) else {
            return Vec::new();
        };
        let mut matched = self
            .read_entries()
            .values()
            .filter(|entry| entry.extension == extension)
            .cloned()
            .collect::<Vec<_>>();
        matched.sort_by(|a, b| a.mime_type.cmp(&b.mime_type));
        matched
    }

    /// 移除一个映射, 不存在时什么也不做
    ///
    /// 返回是否确实移除了条目.
    pub fn unregister(&self, extension: &str, mime_type: &str) -> bool {
        let Ok(key) = HandlerKey::new(extension, mime_type) else {
            return false;
        };
        let removed = self.write_entries().remove(&key);
        if let Some(entry) = &removed {
            debug!(
                "注销处理器: {} ({}) -> {}",
                entry.extension, entry.mime_type, entry.handler_id,
            );
        }
        removed.is_some()
    }

    /// 获取所有条目 (按扩展名、MIME 类型排序)
    pub fn entries(&self) -> Vec<HandlerEntry> {
        let entries = self.read_entries();
        let mut keys = entries.keys().collect::<Vec<_>>();
        keys.sort();
        keys.into_iter().map(|key| entries[key].clone()).collect()
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// 绑定处理器标识与工厂函数
    pub fn bind_factory(&self, handler_id: impl Into<String>, factory: HandlerFactory) {
        let handler_id = handler_id.into();
        debug!("绑定处理器工厂: {}", handler_id);
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handler_id, factory);
    }

    /// 按处理器标识创建处理器实例
    pub fn create_handler(&self, handler_id: &str) -> OgvResult<Box<dyn ByteStreamHandler>> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handler_id)
            .copied()
            .ok_or_else(|| OgvError::NotFound(format!("未找到处理器 {handler_id} 的工厂")))?;
        factory()
    }

    /// 获取所有已绑定工厂的处理器标识
    pub fn list_factories(&self) -> Vec<String> {
        let mut ids = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }

    // 条目映射的每次修改都是单次 insert/remove, 锁中毒时数据仍然一致
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<HandlerKey, HandlerEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<HandlerKey, HandlerEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ResolutionFlags;
    use crate::io::ByteStream;
    use crate::source::MediaSource;

    const OGV_HANDLER: &str = "OgvSource.OgvByteStreamHandler";

    struct NullHandler;

    impl ByteStreamHandler for NullHandler {
        fn name(&self) -> &str {
            "null"
        }

        fn create_object(
            &self,
            _stream: ByteStream,
            _url: &str,
            _flags: ResolutionFlags,
        ) -> OgvResult<Box<dyn MediaSource>> {
            Err(OgvError::Unsupported("null".into()))
        }
    }

    fn create_null() -> OgvResult<Box<dyn ByteStreamHandler>> {
        Ok(Box::new(NullHandler))
    }

    #[test]
    fn test_register_then_lookup() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        assert_eq!(
            registry.lookup(".ogv", "video/ogg").as_deref(),
            Some(OGV_HANDLER)
        );
        assert_eq!(registry.lookup(".mp4", "video/mp4"), None);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        let once = registry.entries();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        assert_eq!(registry.entries(), once);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_last_write_wins() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", "First.Handler").unwrap();
        registry.register(".OGV", "video/ogg", "Second.Handler").unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(".ogv", "video/ogg").as_deref(),
            Some("Second.Handler")
        );
    }

    #[test]
    fn test_lookup_extension_case_insensitive() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        assert_eq!(
            registry.lookup(".OGV", "video/ogg").as_deref(),
            Some(OGV_HANDLER)
        );
        assert_eq!(
            registry.lookup(".Ogv", "video/ogg").as_deref(),
            Some(OGV_HANDLER)
        );
    }

    #[test]
    fn test_lookup_mime_is_exact() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        assert_eq!(registry.lookup(".ogv", "VIDEO/OGG"), None);
        assert_eq!(registry.lookup(".ogv", "audio/ogg"), None);
    }

    #[test]
    fn test_register_rejects_invalid_arguments() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.register("ogv", "video/ogg", OGV_HANDLER),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register(".ogv", "", OGV_HANDLER),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register(".ogv", "video/ogg", ""),
            Err(OgvError::InvalidArgument(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_then_lookup_is_empty() {
        let registry = HandlerRegistry::new();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();
        assert!(registry.unregister(".OGV", "video/ogg"));
        assert_eq!(registry.lookup(".ogv", "video/ogg"), None);
        // 再次注销为空操作
        assert!(!registry.unregister(".ogv", "video/ogg"));
        assert!(!registry.unregister("bad", ""));
    }

    #[test]
    fn test_lookup_extension_lists_all_mime_types() {
        let registry = HandlerRegistry::new();
        registry.register(".ogg", "video/ogg", OGV_HANDLER).unwrap();
        registry.register(".ogg", "audio/ogg", OGV_HANDLER).unwrap();
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();

        let matched = registry.lookup_extension(".OGG");
        let mimes = matched
            .iter()
            .map(|e| e.mime_type.as_str())
            .collect::<Vec<_>>();
        assert_eq!(mimes, vec!["audio/ogg", "video/ogg"]);
        assert!(registry.lookup_extension("ogg").is_empty());
    }

    #[test]
    fn test_create_handler_from_factory() {
        let registry = HandlerRegistry::new();
        assert!(matches!(
            registry.create_handler("Null.Handler"),
            Err(OgvError::NotFound(_))
        ));

        registry.bind_factory("Null.Handler", create_null);
        let handler = registry.create_handler("Null.Handler").unwrap();
        assert_eq!(handler.name(), "null");
        assert_eq!(registry.list_factories(), vec!["Null.Handler".to_string()]);
    }

    #[test]
    fn test_registry_shared_across_threads() {
        let registry = std::sync::Arc::new(HandlerRegistry::new());
        registry.register(".ogv", "video/ogg", OGV_HANDLER).unwrap();

        let reader = std::sync::Arc::clone(&registry);
        let found = std::thread::spawn(move || reader.lookup(".ogv", "video/ogg"))
            .join()
            .unwrap();
        assert_eq!(found.as_deref(), Some(OGV_HANDLER));
    }
}
