//! 播放触发器.
//!
//! 控件面板 ([`ControlPanel`]) 把点击事件分发给订阅者. [`PlaybackTrigger`]
//! 按控件标识查找绑定的 URI, 通过通道发出 [`PlaybackRequest`], 事件循环
//! 取出请求后调用 [`dispatch`] 替换管线的当前 URI 并加载.
//!
//! 每个绑定互相独立, 点击同一控件多次会产生多个请求.

use std::sync::mpsc::Sender;

use ogv_core::OgvResult;
use tracing::{debug, warn};

use crate::config::PlaybackBinding;
use crate::pipeline::{LoadOutcome, MediaPipeline};

/// 控件点击事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    /// 控件标识
    pub control: String,
}

impl ClickEvent {
    pub fn new(control: impl Into<String>) -> Self {
        Self {
            control: control.into(),
        }
    }
}

/// 播放请求, 每次点击产生一个, 取出后立即消费
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub uri: String,
}

/// 事件处理器
pub trait EventHandler<E>: Send {
    fn handle(&mut self, event: &E);
}

impl<E, F> EventHandler<E> for F
where
    F: FnMut(&E) + Send,
{
    fn handle(&mut self, event: &E) {
        self(event)
    }
}

/// 订阅标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 事件源, 按订阅顺序分发事件
pub struct EventSource<E> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Box<dyn EventHandler<E>>)>,
}

impl<E> EventSource<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    /// 订阅事件
    pub fn subscribe(&mut self, handler: impl EventHandler<E> + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// 取消订阅, 返回是否存在该订阅
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    /// 分发事件, 返回收到事件的订阅者数量
    pub fn emit(&mut self, event: &E) -> usize {
        for (_, handler) in &mut self.handlers {
            handler.handle(event);
        }
        self.handlers.len()
    }

    /// 订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl<E> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// 控件面板
pub type ControlPanel = EventSource<ClickEvent>;

impl EventSource<ClickEvent> {
    /// 模拟一次控件点击
    pub fn click(&mut self, control: &str) -> usize {
        debug!("点击控件: {}", control);
        self.emit(&ClickEvent::new(control))
    }
}

/// 播放触发器: 控件标识 -> URI
pub struct PlaybackTrigger {
    bindings: Vec<PlaybackBinding>,
    sender: Sender<PlaybackRequest>,
}

impl PlaybackTrigger {
    /// 创建没有绑定的触发器
    pub fn new(sender: Sender<PlaybackRequest>) -> Self {
        Self {
            bindings: Vec::new(),
            sender,
        }
    }

    /// 按配置创建触发器
    pub fn from_bindings(bindings: &[PlaybackBinding], sender: Sender<PlaybackRequest>) -> Self {
        let mut trigger = Self::new(sender);
        for binding in bindings {
            trigger.bind(binding.control.as_str(), binding.uri.as_str());
        }
        trigger
    }

    /// 绑定控件, 已存在的绑定被替换
    pub fn bind(&mut self, control: impl Into<String>, uri: impl Into<String>) {
        let binding = PlaybackBinding::new(control, uri);
        match self.bindings.iter_mut().find(|b| b.control == binding.control) {
            Some(existing) => existing.uri = binding.uri,
            None => self.bindings.push(binding),
        }
    }

    /// 控件绑定的 URI
    pub fn uri_for(&self, control: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.control == control)
            .map(|b| b.uri.as_str())
    }

    pub fn bindings(&self) -> &[PlaybackBinding] {
        &self.bindings
    }
}

impl EventHandler<ClickEvent> for PlaybackTrigger {
    fn handle(&mut self, event: &ClickEvent) {
        let Some(uri) = self.uri_for(&event.control) else {
            debug!("控件 {} 没有绑定播放 URI", event.control);
            return;
        };
        let request = PlaybackRequest {
            uri: uri.to_string(),
        };
        if self.sender.send(request).is_err() {
            warn!("播放请求通道已关闭, 丢弃 {} 的请求", event.control);
        }
    }
}

/// 消费一个播放请求: 替换管线 URI 并加载
pub fn dispatch(pipeline: &mut MediaPipeline, request: &PlaybackRequest) -> OgvResult<LoadOutcome> {
    pipeline.set_source(request.uri.as_str());
    pipeline.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    fn default_bindings() -> Vec<PlaybackBinding> {
        vec![
            PlaybackBinding::new("play-mp4", "/media/sharks.mp4"),
            PlaybackBinding::new("play-ogv", "/media/sharks.ogv"),
        ]
    }

    #[test]
    fn test_click_sends_bound_uri() {
        let (tx, rx) = mpsc::channel();
        let mut panel = ControlPanel::new();
        panel.subscribe(PlaybackTrigger::from_bindings(&default_bindings(), tx));

        assert_eq!(panel.click("play-ogv"), 1);
        assert_eq!(panel.click("play-mp4"), 1);
        let uris = rx.try_iter().map(|r| r.uri).collect::<Vec<_>>();
        assert_eq!(uris, ["/media/sharks.ogv", "/media/sharks.mp4"]);
    }

    #[test]
    fn test_unbound_control_is_ignored() {
        let (tx, rx) = mpsc::channel();
        let mut panel = ControlPanel::new();
        panel.subscribe(PlaybackTrigger::from_bindings(&default_bindings(), tx));
        panel.click("volume-up");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_repeated_clicks_produce_separate_requests() {
        let (tx, rx) = mpsc::channel();
        let mut trigger = PlaybackTrigger::from_bindings(&default_bindings(), tx);
        trigger.handle(&ClickEvent::new("play-ogv"));
        trigger.handle(&ClickEvent::new("play-ogv"));
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_bind_replaces_existing() {
        let (tx, _rx) = mpsc::channel();
        let mut trigger = PlaybackTrigger::from_bindings(&default_bindings(), tx);
        trigger.bind("play-ogv", "/media/reef.ogv");
        assert_eq!(trigger.uri_for("play-ogv"), Some("/media/reef.ogv"));
        assert_eq!(trigger.uri_for("play-mp4"), Some("/media/sharks.mp4"));
        assert_eq!(trigger.bindings().len(), 2);
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut trigger = PlaybackTrigger::from_bindings(&default_bindings(), tx);
        trigger.handle(&ClickEvent::new("play-mp4"));
    }

    #[test]
    fn test_closure_subscribers_and_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut panel = ControlPanel::new();
        let recorder = Arc::clone(&seen);
        let id = panel.subscribe(move |event: &ClickEvent| {
            recorder.lock().unwrap().push(event.control.clone());
        });

        panel.click("play-mp4");
        assert!(panel.unsubscribe(id));
        assert!(!panel.unsubscribe(id));
        assert_eq!(panel.click("play-ogv"), 0);
        assert_eq!(*seen.lock().unwrap(), ["play-mp4"]);
    }

    #[test]
    fn test_dispatch_native_request() {
        let registry = crate::default_handler_registry();
        let mut pipeline = MediaPipeline::new(registry, ".");
        let outcome = dispatch(
            &mut pipeline,
            &PlaybackRequest {
                uri: "/media/sharks.mp4".into(),
            },
        )
        .unwrap();
        assert_eq!(outcome.uri(), "/media/sharks.mp4");
        assert_eq!(pipeline.source(), Some("/media/sharks.mp4"));
    }
}
