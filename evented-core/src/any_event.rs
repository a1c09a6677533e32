//! 事件句柄（AnyEvent）
//!
//! 注册表缓存的统一句柄：本地事件或外部事件。由 `AnyEvent::create` 按选项选择具体类型，
//! 所有操作按变体分派，外部事件的传输生命周期因此对调用方透明。
//!
use crate::error::EventsResult;
use crate::event::Event;
use crate::external_event::ExternalEvent;
use crate::name::{EventName, SubscriberName};
use crate::options::EventOptions;
use crate::subscriber::{HandlerResult, Subscriber};
use crate::transport::Transport;
use serde_json::Value;
use std::sync::Arc;

/// 本地事件或外部事件
#[derive(Clone, Debug)]
pub enum AnyEvent {
    Local(Arc<Event>),
    External(Arc<ExternalEvent>),
}

macro_rules! dispatch {
    ($self:ident, $event:ident => $body:expr) => {
        match $self {
            AnyEvent::Local($event) => $body,
            AnyEvent::External($event) => $body,
        }
    };
}

impl AnyEvent {
    /// 按选项创建：带 routing/transport 的创建外部事件，否则创建本地事件
    pub fn create(
        host: &str,
        name: impl Into<EventName>,
        options: &EventOptions,
        fallback: Option<&Arc<dyn Transport>>,
    ) -> EventsResult<Self> {
        if options.is_external() {
            let event = ExternalEvent::new(host, name, options, fallback)?;
            Ok(AnyEvent::External(Arc::new(event)))
        } else {
            Ok(AnyEvent::Local(Arc::new(Event::new(host, name))))
        }
    }

    pub fn name(&self) -> &EventName {
        dispatch!(self, e => e.name())
    }

    pub fn host(&self) -> &str {
        dispatch!(self, e => e.host())
    }

    pub fn is_external(&self) -> bool {
        matches!(self, AnyEvent::External(_))
    }

    /// 外部事件的路由键
    pub fn routing(&self) -> Option<&str> {
        self.as_external().map(|e| e.routing())
    }

    pub fn as_local(&self) -> Option<&Arc<Event>> {
        match self {
            AnyEvent::Local(e) => Some(e),
            AnyEvent::External(_) => None,
        }
    }

    pub fn as_external(&self) -> Option<&Arc<ExternalEvent>> {
        match self {
            AnyEvent::Local(_) => None,
            AnyEvent::External(e) => Some(e),
        }
    }

    pub fn subscribe<F>(&self, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        dispatch!(self, e => e.subscribe(f).map(|_| ()))?;
        Ok(self)
    }

    pub fn subscribe_as<F>(&self, name: impl Into<SubscriberName>, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        dispatch!(self, e => e.subscribe_as(name, f).map(|_| ()))?;
        Ok(self)
    }

    pub fn subscribe_handler<S>(&self, handler: S, name: Option<SubscriberName>) -> EventsResult<&Self>
    where
        S: Subscriber + 'static,
    {
        dispatch!(self, e => e.subscribe_handler(handler, name).map(|_| ()))?;
        Ok(self)
    }

    pub fn unsubscribe(&self, name: &str) -> EventsResult<&Self> {
        dispatch!(self, e => e.unsubscribe(name).map(|_| ()))?;
        Ok(self)
    }

    pub fn fire(&self, args: &[Value]) -> EventsResult<()> {
        dispatch!(self, e => e.fire(args))
    }

    pub fn clear(&self) -> EventsResult<()> {
        match self {
            AnyEvent::Local(e) => {
                e.clear();
                Ok(())
            }
            AnyEvent::External(e) => e.clear(),
        }
    }

    pub fn subscriber_names(&self) -> Vec<SubscriberName> {
        dispatch!(self, e => e.subscriber_names())
    }

    pub fn subscriber_count(&self) -> usize {
        dispatch!(self, e => e.subscriber_count())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, e => e.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        dispatch!(self, e => e.contains(name))
    }

    /// 是否为同一个事件实例
    pub fn ptr_eq(&self, other: &AnyEvent) -> bool {
        match (self, other) {
            (AnyEvent::Local(a), AnyEvent::Local(b)) => Arc::ptr_eq(a, b),
            (AnyEvent::External(a), AnyEvent::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
