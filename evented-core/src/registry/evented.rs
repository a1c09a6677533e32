use super::event_registry::EventRegistry;
use crate::any_event::AnyEvent;
use crate::error::EventsResult;
use crate::name::{EventName, SubscriberName};
use crate::options::EventOptions;
use crate::subscriber::HandlerResult;
use serde_json::Value;
use std::collections::BTreeMap;

/// 事件宿主
///
/// 宿主只需暴露自己的注册表，其余方法均转发给注册表。
pub trait Evented {
    fn registry(&self) -> &EventRegistry;

    fn events(&self) -> EventsResult<BTreeMap<EventName, AnyEvent>> {
        self.registry().events()
    }

    fn event(&self, name: impl Into<EventName>, options: EventOptions) -> EventsResult<AnyEvent>
    where
        Self: Sized,
    {
        self.registry().event(name, options)
    }

    fn get(&self, name: &str) -> EventsResult<AnyEvent> {
        self.registry().get(name)
    }

    fn on<F>(&self, name: &str, f: F) -> EventsResult<AnyEvent>
    where
        Self: Sized,
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry().on(name, f)
    }

    fn emit(&self, name: &str, args: &[Value]) -> EventsResult<()> {
        self.registry().emit(name, args)
    }

    fn subscribe<F>(&self, name: impl Into<EventName>, f: F) -> EventsResult<AnyEvent>
    where
        Self: Sized,
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry().subscribe(name, f)
    }

    fn subscribe_as<F>(
        &self,
        name: impl Into<EventName>,
        subscriber: impl Into<SubscriberName>,
        f: F,
    ) -> EventsResult<AnyEvent>
    where
        Self: Sized,
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.registry().subscribe_as(name, subscriber, f)
    }

    fn unsubscribe(&self, name: &str, subscriber: &str) -> EventsResult<()> {
        self.registry().unsubscribe(name, subscriber)
    }
}
