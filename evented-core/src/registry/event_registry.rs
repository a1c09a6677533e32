use super::declarations::EventDeclarations;
use crate::any_event::AnyEvent;
use crate::error::{EventError, EventsError, EventsResult, HandlerError};
use crate::name::{EventName, SubscriberName};
use crate::options::EventOptions;
use crate::subscriber::HandlerResult;
use crate::transport::Transport;
use bon::Builder;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 单个宿主实例的事件缓存
///
/// - 事件按 `declarations` 中的声明惰性创建，创建后在注册表生命周期内复用；
/// - `transport` 为后备传输，声明选项未指定传输的外部事件使用它；
/// - 不同宿主即使共享同一份声明，也各自持有独立的事件实例。
#[derive(Builder)]
pub struct EventRegistry {
    #[builder(into)]
    host: String,
    declarations: Arc<EventDeclarations>,
    transport: Option<Arc<dyn Transport>>,
    #[builder(skip)]
    cache: DashMap<EventName, AnyEvent>,
}

impl EventRegistry {
    pub fn new(
        host: impl Into<String>,
        declarations: Arc<EventDeclarations>,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        Self {
            host: host.into(),
            declarations,
            transport,
            cache: DashMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn declarations(&self) -> &Arc<EventDeclarations> {
        &self.declarations
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// 为每个已声明的事件创建（或复用）实例
    pub fn events(&self) -> EventsResult<BTreeMap<EventName, AnyEvent>> {
        let mut events = BTreeMap::new();
        for name in self.declarations.names() {
            let event = self.instantiate(name.as_str())?;
            events.insert(name, event);
        }
        Ok(events)
    }

    /// 声明事件并返回其实例
    pub fn event(&self, name: impl Into<EventName>, options: EventOptions) -> EventsResult<AnyEvent> {
        let name = self.declarations.declare(name, options)?;
        self.instantiate(name.as_str())
    }

    /// 获取已声明事件的实例
    pub fn get(&self, name: &str) -> EventsResult<AnyEvent> {
        self.require_declared(name)?;
        self.instantiate(name)
    }

    /// 订阅已声明的事件
    pub fn on<F>(&self, name: &str, f: F) -> EventsResult<AnyEvent>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        let event = self.get(name)?;
        event.subscribe(f)?;
        Ok(event)
    }

    /// 触发已声明的事件
    pub fn emit(&self, name: &str, args: &[Value]) -> EventsResult<()> {
        self.get(name)?.fire(args)
    }

    /// 订阅事件；事件未声明时以本地事件声明
    pub fn subscribe<F>(&self, name: impl Into<EventName>, f: F) -> EventsResult<AnyEvent>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        let event = self.ensure(name.into())?;
        event.subscribe(f)?;
        Ok(event)
    }

    /// 以指定订阅者名订阅事件；事件未声明时以本地事件声明
    pub fn subscribe_as<F>(
        &self,
        name: impl Into<EventName>,
        subscriber: impl Into<SubscriberName>,
        f: F,
    ) -> EventsResult<AnyEvent>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        let event = self.ensure(name.into())?;
        event.subscribe_as(subscriber, f)?;
        Ok(event)
    }

    /// 注销订阅者；本宿主尚未创建该事件时返回 `HandlerError::NoSuchEvent`
    pub fn unsubscribe(&self, name: &str, subscriber: &str) -> EventsResult<()> {
        let Some(event) = self.cache.get(name).map(|e| e.value().clone()) else {
            return Err(self.no_such_event(name));
        };
        event.unsubscribe(subscriber)?;
        Ok(())
    }

    /// 赋值到事件槽位：只接受当前缓存的同一实例
    pub fn assign(&self, name: &str, event: &AnyEvent) -> EventsResult<()> {
        let current = self.get(name)?;
        if current.ptr_eq(event) {
            Ok(())
        } else {
            Err(EventError::WrongAssignment {
                event: name.to_string(),
            }
            .into())
        }
    }

    /// 已创建的事件实例是否存在
    pub fn is_instantiated(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    fn require_declared(&self, name: &str) -> EventsResult<()> {
        if self.declarations.contains(name) {
            Ok(())
        } else {
            Err(self.no_such_event(name))
        }
    }

    fn no_such_event(&self, name: &str) -> EventsError {
        HandlerError::NoSuchEvent {
            host: self.host.clone(),
            event: name.to_string(),
        }
        .into()
    }

    fn ensure(&self, name: EventName) -> EventsResult<AnyEvent> {
        if !self.declarations.contains(name.as_str()) {
            self.declarations.declare(name.clone(), EventOptions::local())?;
        }
        self.instantiate(name.as_str())
    }

    fn instantiate(&self, name: &str) -> EventsResult<AnyEvent> {
        if let Some(event) = self.cache.get(name) {
            return Ok(event.value().clone());
        }

        let options = self
            .declarations
            .options(name)
            .ok_or_else(|| self.no_such_event(name))?;

        match self.cache.entry(EventName::from(name)) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                let event = AnyEvent::create(&self.host, name, &options, self.transport.as_ref())?;
                debug!(
                    host = %self.host,
                    event = %name,
                    external = event.is_external(),
                    "event instantiated"
                );
                Ok(slot.insert(event).value().clone())
            }
        }
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut instantiated: Vec<EventName> =
            self.cache.iter().map(|e| e.key().clone()).collect();
        instantiated.sort_unstable();
        f.debug_struct("EventRegistry")
            .field("host", &self.host)
            .field("host_type", &self.declarations.type_name())
            .field("instantiated", &instantiated)
            .field(
                "transport",
                &self.transport.as_ref().map(|t| t.transport_name().to_string()),
            )
            .finish()
    }
}
