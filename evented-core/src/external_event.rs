//! 外部事件（ExternalEvent）
//!
//! 发生在本进程之外、经由 `Transport` 送达的事件。本地订阅语义与 `Event` 完全一致，
//! 额外维护传输订阅的生命周期：
//!
//! ```text
//! 无订阅者 --subscribe (0→1)-->    有订阅者  [transport.subscribe]
//! 有订阅者 --subscribe (n→n+1)-->  有订阅者  [不触碰传输]
//! 有订阅者 --unsubscribe (n→n-1>0)--> 有订阅者 [不触碰传输]
//! 有订阅者 --unsubscribe (1→0)-->  无订阅者  [transport.unsubscribe]
//! ```
//!
//! 创建时不订阅传输，只有出现第一个本地订阅者时才占用中间件资源。
//! 传输调用失败时回滚本地变更，保证“传输订阅存在 ⇔ 订阅者非空”。
//! 退订时传输已不再持有该订阅（如传输已关闭）视为订阅已关闭。
//!
use crate::error::{EventError, EventsResult, TransportError, TransportResult};
use crate::event::Event;
use crate::name::{EventName, SubscriberName};
use crate::options::EventOptions;
use crate::subscriber::{FnSubscriber, HandlerResult, Subscriber};
use crate::transport::{SubscriptionId, Transport, TransportCallback};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// 外部事件
pub struct ExternalEvent {
    event: Arc<Event>,
    routing: String,
    transport: Arc<dyn Transport>,
    // 当前持有的传输订阅；锁同时串行化 0↔1 转换及对应的传输调用
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ExternalEvent {
    /// 创建外部事件
    ///
    /// `options` 未携带传输时使用 `fallback`（通常是宿主的传输）；
    /// 解析后仍缺少路由键或传输时返回 `EventError`。
    pub fn new(
        host: impl Into<String>,
        name: impl Into<EventName>,
        options: &EventOptions,
        fallback: Option<&Arc<dyn Transport>>,
    ) -> EventsResult<Self> {
        let name = name.into();

        let routing = match options.routing() {
            Some(routing) if !routing.trim().is_empty() => routing.to_string(),
            _ => {
                return Err(EventError::MissingRouting {
                    event: name.to_string(),
                }
                .into());
            }
        };

        let Some(transport) = options.transport().or(fallback).cloned() else {
            return Err(EventError::MissingTransport {
                event: name.to_string(),
            }
            .into());
        };

        Ok(Self {
            event: Arc::new(Event::new(host, name)),
            routing,
            transport,
            subscription: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &EventName {
        self.event.name()
    }

    pub fn host(&self) -> &str {
        self.event.host()
    }

    pub fn routing(&self) -> &str {
        &self.routing
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// 是否持有传输订阅
    pub fn is_open(&self) -> bool {
        self.lock_subscription().is_some()
    }

    /// 以生成的名称登记闭包订阅者
    pub fn subscribe<F>(&self, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.attach(None, Arc::new(FnSubscriber(f)))?;
        Ok(self)
    }

    /// 以指定名称登记闭包订阅者
    pub fn subscribe_as<F>(&self, name: impl Into<SubscriberName>, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.attach(Some(name.into()), Arc::new(FnSubscriber(f)))?;
        Ok(self)
    }

    /// 登记处理器对象
    pub fn subscribe_handler<S>(&self, handler: S, name: Option<SubscriberName>) -> EventsResult<&Self>
    where
        S: Subscriber + 'static,
    {
        self.attach(name, Arc::new(handler))?;
        Ok(self)
    }

    /// `subscribe` 的别名
    pub fn listen<F>(&self, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(f)
    }

    /// 按名称移除订阅者；移除最后一个时取消传输订阅
    pub fn unsubscribe(&self, name: &str) -> EventsResult<&Self> {
        let mut subscription = self.lock_subscription();
        let (entry, remaining) = self.event.remove(name)?;

        if remaining == 0 {
            if let Err(err) = self.close(&mut subscription) {
                self.event.restore(0, entry);
                return Err(err.into());
            }
        }
        Ok(self)
    }

    /// `unsubscribe` 的别名
    pub fn remove_subscriber(&self, name: &str) -> EventsResult<&Self> {
        self.unsubscribe(name)
    }

    /// 按登记顺序同步调用全部订阅者
    pub fn fire(&self, args: &[Value]) -> EventsResult<()> {
        self.event.fire(args)
    }

    /// 清空订阅者；若确有订阅者被移除则同时取消传输订阅
    pub fn clear(&self) -> EventsResult<()> {
        let mut subscription = self.lock_subscription();
        let removed = self.event.take_all();
        if removed.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.close(&mut subscription) {
            for (index, entry) in removed.into_iter().enumerate() {
                self.event.restore(index, entry);
            }
            return Err(err.into());
        }
        debug!(event = %self.name(), routing = %self.routing, "external event cleared");
        Ok(())
    }

    pub fn subscriber_names(&self) -> Vec<SubscriberName> {
        self.event.subscriber_names()
    }

    pub fn subscriber_count(&self) -> usize {
        self.event.subscriber_count()
    }

    pub fn is_empty(&self) -> bool {
        self.event.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.event.contains(name)
    }

    fn attach(&self, name: Option<SubscriberName>, subscriber: Arc<dyn Subscriber>) -> EventsResult<()> {
        let mut subscription = self.lock_subscription();
        let (name, count) = self.event.insert(name, subscriber)?;

        if count == 1 {
            match self.transport.subscribe(&self.routing, self.delivery_callback()) {
                Ok(id) => {
                    *subscription = Some(id);
                    debug!(event = %self.name(), routing = %self.routing, subscription = %id, "external event opened transport subscription");
                }
                Err(err) => {
                    // 持锁期间刚插入的订阅者必然存在
                    if let Err(rollback) = self.event.remove(name.as_str()) {
                        warn!(event = %self.name(), subscriber = %name, error = %rollback, "failed to roll back subscriber");
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// 关闭传输订阅；传输返回 `NotSubscribed` 时订阅已不存在，同样视为关闭
    fn close(&self, subscription: &mut Option<SubscriptionId>) -> TransportResult<()> {
        let Some(id) = *subscription else {
            return Ok(());
        };

        match self.transport.unsubscribe(&self.routing, id) {
            Ok(()) => {
                debug!(event = %self.name(), routing = %self.routing, subscription = %id, "external event closed transport subscription");
            }
            Err(TransportError::NotSubscribed { .. }) => {
                debug!(event = %self.name(), routing = %self.routing, subscription = %id, "transport subscription already gone");
            }
            Err(err) => return Err(err),
        }
        *subscription = None;
        Ok(())
    }

    /// 传输回调：以 `(routing, payload)` 触发本事件
    fn delivery_callback(&self) -> TransportCallback {
        let event = Arc::downgrade(&self.event);
        Arc::new(move |routing: &str, payload: &Value| -> EventsResult<()> {
            match event.upgrade() {
                Some(event) => event.fire(&[Value::String(routing.to_string()), payload.clone()]),
                None => Ok(()),
            }
        })
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<SubscriptionId>> {
        self.subscription.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ExternalEvent {
    fn drop(&mut self) {
        let mut subscription = self
            .subscription
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Err(err) = self.close(&mut subscription) {
            warn!(event = %self.name(), routing = %self.routing, error = %err, "failed to close transport subscription on drop");
        }
    }
}

impl PartialEq for ExternalEvent {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl PartialEq<Option<&ExternalEvent>> for ExternalEvent {
    fn eq(&self, other: &Option<&ExternalEvent>) -> bool {
        match other {
            None => self.is_empty(),
            Some(other) => std::ptr::eq(self, *other),
        }
    }
}

impl fmt::Debug for ExternalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalEvent")
            .field("host", &self.host())
            .field("name", self.name())
            .field("routing", &self.routing)
            .field("transport", &self.transport.transport_name())
            .field("subscribers", &self.subscriber_names())
            .finish()
    }
}
