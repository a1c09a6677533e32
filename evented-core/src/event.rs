//! 事件（Event）
//!
//! 具名、按插入顺序保存的订阅者表 + 同步扇出触发：
//! - `subscribe*`：登记订阅者，名称在事件内唯一，重名返回 `HandlerError`；
//! - `unsubscribe`：按名称移除订阅者，未知名称返回 `HandlerError`；
//! - `fire`：按登记顺序依次调用全部订阅者，任一订阅者失败即中断并返回错误；
//! - `clear`：清空订阅者，事件本身保留。
//!
//! 订阅者表由读写锁保护，锁只在修改或取快照时持有。`fire` 使用进入时的快照，
//! 因此在触发过程中（包括订阅者内部重入）发生的订阅/退订从下一次触发开始生效。
//!
use crate::error::{EventsError, EventsResult, HandlerError};
use crate::name::{EventName, SubscriberName};
use crate::subscriber::{FnSubscriber, HandlerResult, Subscriber};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::trace;

#[derive(Clone)]
pub(crate) struct SubscriberEntry {
    pub(crate) name: SubscriberName,
    pub(crate) subscriber: Arc<dyn Subscriber>,
}

/// 本地事件
pub struct Event {
    host: String,
    name: EventName,
    subscribers: RwLock<Vec<SubscriberEntry>>,
}

impl Event {
    /// 创建事件；`host` 仅作标识用途（日志与错误信息），不参与控制
    pub fn new(host: impl Into<String>, name: impl Into<EventName>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &EventName {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// 以生成的名称登记闭包订阅者
    pub fn subscribe<F>(&self, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(FnSubscriber(f)))?;
        Ok(self)
    }

    /// 以指定名称登记闭包订阅者
    pub fn subscribe_as<F>(&self, name: impl Into<SubscriberName>, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(Some(name.into()), Arc::new(FnSubscriber(f)))?;
        Ok(self)
    }

    /// 登记处理器对象；未给出名称时以 `subscriber_name()` 为前缀生成
    pub fn subscribe_handler<S>(&self, handler: S, name: Option<SubscriberName>) -> EventsResult<&Self>
    where
        S: Subscriber + 'static,
    {
        self.insert(name, Arc::new(handler))?;
        Ok(self)
    }

    /// `subscribe` 的别名
    pub fn listen<F>(&self, f: F) -> EventsResult<&Self>
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(f)
    }

    /// 按名称移除订阅者
    pub fn unsubscribe(&self, name: &str) -> EventsResult<&Self> {
        self.remove(name)?;
        Ok(self)
    }

    /// `unsubscribe` 的别名
    pub fn remove_subscriber(&self, name: &str) -> EventsResult<&Self> {
        self.unsubscribe(name)
    }

    /// 按登记顺序同步调用全部订阅者
    pub fn fire(&self, args: &[Value]) -> EventsResult<()> {
        let snapshot = self.read().clone();
        trace!(host = %self.host, event = %self.name, subscribers = snapshot.len(), "firing event");

        for entry in snapshot {
            entry
                .subscriber
                .handle(args)
                .map_err(|source| EventsError::SubscriberFailed {
                    event: self.name.to_string(),
                    subscriber: entry.name.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// 清空全部订阅者
    pub fn clear(&self) {
        self.take_all();
    }

    pub fn subscriber_names(&self) -> Vec<SubscriberName> {
        self.read().iter().map(|e| e.name.clone()).collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|e| e.name == name)
    }

    /// 登记订阅者，返回最终名称与登记后的订阅者数量；重名时不做任何修改
    pub(crate) fn insert(
        &self,
        name: Option<SubscriberName>,
        subscriber: Arc<dyn Subscriber>,
    ) -> EventsResult<(SubscriberName, usize)> {
        let name = name.unwrap_or_else(|| SubscriberName::generate(subscriber.subscriber_name()));
        let mut subscribers = self.write();

        if subscribers.iter().any(|e| e.name == name) {
            return Err(HandlerError::DuplicateSubscriber {
                event: self.name.to_string(),
                subscriber: name.to_string(),
            }
            .into());
        }

        subscribers.push(SubscriberEntry {
            name: name.clone(),
            subscriber,
        });
        Ok((name, subscribers.len()))
    }

    /// 移除订阅者，返回被移除的条目与剩余数量
    pub(crate) fn remove(&self, name: &str) -> EventsResult<(SubscriberEntry, usize)> {
        let mut subscribers = self.write();

        let Some(index) = subscribers.iter().position(|e| e.name == name) else {
            return Err(HandlerError::UnknownSubscriber {
                event: self.name.to_string(),
                subscriber: name.to_string(),
            }
            .into());
        };

        let removed = subscribers.remove(index);
        Ok((removed, subscribers.len()))
    }

    /// 将条目放回原位置（用于传输层失败时回滚）
    pub(crate) fn restore(&self, index: usize, entry: SubscriberEntry) {
        let mut subscribers = self.write();
        let index = index.min(subscribers.len());
        subscribers.insert(index, entry);
    }

    /// 清空并返回被移除的条目
    pub(crate) fn take_all(&self) -> Vec<SubscriberEntry> {
        std::mem::take(&mut *self.write())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<SubscriberEntry>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<SubscriberEntry>> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 事件之间只按同一实例判等
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// 与“无值”比较：没有订阅者的事件等于 `None`；`Some` 按同一实例判等
impl PartialEq<Option<&Event>> for Event {
    fn eq(&self, other: &Option<&Event>) -> bool {
        match other {
            None => self.is_empty(),
            Some(other) => std::ptr::eq(self, *other),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_names())
            .finish()
    }
}
