//! 内存版传输（InMemoryTransport）
//!
//! 同步回环实现，满足 `Transport` 协议：
//! - `subscribe/unsubscribe`：同一路由键可有多个订阅，按订阅顺序投递，并记录调用次数；
//! - `publish`：记录消息，并立即同步投递给该路由键上的全部订阅；
//! - `deliver`：模拟中间件投递，返回订阅回调的结果，便于测试断言。
//!
//! 注意：`publish` 不把投递失败返回给发布方（与真实中间件一致），仅记录告警。

use super::{SubscriptionId, Transport, TransportCallback, validate_routing};
use crate::error::{EventsResult, TransportError, TransportResult};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// 内存回环传输
#[derive(Default)]
pub struct InMemoryTransport {
    subscriptions: DashMap<String, Vec<(SubscriptionId, TransportCallback)>>,
    published: Mutex<Vec<(String, Value)>>,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟一条来自中间件的消息，投递给该路由键上的全部订阅
    ///
    /// 路由键未被订阅时返回 `Ok(false)`；某个订阅失败不影响其余订阅，返回第一个错误。
    pub fn deliver(&self, routing: &str, payload: Value) -> EventsResult<bool> {
        // 先克隆回调并释放分片锁，回调内部可能再次订阅/退订
        let callbacks: Vec<TransportCallback> = self
            .subscriptions
            .get(routing)
            .map(|subs| subs.iter().map(|(_, callback)| callback.clone()).collect())
            .unwrap_or_default();
        if callbacks.is_empty() {
            return Ok(false);
        }

        let mut first_error = None;
        for callback in callbacks {
            if let Err(err) = callback(routing, &payload) {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(routing, error = %err, "in-memory delivery failed");
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    pub fn is_subscribed(&self, routing: &str) -> bool {
        self.subscriptions.contains_key(routing)
    }

    /// 路由键上的订阅数量
    pub fn subscription_count(&self, routing: &str) -> usize {
        self.subscriptions.get(routing).map_or(0, |subs| subs.len())
    }

    /// 当前已订阅的路由键（已排序）
    pub fn subscribed_routings(&self) -> Vec<String> {
        let mut routings: Vec<String> = self.subscriptions.iter().map(|e| e.key().clone()).collect();
        routings.sort_unstable();
        routings
    }

    /// 已发布消息（按发布顺序）
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

impl Transport for InMemoryTransport {
    fn subscribe(&self, routing: &str, callback: TransportCallback) -> TransportResult<SubscriptionId> {
        let routing = validate_routing(routing)?;
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        let id = SubscriptionId::new();
        self.subscriptions
            .entry(routing.to_string())
            .or_default()
            .push((id, callback));
        debug!(routing, subscription = %id, "in-memory transport subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, routing: &str, subscription: SubscriptionId) -> TransportResult<()> {
        let routing = validate_routing(routing)?;
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);

        let removed = {
            let Some(mut subs) = self.subscriptions.get_mut(routing) else {
                return Err(TransportError::NotSubscribed {
                    routing: routing.to_string(),
                    subscription: subscription.to_string(),
                });
            };
            let before = subs.len();
            subs.retain(|(id, _)| *id != subscription);
            before != subs.len()
        };
        // 最后一个订阅移除后释放路由键
        self.subscriptions.remove_if(routing, |_, subs| subs.is_empty());

        if !removed {
            return Err(TransportError::NotSubscribed {
                routing: routing.to_string(),
                subscription: subscription.to_string(),
            });
        }
        debug!(routing, subscription = %subscription, "in-memory transport unsubscribed");
        Ok(())
    }

    fn publish(&self, routing: &str, payload: Value) -> TransportResult<()> {
        let routing = validate_routing(routing)?;
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((routing.to_string(), payload.clone()));

        if let Err(err) = self.deliver(routing, payload) {
            warn!(routing, error = %err, "in-memory delivery failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use crate::error::EventsError;
    use serde_json::json;
    use std::sync::Arc;

    fn counting_callback(counter: Arc<AtomicUsize>) -> TransportCallback {
        Arc::new(move |_routing: &str, _payload: &Value| -> EventsResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn subscribe_then_deliver_reaches_callback() {
        let transport = InMemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));
        transport
            .subscribe("orders", counting_callback(counter.clone()))
            .unwrap();

        assert!(transport.deliver("orders", json!({"id": 1})).unwrap());
        assert!(!transport.deliver("other", json!(null)).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(transport.subscribe_calls(), 1);
    }

    #[test]
    fn routing_is_shared_until_the_last_subscription_leaves() {
        let transport = InMemoryTransport::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let a = transport
            .subscribe("orders", counting_callback(first.clone()))
            .unwrap();
        let b = transport
            .subscribe("orders", counting_callback(second.clone()))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(transport.subscription_count("orders"), 2);

        transport.deliver("orders", json!(1)).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        transport.unsubscribe("orders", a).unwrap();
        assert!(transport.is_subscribed("orders"));
        transport.deliver("orders", json!(2)).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);

        transport.unsubscribe("orders", b).unwrap();
        assert!(!transport.is_subscribed("orders"));
    }

    #[test]
    fn rejects_unknown_subscription_and_empty_routing() {
        let transport = InMemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = transport
            .subscribe("orders", counting_callback(counter))
            .unwrap();

        assert!(matches!(
            transport.unsubscribe("missing", id),
            Err(TransportError::NotSubscribed { .. })
        ));
        assert!(matches!(
            transport.unsubscribe("orders", SubscriptionId::new()),
            Err(TransportError::NotSubscribed { .. })
        ));
        assert!(transport.is_subscribed("orders"));
        assert!(matches!(
            transport.unsubscribe("", id),
            Err(TransportError::InvalidRouting { .. })
        ));
    }

    #[test]
    fn failing_callback_does_not_starve_the_others() {
        let transport = InMemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let failing: TransportCallback = Arc::new(|_: &str, _: &Value| -> EventsResult<()> {
            Err(EventsError::SubscriberFailed {
                event: "Orders".into(),
                subscriber: "broken".into(),
                source: anyhow!("boom"),
            })
        });
        transport.subscribe("orders", failing).unwrap();
        transport
            .subscribe("orders", counting_callback(counter.clone()))
            .unwrap();

        assert!(transport.deliver("orders", json!(1)).is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_records_and_loops_back() {
        let transport = InMemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));

        transport.publish("orders", json!(1)).unwrap();
        let id = transport
            .subscribe("orders", counting_callback(counter.clone()))
            .unwrap();
        transport.publish("orders", json!(2)).unwrap();
        transport.unsubscribe("orders", id).unwrap();
        transport.publish("orders", json!(3)).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(transport.published().len(), 3);
        assert!(transport.subscribed_routings().is_empty());
        assert!(transport.publish("", json!(4)).is_err());
    }
}
