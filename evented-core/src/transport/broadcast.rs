//! 广播传输（BroadcastTransport）
//!
//! 基于 `tokio::sync::broadcast` 的进程内传输，满足 `Transport` 协议：
//! - `publish`：把 `(routing, payload)` 广播到通道，无订阅者时忽略；
//! - `subscribe`：为每个订阅派生一个投递任务，按路由键过滤后调用回调；
//!   同一路由键可有多个订阅，各自收到全部消息；
//! - `unsubscribe`：取消该订阅的投递任务；
//! - 典型用途：单进程内多个参与者之间的事件互通、示例与本地开发。
//!
//! 注意：慢速订阅者会导致接收端滞后（lagged），滞后的消息被跳过并记录告警，
//! 本传输不做重试与背压。

use super::{SubscriptionId, Transport, TransportCallback, validate_routing};
use crate::error::{TransportError, TransportResult};
use bon::Builder;
use dashmap::DashMap;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// 广播传输配置
#[derive(Builder, Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct BroadcastTransportConfig {
    /// 广播缓冲区容量（至少为 1）
    #[builder(default = 1024)]
    pub capacity: usize,
}

impl Default for BroadcastTransportConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Clone, Debug)]
struct Delivery {
    routing: Arc<str>,
    payload: Value,
}

struct Subscription {
    routing: String,
    token: CancellationToken,
    // 仅持有，不等待；任务在取消后自行退出
    _task: JoinHandle<()>,
}

/// 基于 tokio broadcast 的进程内传输
pub struct BroadcastTransport {
    tx: broadcast::Sender<Delivery>,
    runtime: Handle,
    subscriptions: DashMap<SubscriptionId, Subscription>,
    token: CancellationToken,
}

impl BroadcastTransport {
    /// 在当前 tokio 运行时上创建；不在运行时内调用时返回 `TransportError::Unavailable`
    pub fn new(config: BroadcastTransportConfig) -> TransportResult<Self> {
        let runtime = Handle::try_current().map_err(|e| TransportError::unavailable(e.to_string()))?;
        Ok(Self::with_runtime(runtime, config))
    }

    /// 使用指定运行时派生投递任务
    pub fn with_runtime(runtime: Handle, config: BroadcastTransportConfig) -> Self {
        let (tx, _rx) = broadcast::channel(config.capacity.max(1));
        Self {
            tx,
            runtime,
            subscriptions: DashMap::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn is_subscribed(&self, routing: &str) -> bool {
        self.subscriptions.iter().any(|e| e.value().routing == routing)
    }

    /// 路由键上的订阅数量
    pub fn subscription_count(&self, routing: &str) -> usize {
        self.subscriptions
            .iter()
            .filter(|e| e.value().routing == routing)
            .count()
    }

    /// 取消全部投递任务；之后仍可重新订阅
    ///
    /// 持有订阅的外部事件在退订时收到 `NotSubscribed`，并视为订阅已关闭。
    pub fn shutdown(&self) {
        for entry in self.subscriptions.iter() {
            entry.value().token.cancel();
        }
        self.subscriptions.clear();
    }

    async fn delivery_loop(
        routing: String,
        rx: broadcast::Receiver<Delivery>,
        callback: TransportCallback,
        token: CancellationToken,
    ) {
        let mut stream = BroadcastStream::new(rx);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = stream.next() => match next {
                    Some(Ok(delivery)) => {
                        if *delivery.routing != *routing {
                            continue;
                        }
                        if let Err(err) = callback(&routing, &delivery.payload) {
                            warn!(routing = %routing, error = %err, "broadcast delivery failed");
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(routing = %routing, skipped, "broadcast receiver lagged");
                    }
                    None => break,
                },
            }
        }

        debug!(routing = %routing, "broadcast delivery loop stopped");
    }
}

impl Transport for BroadcastTransport {
    fn subscribe(&self, routing: &str, callback: TransportCallback) -> TransportResult<SubscriptionId> {
        let routing = validate_routing(routing)?;

        // 在派生任务前创建接收端，订阅返回后发布的消息不会丢失
        let rx = self.tx.subscribe();
        let token = self.token.child_token();
        let task = self.runtime.spawn(Self::delivery_loop(
            routing.to_string(),
            rx,
            callback,
            token.clone(),
        ));

        let id = SubscriptionId::new();
        self.subscriptions.insert(
            id,
            Subscription {
                routing: routing.to_string(),
                token,
                _task: task,
            },
        );
        debug!(routing, subscription = %id, "broadcast transport subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, routing: &str, subscription: SubscriptionId) -> TransportResult<()> {
        let routing = validate_routing(routing)?;

        match self
            .subscriptions
            .remove_if(&subscription, |_, s| s.routing == routing)
        {
            Some((_, removed)) => {
                removed.token.cancel();
                debug!(routing, subscription = %subscription, "broadcast transport unsubscribed");
                Ok(())
            }
            None => Err(TransportError::NotSubscribed {
                routing: routing.to_string(),
                subscription: subscription.to_string(),
            }),
        }
    }

    fn publish(&self, routing: &str, payload: Value) -> TransportResult<()> {
        let routing = validate_routing(routing)?;
        // 若当前无订阅者，broadcast 的 send 会返回错误，这里视为非致命并忽略
        let receivers = self
            .tx
            .send(Delivery {
                routing: Arc::from(routing),
                payload,
            })
            .unwrap_or(0);
        trace!(routing, receivers, "broadcast transport published");
        Ok(())
    }
}

impl Drop for BroadcastTransport {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_overrides() {
        assert_eq!(BroadcastTransportConfig::default().capacity, 1024);
        assert_eq!(BroadcastTransportConfig::builder().build().capacity, 1024);
        assert_eq!(
            BroadcastTransportConfig::builder().capacity(8).build().capacity,
            8
        );

        let cfg: BroadcastTransportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.capacity, 1024);
        let cfg: BroadcastTransportConfig = serde_json::from_str(r#"{"capacity": 16}"#).unwrap();
        assert_eq!(cfg.capacity, 16);
    }

    #[test]
    fn new_outside_runtime_is_unavailable() {
        let err = BroadcastTransport::new(BroadcastTransportConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn tracks_each_subscription_on_a_routing() {
        let transport = BroadcastTransport::new(BroadcastTransportConfig::default()).unwrap();
        let callback: TransportCallback =
            Arc::new(|_: &str, _: &Value| -> crate::error::EventsResult<()> { Ok(()) });

        assert!(transport.subscribe("", callback.clone()).is_err());
        let first = transport.subscribe("orders", callback.clone()).unwrap();
        let second = transport.subscribe("orders", callback).unwrap();
        assert_eq!(transport.subscription_count("orders"), 2);

        // 路由键与订阅不匹配时不移除
        assert!(matches!(
            transport.unsubscribe("other", first),
            Err(TransportError::NotSubscribed { .. })
        ));
        transport.unsubscribe("orders", first).unwrap();
        assert!(transport.is_subscribed("orders"));
        transport.unsubscribe("orders", second).unwrap();
        assert!(!transport.is_subscribed("orders"));
        assert!(matches!(
            transport.unsubscribe("orders", second),
            Err(TransportError::NotSubscribed { .. })
        ));
    }
}
