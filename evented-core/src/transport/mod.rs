//! 传输层（transport）
//!
//! 外部发布/订阅消息系统的最小协议：
//! - `Transport`：按路由键订阅、退订与发布；每次订阅返回独立的 `SubscriptionId`，
//!   同一路由键可被多个外部事件同时订阅；
//! - `InMemoryTransport`：同步回环实现，带调用计数与投递模拟，主要用于测试；
//! - `BroadcastTransport`（feature `broadcast`）：基于 tokio broadcast 的进程内实现。
//!
//! 具体消息中间件（如 AMQP 交换机/队列、连接管理、线上编码）不在本 crate 内实现，
//! 只需满足 `Transport` 协议即可接入。
//!
#[cfg(feature = "broadcast")]
pub mod broadcast;
pub mod inmemory;

#[cfg(feature = "broadcast")]
pub use broadcast::{BroadcastTransport, BroadcastTransportConfig};
pub use inmemory::InMemoryTransport;

use crate::error::{EventsResult, TransportError, TransportResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// 投递回调：每当路由键上到达一条消息，以 `(routing, payload)` 调用一次
pub type TransportCallback = Arc<dyn Fn(&str, &Value) -> EventsResult<()> + Send + Sync>;

/// 订阅标识：`Transport::subscribe` 返回，退订时交回
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 传输协议
///
/// 实现方自行保证内部状态的并发安全；同一个 Transport 通常被多个外部事件共享，
/// 同一路由键上的每个订阅都会收到该路由键的全部消息。
pub trait Transport: Send + Sync {
    /// 订阅路由键，之后该路由键上的消息都会交给 `callback`
    fn subscribe(&self, routing: &str, callback: TransportCallback) -> TransportResult<SubscriptionId>;

    /// 取消此前对路由键的某个订阅；未知订阅返回 `TransportError::NotSubscribed`
    fn unsubscribe(&self, routing: &str, subscription: SubscriptionId) -> TransportResult<()>;

    /// 向路由键发布消息
    fn publish(&self, routing: &str, payload: Value) -> TransportResult<()>;

    /// 传输名称（用于日志与错误信息）
    fn transport_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 校验路由键非空
pub fn validate_routing(routing: &str) -> TransportResult<&str> {
    if routing.trim().is_empty() {
        return Err(TransportError::invalid_routing("routing key must not be empty"));
    }
    Ok(routing)
}
