//! 事件创建选项（EventOptions）
//!
//! 声明事件时携带的选项：带有 `routing` 或 `transport` 即创建外部事件，
//! 否则创建本地事件。`transport` 可省略，由宿主在创建时提供后备传输。
//!
use crate::transport::Transport;
use bon::Builder;
use std::fmt;
use std::sync::Arc;

/// 事件创建选项
#[derive(Builder, Clone, Default)]
pub struct EventOptions {
    /// 外部事件的路由键
    #[builder(into)]
    routing: Option<String>,
    /// 外部事件使用的传输；省略时使用宿主的后备传输
    transport: Option<Arc<dyn Transport>>,
}

impl EventOptions {
    /// 本地事件选项
    pub fn local() -> Self {
        Self::default()
    }

    /// 仅指定路由键的外部事件选项
    pub fn external(routing: impl Into<String>) -> Self {
        Self::builder().routing(routing).build()
    }

    pub fn routing(&self) -> Option<&str> {
        self.routing.as_deref()
    }

    pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// 是否应创建外部事件
    pub fn is_external(&self) -> bool {
        self.routing.is_some() || self.transport.is_some()
    }
}

/// 传输按同一实例判等
impl PartialEq for EventOptions {
    fn eq(&self, other: &Self) -> bool {
        let same_transport = match (&self.transport, &other.transport) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        };
        self.routing == other.routing && same_transport
    }
}

impl Eq for EventOptions {}

impl fmt::Display for EventOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(routing) = &self.routing {
            parts.push(format!("routing: {routing:?}"));
        }
        if let Some(transport) = &self.transport {
            parts.push(format!("transport: {}", transport.transport_name()));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl fmt::Debug for EventOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOptions")
            .field("routing", &self.routing)
            .field(
                "transport",
                &self.transport.as_ref().map(|t| t.transport_name().to_string()),
            )
            .finish()
    }
}
