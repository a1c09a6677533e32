use crate::error::{ManagerError, ManagerResult};
use evented_core::{
    AnyEvent, EventDeclarations, EventName, EventOptions, EventRegistry, Evented, Transport,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 事件管理器
///
/// - 持有一个传输，并把它作为注册表的后备传输；
/// - `external` 声明经由该传输到达的事件；
/// - `publish`/`emit_external` 向其他参与者发送消息。
pub struct EventManager {
    registry: EventRegistry,
    transport: Arc<dyn Transport>,
}

impl EventManager {
    /// 以声明表的类型名作为宿主标识
    pub fn new(declarations: Arc<EventDeclarations>, transport: Arc<dyn Transport>) -> Self {
        let host = declarations.type_name().to_string();
        Self::with_host(host, declarations, transport)
    }

    pub fn with_host(
        host: impl Into<String>,
        declarations: Arc<EventDeclarations>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let registry = EventRegistry::builder()
            .host(host)
            .declarations(declarations)
            .transport(transport.clone())
            .build();
        Self {
            registry,
            transport,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// 声明（或复用相同声明的）外部事件，使用管理器的传输
    pub fn external(
        &self,
        name: impl Into<EventName>,
        routing: impl Into<String>,
    ) -> ManagerResult<AnyEvent> {
        let event = self.registry.event(name, EventOptions::external(routing))?;
        Ok(event)
    }

    /// 向路由键发布消息
    pub fn publish(&self, routing: &str, payload: Value) -> ManagerResult<()> {
        debug!(host = %self.registry.host(), routing, "publishing");
        self.transport.publish(routing, payload)?;
        Ok(())
    }

    /// 向已声明外部事件的路由键发布消息
    pub fn emit_external(&self, name: &str, payload: Value) -> ManagerResult<()> {
        let event = self.registry.get(name)?;
        let Some(external) = event.as_external() else {
            return Err(ManagerError::NotExternal {
                event: name.to_string(),
            });
        };

        debug!(host = %self.registry.host(), event = %name, routing = %external.routing(), "emitting external event");
        external.transport().publish(external.routing(), payload)?;
        Ok(())
    }
}

impl Evented for EventManager {
    fn registry(&self) -> &EventRegistry {
        &self.registry
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("registry", &self.registry)
            .finish()
    }
}
