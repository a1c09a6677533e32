//! 进程内事件与发布/订阅传输桥接（evented-core）
//!
//! 提供同步的观察者式事件，以及把事件桥接到可插拔发布/订阅传输的外部事件：
//! - 本地事件（`event`）：按插入顺序保存具名订阅者，`fire` 依次调用；
//! - 外部事件（`external_event`）：首个订阅者加入时订阅传输上的路由键，
//!   最后一个订阅者移除时注销，收到的消息转为一次 `fire`；
//! - 注册表（`registry`）：类型级事件声明与宿主实例级事件缓存；
//! - 传输（`transport`）：`Transport` 协议以及内存/广播两种实现。
//!
//! 典型用法：
//! 1. 为宿主类型创建共享的 `EventDeclarations` 并声明事件；
//! 2. 每个宿主实例持有一个 `EventRegistry`（可附带后备传输），实现 `Evented`；
//! 3. 通过 `get/on/emit` 或返回的 `AnyEvent` 订阅与触发事件。
//!
//! ```
//! use evented_core::{EventDeclarations, EventOptions, EventRegistry};
//! use serde_json::{Value, json};
//! use std::sync::Arc;
//!
//! let declarations = Arc::new(EventDeclarations::new("Sensor"));
//! declarations.declare("Changed", EventOptions::local()).unwrap();
//!
//! let registry = EventRegistry::new("sensor-1", declarations, None);
//! registry
//!     .on("Changed", |args: &[Value]| {
//!         assert_eq!(args, &[json!(42)]);
//!         Ok(())
//!     })
//!     .unwrap();
//! registry.emit("Changed", &[json!(42)]).unwrap();
//! ```
//!
pub mod any_event;
pub mod error;
pub mod event;
pub mod external_event;
pub mod name;
pub mod options;
pub mod registry;
pub mod subscriber;
pub mod transport;

pub use any_event::AnyEvent;
pub use error::{
    EventError, EventsError, EventsResult, HandlerError, TransportError, TransportResult,
};
pub use event::Event;
pub use external_event::ExternalEvent;
pub use name::{EventName, SubscriberName};
pub use options::EventOptions;
pub use registry::{EventDeclarations, EventRegistry, Evented};
pub use subscriber::{HandlerResult, Subscriber};
pub use transport::{InMemoryTransport, Transport, TransportCallback};
#[cfg(feature = "broadcast")]
pub use transport::{BroadcastTransport, BroadcastTransportConfig};
