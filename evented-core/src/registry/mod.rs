//! 事件注册（registry）
//!
//! 把“类型级声明”与“实例级缓存”拆成两个显式对象：
//! - `EventDeclarations`：某一宿主类型的事件声明表（事件名 → 创建选项），
//!   由该类型的所有实例共享；
//! - `EventRegistry`：单个宿主实例的事件缓存，按声明惰性创建事件并在宿主生命周期内复用；
//! - `Evented`：宿主协议，暴露注册表并提供 `get/on/emit` 等便捷方法。
//!
mod declarations;
mod event_registry;
mod evented;

pub use declarations::EventDeclarations;
pub use event_registry::EventRegistry;
pub use evented::Evented;
