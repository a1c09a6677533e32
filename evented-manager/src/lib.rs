//! 事件管理器（evented-manager）
//!
//! 参与者之间借助传输互通事件的现成宿主：
//! - 把传输上的外部事件暴露为自身的事件，供参与者订阅；
//! - 向其他参与者发布消息（按路由键或按已声明的外部事件）。
//!
pub mod error;
pub mod manager;

pub use error::{ManagerError, ManagerResult};
pub use manager::EventManager;
