//! 订阅者（Subscriber）
//!
//! 事件触发时被调用的处理单元。闭包与实现了 `Subscriber` 的处理器对象
//! 统一收敛为 `Arc<dyn Subscriber>` 存储在事件中。
//!
use serde_json::Value;
use std::sync::Arc;

/// 订阅者处理结果；返回错误会中断本次 `fire` 的后续调用
pub type HandlerResult = anyhow::Result<()>;

/// 订阅者：处理事件触发时传入的参数列表
pub trait Subscriber: Send + Sync {
    /// 处理一次事件触发
    fn handle(&self, args: &[Value]) -> HandlerResult;

    /// 订阅者名称提示（未显式命名时用作生成名称的前缀）
    fn subscriber_name(&self) -> &str {
        "subscriber"
    }
}

impl<T> Subscriber for Arc<T>
where
    T: Subscriber + ?Sized,
{
    fn handle(&self, args: &[Value]) -> HandlerResult {
        (**self).handle(args)
    }

    fn subscriber_name(&self) -> &str {
        (**self).subscriber_name()
    }
}

/// 闭包订阅者
pub(crate) struct FnSubscriber<F>(pub(crate) F);

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&[Value]) -> HandlerResult + Send + Sync,
{
    fn handle(&self, args: &[Value]) -> HandlerResult {
        (self.0)(args)
    }
}
