//! 事件层统一错误定义
//!
//! 按来源分为三组：
//! - `HandlerError`：订阅者注册/注销相关（重名、未知订阅者、未声明的事件）；
//! - `EventError`：事件定义相关（外部事件缺少 routing/transport、重复声明、非法赋值）；
//! - `TransportError`：传输层错误，原样向上传播。
//!
//! `EventsError` 汇总三者，并额外携带订阅者在 `fire` 中返回的错误。
//!
use thiserror::Error;

/// 订阅者相关错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("handler name already in use: event={event}, subscriber={subscriber}")]
    DuplicateSubscriber { event: String, subscriber: String },
    #[error("unable to unsubscribe handler: event={event}, subscriber={subscriber}")]
    UnknownSubscriber { event: String, subscriber: String },
    #[error("no such event: host={host}, event={event}")]
    NoSuchEvent { host: String, event: String },
}

/// 事件定义相关错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unable to create external event {event} without routing")]
    MissingRouting { event: String },
    #[error("unable to create external event {event} without transport")]
    MissingTransport { event: String },
    #[error("unable to redefine event {event} with options {options}, declared with {declared}")]
    Redefinition {
        event: String,
        options: String,
        declared: String,
    },
    #[error("wrong assignment to event {event}: only its current instance may be assigned")]
    WrongAssignment { event: String },
}

/// 传输层错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid routing: {reason}")]
    InvalidRouting { reason: String },
    #[error("subscription not found: routing={routing}, subscription={subscription}")]
    NotSubscribed { routing: String, subscription: String },
    #[error("transport unavailable: {reason}")]
    Unavailable { reason: String },
}

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventsError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("subscriber failed: event={event}, subscriber={subscriber}, reason={source}")]
    SubscriberFailed {
        event: String,
        subscriber: String,
        #[source]
        source: anyhow::Error,
    },
}

/// 统一 Result 类型别名
pub type EventsResult<T> = Result<T, EventsError>;

/// 传输层 Result 类型别名
pub type TransportResult<T> = Result<T, TransportError>;

impl EventsError {
    pub fn is_handler_error(&self) -> bool {
        matches!(self, EventsError::Handler(_))
    }

    pub fn is_event_error(&self) -> bool {
        matches!(self, EventsError::Event(_))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, EventsError::Transport(_))
    }
}

impl TransportError {
    pub fn invalid_routing(reason: impl Into<String>) -> Self {
        TransportError::InvalidRouting {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        TransportError::Unavailable {
            reason: reason.into(),
        }
    }
}
