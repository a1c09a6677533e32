use evented_core::error::{EventsError, TransportError};

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ManagerError {
    #[error("events: {0}")]
    Events(#[from] EventsError),

    #[error("event is not external: event={event}")]
    NotExternal { event: String },
}

impl From<TransportError> for ManagerError {
    fn from(err: TransportError) -> Self {
        Self::Events(err.into())
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
