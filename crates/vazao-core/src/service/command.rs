use crate::config::ThrottlerConfig;
use crate::error::{BufferError, ConfigError, RegisterError, WeightError};
use crate::throttler::ThrottlerStats;

/// Commands sent from producer and consumer threads to the worker that
/// owns the throttler.
///
/// Each variant that expects a response carries a `tokio::sync::oneshot`
/// sender for the reply; `Shutdown` is fire-and-forget.
pub enum ThrottleCommand<M> {
    Configure {
        config: ThrottlerConfig,
        reply: tokio::sync::oneshot::Sender<Result<(), ConfigError>>,
    },
    RegisterSource {
        key: String,
        reply: tokio::sync::oneshot::Sender<Result<(), RegisterError>>,
    },
    SetWeight {
        key: String,
        weight: f64,
        reply: tokio::sync::oneshot::Sender<Result<(), WeightError>>,
    },
    Buffer {
        key: String,
        message: M,
        reply: tokio::sync::oneshot::Sender<Result<(), BufferError>>,
    },
    Poll {
        now: f64,
        reply: tokio::sync::oneshot::Sender<Option<(String, M)>>,
    },
    Stats {
        reply: tokio::sync::oneshot::Sender<ThrottlerStats>,
    },
    Shutdown,
}
