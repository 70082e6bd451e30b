/// Configuration parameter rejections. Raised by the constructors and the
/// rate/capacity setters before any state is mutated.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("overall rate must be non-negative, got {0}")]
    NegativeOverallRate(f64),

    #[error("min rate must be non-negative, got {0}")]
    NegativeMinRate(f64),

    #[error("buffer capacity must be positive")]
    ZeroBufferCapacity,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("source already registered: {0}")]
    DuplicateKey(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WeightError {
    #[error("source not registered: {0}")]
    UnknownKey(String),

    #[error("weight must be non-negative, got {1} for source {0}")]
    NegativeWeight(String, f64),
}

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("source not registered: {0}")]
    UnknownKey(String),
}

/// Errors crossing the service boundary. Domain errors from the worker are
/// wrapped transparently; the remaining variants are transport conditions
/// of the command channel and worker thread themselves.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("command channel full")]
    ChannelFull,

    #[error("throttle worker stopped")]
    Disconnected,

    #[error("failed to spawn throttle worker: {0}")]
    Spawn(String),

    #[error("throttle worker panicked")]
    WorkerPanicked,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error(transparent)]
    Weight(#[from] WeightError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}
