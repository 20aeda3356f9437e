use thiserror::Error;

/// The error types for hiccup-meter.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("clock error: {0}")]
    Clock(String),

    #[error("child process error: {0}")]
    ChildProcess(String),

    #[error("attach error: {0}")]
    Attach(String),

    #[error("input format error: {0}")]
    InputFormat(String),

    #[error("histogram error: {0}")]
    Histogram(String),
}

/// A specialized Result type for hiccup-meter.
pub type Result<T> = std::result::Result<T, Error>;
