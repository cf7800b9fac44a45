use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("link st-type is out of bounds (must be -3 to +3): {0}")]
    OutOfBoundsStType(i32),

    #[error("illegal link class: {0}")]
    IllegalLinkClass(i32),

    #[error("no such arrow has been declared in the configuration: {0}")]
    UnknownArrow(String),

    #[error("arrows in database are not in sync with the in-memory directory")]
    ArrowDirectoryMismatch,

    #[error("self-loops are not allowed: {0}")]
    SelfLoop(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Sink for non-fatal ingestion warnings (case-variant collisions and the
/// like). The ingest pipeline keeps going; only the sink decides whether a
/// human ever sees the message.
pub trait WarningSink {
    fn warn(&self, message: &str);
}

/// Default sink: route warnings to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}
