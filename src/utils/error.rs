use thiserror::Error;

/// Error taxonomy for DXM acquisition.
///
/// `Validation` is the caller's fault and is never retried. `Connection`
/// covers session establishment and probe failures and resets the client to
/// the disconnected state. `Communication` is reserved for register reads
/// that failed after the retry budget was exhausted, carrying the last
/// underlying cause.
#[derive(Error, Debug)]
pub enum DxmError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Insufficient register data: expected at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}
