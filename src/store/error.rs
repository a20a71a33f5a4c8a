// src/store/error.rs
use thiserror::Error;

/// Failures talking to the backing data store. The message may carry raw
/// provider text, so it is logged server-side and never returned to clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {message}")]
    Transport { message: String },
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store response could not be decoded: {message}")]
    Decode { message: String },
    #[error("store request timed out")]
    Timeout,
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Decode {
                message: err.to_string(),
            }
        } else {
            StoreError::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode {
            message: err.to_string(),
        }
    }
}
