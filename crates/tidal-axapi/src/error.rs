//! aXAPI client error types.

use reqwest::StatusCode;
use thiserror::Error;

pub type AxapiResult<T> = Result<T, AxapiError>;

#[derive(Debug, Error)]
pub enum AxapiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}")]
    Status { path: String, status: StatusCode },

    #[error("device rejected {path}: {msg} (code {code})")]
    Device { path: String, code: i64, msg: String },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("not logged in to the device")]
    NotAuthenticated,
}
