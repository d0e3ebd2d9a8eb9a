use reqwest::StatusCode;
use thiserror::Error;

pub type KubeResult<T> = Result<T, KubeError>;

#[derive(Debug, Error)]
pub enum KubeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}")]
    Status { path: String, status: StatusCode },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },

    #[error("deployment {0} cannot be blank")]
    Blank(&'static str),

    #[error("scale of {deployment} rejected: requested {requested}, api reports {reported}")]
    ScaleRejected {
        deployment: String,
        requested: u32,
        reported: u32,
    },

    #[error("secret {secret} is missing data.{key}")]
    MissingKey { secret: String, key: &'static str },

    #[error("secret {secret} has invalid base64 in data.{key}: {source}")]
    Base64 {
        secret: String,
        key: &'static str,
        source: base64::DecodeError,
    },
}
