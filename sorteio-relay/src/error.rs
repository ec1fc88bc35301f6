use std::time::Duration;

use http::StatusCode;
use tokio_rustls::rustls::pki_types::InvalidDnsNameError;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("invalid webhook url {0:?}")]
    InvalidUrl(String),
    #[error("invalid webhook host: {0}")]
    DnsName(#[from] InvalidDnsNameError),
    #[error("io {0}")]
    Io(#[from] std::io::Error),
    #[error("hyper {0}")]
    Hyper(#[from] hyper::Error),
    #[error("hyper http {0}")]
    HyperHttp(#[from] hyper::http::Error),
    #[error("json {0}")]
    Json(#[from] serde_json::Error),
    #[error("webhook answered with status {0}")]
    Status(StatusCode),
    #[error("webhook did not answer within {0:?}")]
    Timeout(Duration),
    #[error("unexpected webhook answer {0:?}")]
    UnexpectedAnswer(Option<String>),
}
