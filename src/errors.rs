//! Process-level errors. Request handling never produces one of these — every
//! code path on the hot path returns a `ResponseEnvelope` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
