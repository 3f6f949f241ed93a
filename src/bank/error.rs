// SPDX-License-Identifier: MIT

//! Errors raised by the bank API layer
//!
//! Everything here is converted into a `TaskError` of kind `Request` at the
//! graph boundary; configuration errors surface before a run starts.

use thiserror::Error;

use crate::flow::{ErrorKind, TaskError};

#[derive(Debug, Error)]
pub enum BankError {
    /// Non-2xx response from the bank API or the identity provider
    #[error("API error from {endpoint} (HTTP {status}): {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Configuration errors (missing env vars, invalid URLs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token endpoint answered without an access token
    #[error("Token response did not contain an access token")]
    MissingToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BankError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<BankError> for TaskError {
    /// Left unattributed; the graph fills in the task that issued the call.
    fn from(err: BankError) -> Self {
        TaskError::new("", ErrorKind::Request, err.to_string())
    }
}
