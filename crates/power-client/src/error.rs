//! Power client errors

use thiserror::Error;

/// Errors that can occur when handing a request to the power agent
#[derive(Debug, Error)]
pub enum PowerError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Power agent refused the request
    #[error("Power agent error: {0}")]
    Api(String),
}
