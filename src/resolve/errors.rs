//! Resolution errors
//!
//! Uses thiserror for type-safe error matching rather than opaque anyhow
//! errors. Lookup failures never reach a request handler as errors: callers
//! collapse them to "no data" and render without the missing section.

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned a malformed response: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("no chain provider configured")]
    NoProvider,
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Collapses a failed lookup into "no data", logging the failure. The
/// producers call through this so network trouble costs one annotation,
/// not the whole request.
pub fn ok_or_absent<T>(what: &str, result: ResolveResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{what} unavailable: {e}");
            None
        }
    }
}
