//! Structured error types for the distribution client.
//!
//! Every HTTP status code the client observes is mapped to one of the
//! semantic kinds here at the boundary of the component that issued the
//! request (blob store, manifest store, referrers, registry client). Callers
//! match on [`Error`] variants rather than inspecting status codes directly.

use std::fmt;
use thiserror::Error;

#[cfg(test)]
mod tests;

/// A single entry in a registry's `{"errors":[...]}` response body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ErrorEntry {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The textual reference did not match the reference grammar.
    #[error("invalid reference {input:?}: {reason}")]
    InvalidReference { input: String, reason: String },

    /// The server responded `404` (or the equivalent normalised condition).
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// The server does not implement a capability this client probed for.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// The server's advertised API version is not one this client understands.
    #[error("unsupported registry API version: {message}")]
    UnsupportedVersion { message: String },

    /// A response body (or declared `Content-Length`) exceeded the configured ceiling.
    #[error("response of {actual} bytes exceeds the {limit}-byte metadata ceiling")]
    SizeExceedsLimit { actual: usize, limit: usize },

    /// A non-2xx response the other variants don't cover more specifically.
    #[error("{method} {url} returned {status}{}", crate::error::render_inner(errors))]
    Response {
        method: String,
        url: String,
        status: u16,
        errors: Vec<ErrorEntry>,
    },

    /// A digest computed locally (or supplied by the caller) disagreed with the server's.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// A declared `Content-Length` disagreed with the expected descriptor size.
    #[error("content-length mismatch: expected {expected}, got {actual}")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    /// A response `Content-Type` disagreed with the requested media type.
    #[error("content-type mismatch: expected {expected}, got {actual}")]
    ContentTypeMismatch { expected: String, actual: String },

    /// A header required to complete the operation was absent.
    #[error("missing required header: {header}")]
    MissingHeader { header: String },

    /// Transport-level failure (connection, TLS, cancellation) or a local I/O error.
    #[error("i/o error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body could not be parsed as the data it claimed to be.
    #[error("failed to decode {what}: {message}")]
    Decode {
        what: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// The shape of a registry's `{"errors":[...]}` response body.
#[derive(Debug, Clone, serde::Deserialize)]
struct ErrorResponseBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

fn render_inner(errors: &[ErrorEntry]) -> String {
    if errors.is_empty() {
        String::new()
    } else {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        format!(": {joined}")
    }
}

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_reference(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidReference {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::Unsupported {
            message: message.into(),
        }
    }

    pub fn unsupported_version(message: impl Into<String>) -> Self {
        Error::UnsupportedVersion {
            message: message.into(),
        }
    }

    pub fn size_exceeds_limit(actual: usize, limit: usize) -> Self {
        Error::SizeExceedsLimit { actual, limit }
    }

    pub fn response(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        errors: Vec<ErrorEntry>,
    ) -> Self {
        Error::Response {
            method: method.into(),
            url: url.into(),
            status,
            errors,
        }
    }

    pub fn digest_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::DigestMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn content_length_mismatch(expected: u64, actual: u64) -> Self {
        Error::ContentLengthMismatch { expected, actual }
    }

    pub fn content_type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::ContentTypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_header(header: impl Into<String>) -> Self {
        Error::MissingHeader {
            header: header.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
            source: None,
        }
    }

    pub fn io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Decode {
            what: what.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn decode_with_source(
        what: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Decode {
            what: what.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`Error::Response`] from a non-2xx status and its (possibly
    /// unparsable) body, per §4.9's error decoder.
    pub fn from_response_body(method: impl Into<String>, url: impl Into<String>, status: u16, body: &[u8]) -> Self {
        let errors = serde_json::from_slice::<ErrorResponseBody>(body)
            .map(|b| b.errors)
            .unwrap_or_default();
        Error::response(method, url, status, errors)
    }

    /// `true` for the normalised not-found condition (`404`, or an explicit [`Error::NotFound`]).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
            || matches!(self, Error::Response { status, .. } if *status == 404)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::io_with_source("request failed", e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io_with_source("i/o failure", e)
    }
}
