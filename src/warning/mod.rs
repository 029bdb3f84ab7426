//! Parses `Warning` response headers and delivers them to an optional
//! caller callback (§4.10).
//!
//! Only the exact shape `299 - "<text>"` is recognised; anything else
//! (a different warn-code, a missing agent placeholder, unquoted text) is
//! discarded rather than guessed at. There are no in-order or dedup
//! guarantees beyond whatever order the server's headers arrived in.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;


/// A single parsed `Warning` header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub text: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn warning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^299 - "(.*)"$"#).unwrap())
}

/// Parses one `Warning` header value, returning `None` if it does not match
/// `299 - "<text>"` exactly.
pub fn parse(value: &str) -> Option<Warning> {
    warning_re()
        .captures(value.trim())
        .map(|caps| Warning { text: caps[1].to_string() })
}

/// Parses every `Warning` header in `headers`, discarding entries that
/// don't match the expected shape.
pub fn parse_all(headers: &http::HeaderMap) -> Vec<Warning> {
    headers
        .get_all("warning")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(parse)
        .collect()
}

/// A caller-provided callback invoked for each parsed [`Warning`].
pub type WarningHandler = Arc<dyn Fn(Warning) + Send + Sync>;

/// Parses every `Warning` header in `headers` and invokes `handler` (if
/// any) for each one, in header order.
pub fn deliver(headers: &http::HeaderMap, handler: Option<&WarningHandler>) {
    let warnings = parse_all(headers);
    if let Some(handler) = handler {
        for warning in warnings {
            handler(warning);
        }
    } else {
        for warning in warnings {
            tracing::warn!(text = %warning.text, "registry warning with no handler installed");
        }
    }
}
