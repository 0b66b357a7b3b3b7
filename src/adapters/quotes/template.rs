//! Endpoint templates and JSON field paths.
//!
//! Templates use `{name}` placeholders. `{symbol}` always expands to
//! the series key; any other name is looked up in the series params.
//! Values expanded into endpoint URLs are percent-encoded.
//! Field paths are dot-separated (`price`, `rates.EUR`, `data.0.last`).

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;

use reqwest::Url;
use serde_json::Value;
use thiserror::Error;

use crate::ports::FetchError;

/// Reserved placeholder bound to the series key.
pub const SYMBOL_PLACEHOLDER: &str = "symbol";

/// Template or field path could not be built from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{name}` placeholder has no value.
    #[error("unknown placeholder {{{0}}} in template {1:?}")]
    UnknownPlaceholder(String, String),
    /// A `{` without matching `}`.
    #[error("unterminated placeholder in template {0:?}")]
    Unterminated(String),
    /// Field path is empty or has an empty segment.
    #[error("invalid field path {0:?}")]
    InvalidFieldPath(String),
    /// Rendered endpoint is not an absolute URL.
    #[error("invalid endpoint URL {0:?}: {1}")]
    InvalidUrl(String, String),
}

/// Expand every `{name}` placeholder in `template` verbatim.
///
/// # Errors
/// Fails on unterminated or unknown placeholders.
pub fn render_template(
    template: &str,
    symbol: &str,
    params: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    expand(template, symbol, params, |value| Cow::Borrowed(value))
}

/// Expand an endpoint template, percent-encoding every substituted
/// value so keys like `USD/EUR` or `A&B` stay inside their component.
///
/// # Errors
/// Fails on bad placeholders or when the result does not parse as a URL.
pub fn render_url(
    template: &str,
    symbol: &str,
    params: &HashMap<String, String>,
) -> Result<Url, TemplateError> {
    let rendered = expand(template, symbol, params, encode_component)?;
    Url::parse(&rendered).map_err(|e| TemplateError::InvalidUrl(rendered, e.to_string()))
}

fn expand(
    template: &str,
    symbol: &str,
    params: &HashMap<String, String>,
    escape: impl for<'a> Fn(&'a str) -> Cow<'a, str>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| TemplateError::Unterminated(template.to_string()))?;
        let name = &after[..close];

        let value = if name == SYMBOL_PLACEHOLDER {
            symbol
        } else {
            params.get(name).map(String::as_str).ok_or_else(|| {
                TemplateError::UnknownPlaceholder(name.to_string(), template.to_string())
            })?
        };
        out.push_str(&escape(value));
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(value: &str) -> Cow<'_, str> {
    let unreserved = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~');
    if value.bytes().all(unreserved) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() * 3);
    for b in value.bytes() {
        if unreserved(b) {
            out.push(char::from(b));
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    Cow::Owned(out)
}

/// Parsed path to a numeric leaf inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-separated path.
    ///
    /// # Errors
    /// Fails if the path or any of its segments is empty.
    pub fn parse(path: &str) -> Result<Self, TemplateError> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TemplateError::InvalidFieldPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Path as configured, for diagnostics.
    pub fn as_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Extract a finite number at this path.
    ///
    /// Leaves may be JSON numbers or numeric strings. Numeric segments
    /// index into arrays.
    ///
    /// # Errors
    /// Returns [`FetchError::Parse`] when a segment is missing or the
    /// leaf is null, non-numeric or not finite.
    pub fn extract(&self, document: &Value) -> Result<f64, FetchError> {
        let mut node = document;
        for segment in &self.segments {
            let next = match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            node = next.ok_or_else(|| {
                FetchError::Parse(format!("missing field {:?}", self.as_dotted()))
            })?;
        }

        let value = match node {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Null => {
                return Err(FetchError::Parse(format!("field {:?} is null", self.as_dotted())));
            }
            _ => None,
        };

        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(FetchError::Parse(format!(
                "field {:?} is not a finite number: {node}",
                self.as_dotted()
            ))),
        }
    }
}
