//! Response normalization.
//!
//! Turns the body of a successful response into a [`Normalized`] value,
//! keyed by the declared `Content-Type`:
//!
//! | content type               | result                                  |
//! |----------------------------|-----------------------------------------|
//! | anything containing `json` | [`Normalized::Json`], repaired if needed |
//! | `application/octet-stream` | [`Normalized::BanRecords`]               |
//! | `text/html`                | [`Normalized::Text`] (unexpected, logged) |
//! | empty body                 | [`Normalized::Empty`]                    |
//!
//! Any other content type is rejected with
//! [`Error::UnsupportedContentType`].

use log::warn;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::http::ban_export::{BanRecord, parse_ban_export};
use crate::http::repair::repair;

/// Canonical decoded form of a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Json(Value),
    BanRecords(Vec<BanRecord>),
    Text(String),
    /// Success without a body, typically a `DELETE`.
    Empty,
}

impl Normalized {
    /// The JSON payload. [`Normalized::Empty`] becomes `null`.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedResponse`] for text and ban records.
    pub fn into_json(self) -> Result<Value> {
        match self {
            Normalized::Json(value) => Ok(value),
            Normalized::Empty => Ok(Value::Null),
            Normalized::Text(text) => Err(Error::UnexpectedResponse(format!(
                "expected JSON, got text: {}",
                text.chars().take(80).collect::<String>()
            ))),
            Normalized::BanRecords(_) => Err(Error::UnexpectedResponse(
                "expected JSON, got a ban export".to_owned(),
            )),
        }
    }

    /// Decodes the JSON payload into a typed record.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_json()?)?)
    }

    /// The ban records of an export.
    pub fn into_ban_records(self) -> Result<Vec<BanRecord>> {
        match self {
            Normalized::BanRecords(records) => Ok(records),
            Normalized::Empty => Ok(Vec::new()),
            other => Err(Error::UnexpectedResponse(format!(
                "expected a ban export, got {}",
                other.shape()
            ))),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Normalized::Json(_) => "JSON",
            Normalized::BanRecords(_) => "a ban export",
            Normalized::Text(_) => "text",
            Normalized::Empty => "an empty body",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Json,
    BanExport,
    Html,
}

fn classify(content_type: &str) -> Option<ContentKind> {
    if content_type.to_ascii_lowercase().contains("json") {
        return Some(ContentKind::Json);
    }

    let mime: Mime = content_type.parse().ok()?;
    if mime.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str() {
        Some(ContentKind::BanExport)
    } else if mime.type_() == mime::TEXT && mime.subtype() == mime::HTML {
        Some(ContentKind::Html)
    } else {
        None
    }
}

/// Normalizes a response body according to its declared content type.
///
/// # Arguments
///
/// * `body` - Raw response bytes.
/// * `content_type` - Value of the `Content-Type` header, if any.
///
/// # Errors
///
/// * [`Error::UnsupportedContentType`] - unknown or missing content type on a non-empty body
/// * [`Error::Decode`] - JSON that the repair pass could not fix
///
/// # Examples
///
/// ```
/// use battlemetrics::http::{Normalized, normalize};
/// use serde_json::json;
///
/// let normalized = normalize(br#"{"data": []}"#, Some("application/json")).unwrap();
/// assert_eq!(normalized, Normalized::Json(json!({"data": []})));
/// ```
pub fn normalize(body: &[u8], content_type: Option<&str>) -> Result<Normalized> {
    if body.trim_ascii().is_empty() {
        return Ok(Normalized::Empty);
    }

    let Some(content_type) = content_type else {
        return Err(Error::UnsupportedContentType("<missing>".to_owned()));
    };

    match classify(content_type) {
        Some(ContentKind::Json) => normalize_json(body),
        Some(ContentKind::BanExport) => Ok(Normalized::BanRecords(parse_ban_export(
            &String::from_utf8_lossy(body),
        ))),
        Some(ContentKind::Html) => {
            warn!("received an HTML response where JSON was expected");
            Ok(Normalized::Text(clean_html_text(&String::from_utf8_lossy(
                body,
            ))))
        }
        None => Err(Error::UnsupportedContentType(content_type.to_owned())),
    }
}

fn normalize_json(body: &[u8]) -> Result<Normalized> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(Normalized::Json(value)),
        Err(e) => {
            warn!("malformed JSON response ({}), attempting repair", e);
            let repaired = repair(&String::from_utf8_lossy(body))?;
            warn!(
                "JSON response repaired with {} fixes, content may differ from what the server meant",
                repaired.repairs
            );
            Ok(Normalized::Json(repaired.value))
        }
    }
}

/// Strips a `b'...'` / `b"..."` byte-literal wrapper left by upstream
/// encoding quirks.
fn clean_html_text(text: &str) -> String {
    let trimmed = text.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = trimmed
            .strip_prefix('b')
            .and_then(|t| t.strip_prefix(quote))
            .and_then(|t| t.strip_suffix(quote))
        {
            return inner.to_owned();
        }
    }
    trimmed.to_owned()
}
