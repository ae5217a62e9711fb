//! Error types returned by the BattleMetrics client.
//!
//! Every failure of a request ends up in [`Error`]. Callers that need to react
//! differently to "the server rejected my request" and "I could not understand
//! the server's response" use [`Error::kind`] instead of matching on variants.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Alias used by every fallible operation of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, sending or decoding a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The route could not be turned into a request target.
    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    /// A method was called with arguments the API cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The API answered with a non-success status other than 429.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code of the response.
        status: u16,
        /// Message decoded from the error payload, or the raw body.
        message: String,
        /// Raw response body, when there was one.
        raw_body: Option<String>,
    },

    /// The API kept answering 429 until the retry budget ran out.
    #[error("rate limited: gave up after {attempts} attempts")]
    RetryExhausted {
        /// Number of requests sent, the first one included.
        attempts: u32,
    },

    /// Connection failure, timeout or body read failure.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response declared a content type the client does not decode.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The response body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(#[from] DecodeError),

    /// The response decoded fine but did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Errors raised while constructing a [`Route`](crate::http::Route).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Both a base-relative path and a custom URL were supplied.
    #[error("only one of path or url can be provided")]
    AmbiguousTarget,
    /// Neither a base-relative path nor a custom URL were supplied.
    #[error("either path or url must be provided")]
    MissingTarget,
    /// The resolved target is not an absolute URL.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// The rejected target.
        url: String,
        /// Why the URL parser rejected it.
        reason: String,
    },
}

/// Errors raised by the response normalizer.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The repair pass met a defect it has no rule for.
    #[error("malformed JSON at byte {position}: {reason}")]
    Unrepairable {
        /// Byte offset of the defect in the (partially repaired) payload.
        position: usize,
        /// Short description of the defect.
        reason: String,
    },
    /// The repair pass used all of its iterations.
    #[error("malformed JSON still invalid after {0} repairs")]
    RepairExhausted(usize),
    /// Decoding into a typed record failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limited past the retry budget.
    RateLimited,
    /// 4xx other than 429.
    Client,
    /// 5xx.
    Server,
    /// The response could not be understood.
    Decode,
    /// The network layer failed.
    Transport,
    /// The request was never sent because its inputs were invalid.
    InvalidRequest,
}

impl Error {
    /// Builds an [`Error::Http`] from a failed response body.
    ///
    /// The message is taken from the JSON:API `errors` array (`detail`,
    /// `message` or `title` of each entry), then from a top-level `message`,
    /// and finally from the raw text itself.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let trimmed = body.trim();
        let message = serde_json::from_str::<Value>(trimmed)
            .ok()
            .and_then(|json| error_message(&json))
            .unwrap_or_else(|| {
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_owned()
                } else {
                    trimmed.to_owned()
                }
            });

        Error::Http {
            status: status.as_u16(),
            message,
            raw_body: (!trimmed.is_empty()).then(|| body.to_owned()),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Route(_) | Error::InvalidArgument(_) => ErrorKind::InvalidRequest,
            Error::Http { status, .. } if *status >= 500 => ErrorKind::Server,
            Error::Http { .. } => ErrorKind::Client,
            Error::RetryExhausted { .. } => ErrorKind::RateLimited,
            Error::Transport(_) => ErrorKind::Transport,
            Error::UnsupportedContentType(_) | Error::Decode(_) | Error::UnexpectedResponse(_) => {
                ErrorKind::Decode
            }
        }
    }

    /// HTTP status of the failed response, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::RetryExhausted { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the API reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(DecodeError::Json(e))
    }
}

fn error_message(json: &Value) -> Option<String> {
    if let Some(errors) = json.get("errors").and_then(Value::as_array) {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| {
                ["detail", "message", "title"]
                    .iter()
                    .find_map(|key| e.get(*key).and_then(Value::as_str))
            })
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    json.get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
