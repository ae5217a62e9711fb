//! Transport and response normalization layer.
//!
//! Every API call goes through the same path: a [`Route`] describes the
//! request, a [`Transport`] sends it and the body comes back as a
//! [`Normalized`] value or a typed [`Error`](crate::Error).

use mockall::automock;

use crate::error::Result;

mod ban_export;
mod normalizer;
mod repair;
mod retry;
mod route;
mod transport;

pub use ban_export::{BanExpiry, BanRecord, parse_ban_export, parse_ban_line};
pub use normalizer::{Normalized, normalize};
pub use repair::{MAX_REPAIR_ATTEMPTS, Repaired, repair};
pub use retry::{Backoff, RetryPolicy};
pub use route::{DEFAULT_BASE_URL, Method, QueryValue, Route, RouteBuilder};
pub use transport::HttpTransport;

/// Trait for sending routes to the API.
///
/// This trait abstracts the HTTP layer so resource methods can be tested with
/// [`MockTransport`].
#[automock]
pub trait Transport {
    /// Sends `route` and returns the normalized response body.
    async fn request(&self, route: Route) -> Result<Normalized>;
}
