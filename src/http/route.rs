//! Request descriptors.
//!
//! A [`Route`] is the immutable description of one HTTP call: method, fully
//! resolved target URL (query string included), optional JSON body and extra
//! headers. It is built once by a [`RouteBuilder`] and can be sent any number
//! of times, which is what the rate-limit retry does.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::error::RouteError;

/// Base URL of the BattleMetrics API.
pub const DEFAULT_BASE_URL: &str = "https://api.battlemetrics.com";

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Value of a query parameter.
///
/// [`QueryValue::Many`] is emitted as the same key repeated once per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::One(value.clone())
    }
}

/// Booleans are sent lowercase, as the API expects.
impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Many(values.into_iter().map(str::to_owned).collect())
    }
}

/// A fully resolved HTTP request description.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    method: Method,
    url: Url,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl Route {
    /// Starts building a route for `method`.
    ///
    /// # Examples
    ///
    /// ```
    /// use battlemetrics::http::{Method, Route};
    ///
    /// let route = Route::builder(Method::Get)
    ///     .path("/bans")
    ///     .query("filter[search]", "76561198000000000")
    ///     .query("page[size]", 100u32)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(
    ///     route.url().as_str(),
    ///     "https://api.battlemetrics.com/bans?filter%5Bsearch%5D=76561198000000000&page%5Bsize%5D=100"
    /// );
    /// ```
    pub fn builder(method: Method) -> RouteBuilder {
        RouteBuilder::new(method)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target URL, query string included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Extra headers supplied by the caller.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Builder for [`Route`].
///
/// Exactly one of [`RouteBuilder::path`] and [`RouteBuilder::url`] must be
/// called before [`RouteBuilder::build`]. [`RouteBuilder::segment`] alone
/// also targets the base URL.
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    method: Method,
    base: Option<String>,
    path: Option<String>,
    url: Option<String>,
    segments: Vec<String>,
    query: Vec<(String, QueryValue)>,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl RouteBuilder {
    fn new(method: Method) -> Self {
        RouteBuilder {
            method,
            base: None,
            path: None,
            url: None,
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Base URL the path is joined to. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base(mut self, base: &str) -> Self {
        self.base = Some(base.to_owned());
        self
    }

    /// Path relative to the base URL.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_owned());
        self
    }

    /// Fully custom absolute URL, used instead of base + path.
    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_owned());
        self
    }

    /// Appends one path segment after the path or URL.
    ///
    /// The segment is percent-encoded, `/` `?` and `#` included, so an id
    /// can never reach another endpoint.
    pub fn segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_owned());
        self
    }

    /// Appends a query parameter. Parameters keep their insertion order.
    pub fn query(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// Appends a query parameter when `value` is set.
    pub fn query_opt<V: Into<QueryValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// JSON request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Extra header. An `Authorization` header is ignored at dispatch time.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Resolves the target and produces the [`Route`].
    ///
    /// # Errors
    ///
    /// * [`RouteError::AmbiguousTarget`] - both a path and a URL were given
    /// * [`RouteError::MissingTarget`] - neither was given, nor any segment
    /// * [`RouteError::InvalidUrl`] - the target is not an absolute http(s) URL
    pub fn build(self) -> Result<Route, RouteError> {
        let target = match (self.path, self.url) {
            (Some(_), Some(_)) => return Err(RouteError::AmbiguousTarget),
            (None, None) if self.segments.is_empty() => return Err(RouteError::MissingTarget),
            (path, None) => {
                let base = self.base.as_deref().unwrap_or(DEFAULT_BASE_URL);
                join(base, path.as_deref().unwrap_or(""))
            }
            (None, Some(url)) => url,
        };

        let mut url = Url::parse(&target).map_err(|e| RouteError::InvalidUrl {
            url: target.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RouteError::InvalidUrl {
                url: target,
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if !self.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| RouteError::InvalidUrl {
                    url: target.clone(),
                    reason: "URL cannot have path segments".to_owned(),
                })?
                .pop_if_empty()
                .extend(&self.segments);
        }

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                match value {
                    QueryValue::One(v) => {
                        pairs.append_pair(key, v);
                    }
                    QueryValue::Many(values) => {
                        for v in values {
                            pairs.append_pair(key, v);
                        }
                    }
                }
            }
        }

        Ok(Route {
            method: self.method,
            url,
            body: self.body,
            headers: self.headers,
        })
    }
}

fn join(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
