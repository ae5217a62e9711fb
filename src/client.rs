//! The BattleMetrics client.
//!
//! [`Battlemetrics`] owns a [`Transport`] and hands out one handle per area
//! of the API. A few calls that do not belong to any area (token
//! introspection, metrics, activity logs) live on the client itself.

use chrono::TimeDelta;
use log::{debug, info};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::http::{DEFAULT_BASE_URL, HttpTransport, Method, Route, Transport};
use crate::resources::{
    Api, BanLists, Bans, Flags, GameInfo, Notes, Organizations, PAGE_SIZE, Players, Servers,
    Sessions,
};
use crate::types::{ApiScopes, DataPoint, Document, Introspection, Note, Resource};
use crate::utils::TimeRange;

/// OAuth token introspection endpoint. It lives outside the API base URL.
pub const INTROSPECT_URL: &str = "https://www.battlemetrics.com/oauth/introspect";

/// Metric requested by [`Battlemetrics::metrics`] when none is given.
pub const DEFAULT_METRIC: &str = "games.rust.players";

/// Filters for [`Battlemetrics::activity_logs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// BattleMetrics player id.
    pub player: Option<String>,
    pub search: Option<String>,
    pub servers: Option<String>,
    /// Message types to leave out, e.g. `unknown,playerMessage`.
    pub blacklist: Option<String>,
    /// Message types to keep.
    pub whitelist: Option<String>,
}

/// Client for the BattleMetrics API.
///
/// # Examples
///
/// ```no_run
/// use battlemetrics::Battlemetrics;
///
/// # async fn run() -> battlemetrics::Result<()> {
/// let client = Battlemetrics::new("your_token")?;
/// let player = client.players().info("42").await?;
/// println!("Player: {}", player.data.attributes.name);
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct Battlemetrics<T = HttpTransport> {
    transport: T,
    /// Base URL of the API, without trailing slash
    base_url: String,
    /// Token used for introspection when the caller does not pass one
    token: Option<String>,
}

impl Battlemetrics<HttpTransport> {
    /// Create a client for the public API.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the token is empty.
    pub fn new(token: &str) -> Result<Self> {
        Ok(Battlemetrics::from_http(
            HttpTransport::new(token)?,
            DEFAULT_BASE_URL,
        ))
    }

    /// Create a client around a configured [`HttpTransport`].
    pub fn from_http(transport: HttpTransport, base_url: &str) -> Self {
        let token = transport.token().to_owned();
        Battlemetrics {
            transport,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: Some(token),
        }
    }

    /// Release the connection pool. The client stays usable.
    pub fn close(&self) {
        info!("close BattleMetrics client");
        self.transport.close();
    }
}

impl<T: Transport> Battlemetrics<T> {
    /// Create a client over any [`Transport`].
    pub fn with_transport(transport: T, base_url: &str) -> Self {
        Battlemetrics {
            transport,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: None,
        }
    }

    /// Token introspected by [`Battlemetrics::check_api_scopes`] by default.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_owned());
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn players(&self) -> Players<'_, T> {
        Players::new(&self.transport, &self.base_url)
    }

    pub fn servers(&self) -> Servers<'_, T> {
        Servers::new(&self.transport, &self.base_url)
    }

    pub fn bans(&self) -> Bans<'_, T> {
        Bans::new(&self.transport, &self.base_url)
    }

    pub fn ban_lists(&self) -> BanLists<'_, T> {
        BanLists::new(&self.transport, &self.base_url)
    }

    pub fn notes(&self) -> Notes<'_, T> {
        Notes::new(&self.transport, &self.base_url)
    }

    pub fn flags(&self) -> Flags<'_, T> {
        Flags::new(&self.transport, &self.base_url)
    }

    pub fn sessions(&self) -> Sessions<'_, T> {
        Sessions::new(&self.transport, &self.base_url)
    }

    pub fn organizations(&self) -> Organizations<'_, T> {
        Organizations::new(&self.transport, &self.base_url)
    }

    pub fn game_info(&self) -> GameInfo<'_, T> {
        GameInfo::new(&self.transport, &self.base_url)
    }

    fn api(&self) -> Api<'_, T> {
        Api::new(&self.transport, &self.base_url)
    }

    /// A single note of a player.
    pub async fn note(&self, player_id: &str, note_id: &str) -> Result<Document<Note>> {
        self.notes().info(player_id, note_id).await
    }

    /// Introspect `token`, or the client's own token, and list its scopes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when no token is given and the client was
    /// built without one.
    pub async fn check_api_scopes(&self, token: Option<&str>) -> Result<ApiScopes> {
        let token = token.or(self.token.as_deref()).ok_or_else(|| {
            Error::InvalidArgument("no token to introspect".to_owned())
        })?;
        info!("introspect API token");

        let route = Route::builder(Method::Post)
            .url(INTROSPECT_URL)
            .json(json!({ "token": token }))
            .build()?;
        let introspection: Introspection = self.transport.request(route).await?.decode()?;
        Ok(introspection.into())
    }

    /// Data points of a global metric.
    ///
    /// # Arguments
    ///
    /// * `name` - Metric name, [`DEFAULT_METRIC`] when `None`.
    /// * `range` - Defaults to the last day.
    /// * `resolution` - `raw`, `30`, `60` (default) or `1440` minutes.
    pub async fn metrics(
        &self,
        name: Option<&str>,
        range: Option<TimeRange>,
        resolution: Option<&str>,
    ) -> Result<Vec<DataPoint>> {
        let name = name.unwrap_or(DEFAULT_METRIC);
        info!("request metric {}", name);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api()
            .route(Method::Get, "/metrics")
            .query("metrics[0][name]", name)
            .query("metrics[0][range]", range.period())
            .query("metrics[0][resolution]", resolution.unwrap_or("60"))
            .query("fields[dataPoint]", "name,group,timestamp,value");

        let document: Document<Vec<Resource<DataPoint>>> = self.api().decode(route).await?;
        debug!("metric {} returned {} data points", name, document.data.len());
        Ok(document
            .data
            .into_iter()
            .map(|point| point.attributes)
            .collect())
    }

    /// Recent activity (joins, chat, kicks...) across the token's servers.
    pub async fn activity_logs(&self, filter: &ActivityFilter) -> Result<Value> {
        info!("request activity logs");
        let route = self
            .api()
            .route(Method::Get, "/activity")
            .query("page[size]", PAGE_SIZE)
            .query("include", "organization,server,user,player")
            .query_opt("filter[types][blacklist]", filter.blacklist.as_ref())
            .query_opt("filter[types][whitelist]", filter.whitelist.as_ref())
            .query_opt("filter[servers]", filter.servers.as_ref())
            .query_opt("filter[search]", filter.search.as_ref())
            .query_opt("filter[players]", filter.player.as_ref());
        self.api().json(route).await
    }
}
