//! Play sessions: `/sessions`.

use log::info;
use serde_json::Value;

use crate::error::Result;
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE};

/// Page size of the coplay endpoint, which rejects 100.
const COPLAY_PAGE_SIZE: u32 = 99;

/// Filters for [`Sessions::list`]. Values are comma separated ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub servers: Option<String>,
    pub game: Option<String>,
    pub organizations: Option<String>,
    pub players: Option<String>,
    pub identifiers: Option<String>,
}

/// Handle on the session endpoints.
pub struct Sessions<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Sessions<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Sessions {
            api: Api::new(transport, base_url),
        }
    }

    /// Sessions matching the filter, with their identifiers, servers and
    /// players.
    pub async fn list(&self, filter: &SessionFilter) -> Result<Value> {
        info!("request sessions");
        let route = self
            .api
            .route(Method::Get, "/sessions")
            .query("include", "identifier,server,player")
            .query("page[size]", PAGE_SIZE)
            .query_opt("filter[servers]", filter.servers.as_ref())
            .query_opt("filter[game]", filter.game.as_ref())
            .query_opt("filter[organizations]", filter.organizations.as_ref())
            .query_opt("filter[players]", filter.players.as_ref())
            .query_opt("filter[identifiers]", filter.identifiers.as_ref());
        self.api.json(route).await
    }

    /// Sessions that overlapped `session_id` on the same server.
    pub async fn coplay(&self, session_id: &str) -> Result<Value> {
        info!("request coplay of session {}", session_id);
        let route = self
            .api
            .resource(Method::Get, &["sessions", session_id, "relationships", "coplay"])
            .query("include", "identifier,server,player")
            .query("page[size]", COPLAY_PAGE_SIZE);
        self.api.json(route).await
    }
}
