//! Games and their server features.

use log::info;
use serde_json::Value;

use crate::error::Result;
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE};

/// Handle on `/games` and `/game-features`.
pub struct GameInfo<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> GameInfo<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        GameInfo {
            api: Api::new(transport, base_url),
        }
    }

    /// Server features (map size, group limit...) usable as
    /// [`ServerSearch::features`](crate::resources::ServerSearch::features).
    pub async fn features(&self, game: Option<&str>) -> Result<Value> {
        info!("request game features");
        let route = self
            .api
            .route(Method::Get, "/game-features")
            .query("page[size]", PAGE_SIZE)
            .query_opt("filter[game]", game);
        self.api.json(route).await
    }

    /// Values seen for a feature, sorted by `players` (default) or `count`.
    pub async fn feature_options(&self, feature_id: &str, sort: Option<&str>) -> Result<Value> {
        info!("request options of game feature {}", feature_id);
        let route = self
            .api
            .resource(Method::Get, &["game-features", feature_id, "relationships", "options"])
            .query("page[size]", PAGE_SIZE)
            .query("sort", sort.unwrap_or("players"));
        self.api.json(route).await
    }

    /// Games known to BattleMetrics. `fields` restricts the returned
    /// attributes.
    pub async fn list(&self, fields: Option<&str>) -> Result<Value> {
        info!("request games");
        let route = self
            .api
            .route(Method::Get, "/games")
            .query("page[size]", PAGE_SIZE)
            .query_opt("fields[game]", fields);
        self.api.json(route).await
    }

    pub async fn info(&self, game_id: &str, fields: Option<&str>) -> Result<Value> {
        info!("request game {}", game_id);
        let route = self
            .api
            .resource(Method::Get, &["games", game_id])
            .query("page[size]", PAGE_SIZE)
            .query_opt("fields[game]", fields);
        self.api.json(route).await
    }
}
