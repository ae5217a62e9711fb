//! Game servers: `/servers`.

use chrono::TimeDelta;
use log::info;
use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE, linkage};
use crate::types::{Document, Server};
use crate::utils::TimeRange;

/// Filters for [`Servers::search`].
///
/// The default lists online servers with RCON, best ranked first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSearch {
    pub search: Option<String>,
    /// Two letter country codes, any of which matches.
    pub countries: Vec<String>,
    pub game: Option<String>,
    /// Server ids to leave out, comma separated.
    pub blacklist: Option<String>,
    /// Server ids to keep, comma separated.
    pub whitelist: Option<String>,
    pub organization: Option<String>,
    pub rcon: bool,
    /// Online servers when set, offline, dead and invalid ones otherwise.
    pub online: bool,
    /// Game feature filters as `(feature id, value)`, see
    /// [`GameInfo::features`](crate::resources::GameInfo::features).
    pub features: Vec<(String, String)>,
    pub page_size: u32,
}

impl Default for ServerSearch {
    fn default() -> Self {
        ServerSearch {
            search: None,
            countries: Vec::new(),
            game: None,
            blacklist: None,
            whitelist: None,
            organization: None,
            rcon: true,
            online: true,
            features: Vec::new(),
            page_size: PAGE_SIZE,
        }
    }
}

/// Changes sent by [`Servers::update`]. Only the fields set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerUpdate {
    pub ip: Option<String>,
    /// DNS name players connect to.
    pub address: Option<String>,
    pub port: Option<u16>,
    pub query_port: Option<u16>,
    pub rcon_port: Option<u16>,
    pub rcon_password: Option<String>,
    pub private: Option<bool>,
    /// Ban list applied to the server by default.
    pub default_ban_list: Option<String>,
}

impl ServerUpdate {
    fn data(&self, server_id: &str) -> Value {
        let mut attributes = Map::new();
        let fields = [
            ("ip", self.ip.as_ref().map(|v| json!(v))),
            ("address", self.address.as_ref().map(|v| json!(v))),
            ("port", self.port.map(|v| json!(v))),
            ("portQuery", self.query_port.map(|v| json!(v))),
            ("portRCON", self.rcon_port.map(|v| json!(v))),
            ("rconPassword", self.rcon_password.as_ref().map(|v| json!(v))),
            ("private", self.private.map(Value::Bool)),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                attributes.insert(key.to_owned(), value);
            }
        }

        let mut data = json!({"type": "server", "id": server_id, "attributes": attributes});
        if let Some(ban_list) = &self.default_ban_list {
            data["relationships"] = json!({"defaultBanList": linkage("banList", ban_list)});
        }
        data
    }
}

/// Handle on the server endpoints.
pub struct Servers<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Servers<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Servers {
            api: Api::new(transport, base_url),
        }
    }

    /// Request `/servers/{server_id}` with players, sessions, uptime and
    /// organization details.
    pub async fn info(&self, server_id: &str) -> Result<Document<Server>> {
        info!("request server {}", server_id);
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id])
            .query(
                "include",
                "player,identifier,session,serverEvent,uptime:7,uptime:30,uptime:90,\
                 serverGroup,serverDescription,organization,orgDescription,orgGroupDescription",
            );
        self.api.decode(route).await
    }

    /// List, search and filter servers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use battlemetrics::{Battlemetrics, resources::ServerSearch};
    ///
    /// # async fn run() -> battlemetrics::Result<()> {
    /// let client = Battlemetrics::new("your_token")?;
    /// let search = ServerSearch {
    ///     game: Some("rust".to_owned()),
    ///     countries: vec!["FR".to_owned(), "DE".to_owned()],
    ///     rcon: false,
    ///     ..Default::default()
    /// };
    /// for server in client.servers().search(&search).await?.data {
    ///     println!("{} ({} players)", server.attributes.name, server.attributes.players);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, search: &ServerSearch) -> Result<Document<Vec<Server>>> {
        info!("search servers");
        let mut route = self
            .api
            .route(Method::Get, "/servers")
            .query("page[size]", search.page_size)
            .query("include", "serverGroup")
            .query("filter[rcon]", search.rcon);
        route = if search.online {
            route
                .query("filter[status]", "online")
                .query("sort", "-rank")
        } else {
            route.query("filter[status]", "offline,dead,invalid")
        };
        route = route
            .query_opt("filter[search]", search.search.as_ref())
            .query_opt("filter[game]", search.game.as_ref())
            .query_opt("filter[ids][blacklist]", search.blacklist.as_ref())
            .query_opt("filter[ids][whitelist]", search.whitelist.as_ref())
            .query_opt("filter[organizations]", search.organization.as_ref());
        for (index, country) in search.countries.iter().enumerate() {
            route = route.query(&format!("filter[countries][or][{}]", index), country);
        }
        for (feature, value) in &search.features {
            route = route.query(&format!("filter[features][{}]", feature), value);
        }

        self.api.decode(route).await
    }

    /// Add a server to BattleMetrics.
    pub async fn create(
        &self,
        ip: &str,
        port: u16,
        query_port: u16,
        game: &str,
    ) -> Result<Document<Server>> {
        info!("create server {}:{}", ip, port);
        let route = self.api.route(Method::Post, "/servers").json(json!({
            "data": {
                "type": "server",
                "attributes": {
                    "ip": ip,
                    "port": port.to_string(),
                    "portQuery": query_port.to_string()
                },
                "relationships": {"game": {"data": {"type": "game", "id": game}}}
            }
        }));
        self.api.decode(route).await
    }

    /// Change the connection details or settings of a server.
    pub async fn update(&self, server_id: &str, update: &ServerUpdate) -> Result<Document<Server>> {
        info!("update server {}", server_id);
        let route = self
            .api
            .resource(Method::Patch, &["servers", server_id])
            .json(json!({ "data": update.data(server_id) }));
        self.api.decode(route).await
    }

    /// Give BattleMetrics RCON access to a server.
    pub async fn enable_rcon(&self, server_id: &str, port: u16, password: &str) -> Result<Value> {
        info!("enable rcon of server {}", server_id);
        let route = self
            .api
            .resource(Method::Post, &["servers", server_id, "rcon"])
            .json(json!({
                "data": {
                    "type": "server",
                    "id": server_id,
                    "attributes": {"portRCON": port, "rconPassword": password}
                }
            }));
        self.api.json(route).await
    }

    pub async fn connect_rcon(&self, server_id: &str) -> Result<Value> {
        info!("connect rcon of server {}", server_id);
        let route = self
            .api
            .resource(Method::Delete, &["servers", server_id, "rcon", "connect"]);
        self.api.json(route).await
    }

    pub async fn disconnect_rcon(&self, server_id: &str) -> Result<Value> {
        info!("disconnect rcon of server {}", server_id);
        let route = self
            .api
            .resource(Method::Delete, &["servers", server_id, "rcon", "disconnect"]);
        self.api.json(route).await
    }

    /// Run a raw console command through RCON, e.g. `kick <steamid>`.
    pub async fn console_command(&self, server_id: &str, command: &str) -> Result<Value> {
        info!("run console command on server {}", server_id);
        self.rcon(
            server_id,
            json!({"command": "raw", "options": {"raw": command}}),
        )
        .await
    }

    /// Say something in the global chat of a Rust server as `sender`.
    pub async fn send_chat(&self, server_id: &str, message: &str, sender: &str) -> Result<Value> {
        info!("send chat message on server {}", server_id);
        self.rcon(
            server_id,
            json!({
                "command": "rust:globalChat",
                "options": {"message": format!("{}: {}", sender, message)}
            }),
        )
        .await
    }

    async fn rcon(&self, server_id: &str, attributes: Value) -> Result<Value> {
        let route = self
            .api
            .resource(Method::Post, &["servers", server_id, "command"])
            .json(json!({"data": {"type": "rconCommand", "attributes": attributes}}));
        self.api.json(route).await
    }

    /// Ask BattleMetrics to refresh the server's information.
    pub async fn force_update(&self, server_id: &str) -> Result<Value> {
        info!("force update of server {}", server_id);
        let route = self
            .api
            .resource(Method::Post, &["servers", server_id, "force-update"]);
        self.api.json(route).await
    }

    /// Player count data points. Defaults to the last day at `raw`
    /// resolution (`raw`, `30`, `60` or `1440` minutes).
    pub async fn player_count_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
        resolution: Option<&str>,
    ) -> Result<Value> {
        info!("request player count history of server {}", server_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, "player-count-history"])
            .query("start", range.start_param())
            .query("stop", range.end_param())
            .query("resolution", resolution.unwrap_or("raw"));
        self.api.json(route).await
    }

    pub async fn rank_history(&self, server_id: &str, range: Option<TimeRange>) -> Result<Value> {
        info!("request rank history of server {}", server_id);
        self.history(server_id, "rank-history", range).await
    }

    pub async fn time_played_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request time played history of server {}", server_id);
        self.history(server_id, "time-played-history", range).await
    }

    /// Rank of the server within its group. The server must belong to one.
    pub async fn group_rank_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request group rank history of server {}", server_id);
        self.history(server_id, "group-rank-history", range).await
    }

    /// Players seen on the server for the first time.
    pub async fn first_time_played_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request first time history of server {}", server_id);
        self.history(server_id, "first-time-history", range).await
    }

    pub async fn unique_players_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request unique player history of server {}", server_id);
        self.history(server_id, "unique-player-history", range).await
    }

    /// Periods the server did not answer queries. Kept 89 days.
    ///
    /// # Arguments
    ///
    /// * `uptime` - Uptime window included, `7`, `30` or `90` (default) days.
    pub async fn outage_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
        uptime: Option<&str>,
    ) -> Result<Value> {
        info!("request outage history of server {}", server_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, "relationships", "outages"])
            .query("page[size]", 90u32)
            .query("filter[range]", range.period())
            .query("include", format!("uptime:{}", uptime.unwrap_or("90")));
        self.api.json(route).await
    }

    /// Seconds offline per period, `60` (default) or `1440` minutes.
    pub async fn downtime_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
        resolution: Option<&str>,
    ) -> Result<Value> {
        info!("request downtime history of server {}", server_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, "relationships", "downtime"])
            .query("start", range.start_param())
            .query("stop", range.end_param())
            .query("resolution", resolution.unwrap_or("60"));
        self.api.json(route).await
    }

    /// Sessions on the server with their players.
    pub async fn session_history(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request session history of server {}", server_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, "relationships", "sessions"])
            .query("start", range.start_param())
            .query("stop", range.end_param())
            .query("include", "player");
        self.api.json(route).await
    }

    async fn history(
        &self,
        server_id: &str,
        kind: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, kind])
            .query("start", range.start_param())
            .query("stop", range.end_param());
        self.api.json(route).await
    }

    /// Time played leaderboard over `range`, last day by default.
    pub async fn leaderboard(
        &self,
        server_id: &str,
        range: Option<TimeRange>,
        player_id: Option<&str>,
    ) -> Result<Value> {
        info!("request leaderboard of server {}", server_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["servers", server_id, "relationships", "leaderboards", "time"])
            .query("page[size]", PAGE_SIZE)
            .query("filter[period]", range.period())
            .query("fields[leaderboardPlayer]", "name,value")
            .query_opt("filter[player]", player_id);
        self.api.json(route).await
    }

    /// Remove the RCON connection of a server.
    pub async fn delete_rcon(&self, server_id: &str) -> Result<()> {
        info!("delete rcon of server {}", server_id);
        self.api
            .send(
                self.api
                    .resource(Method::Delete, &["servers", server_id, "rcon"]),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{DEFAULT_BASE_URL, MockTransport};
    use crate::resources::testing::{body, expect_route};

    #[tokio::test]
    async fn test_search_defaults() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/servers",
            |route| {
                route.query_value("filter[rcon]").as_deref() == Some("true")
                    && route.query_value("filter[status]").as_deref() == Some("online")
                    && route.query_value("sort").as_deref() == Some("-rank")
                    && route.query_value("page[size]").as_deref() == Some("100")
                    && route.query_value("filter[game]").is_none()
            },
            json!({"data": [{"type": "server", "id": "1", "attributes": {"name": "Rust EU", "players": 50}}]}),
        );

        let servers = Servers::new(&transport, DEFAULT_BASE_URL)
            .search(&ServerSearch::default())
            .await
            .unwrap();

        assert_eq!(servers.data[0].attributes.players, 50);
    }

    #[tokio::test]
    async fn test_search_offline_with_countries_and_features() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/servers",
            |route| {
                route.query_value("filter[status]").as_deref() == Some("offline,dead,invalid")
                    && route.query_value("sort").is_none()
                    && route.query_value("filter[countries][or][0]").as_deref() == Some("FR")
                    && route.query_value("filter[countries][or][1]").as_deref() == Some("DE")
                    && route.query_value("filter[features][abc]").as_deref() == Some("1:8")
            },
            json!({"data": []}),
        );

        let search = ServerSearch {
            online: false,
            countries: vec!["FR".to_owned(), "DE".to_owned()],
            features: vec![("abc".to_owned(), "1:8".to_owned())],
            ..Default::default()
        };
        Servers::new(&transport, DEFAULT_BASE_URL)
            .search(&search)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_chat() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/servers/1/command",
            |route| {
                body(route)
                    == json!({
                        "data": {
                            "type": "rconCommand",
                            "attributes": {
                                "command": "rust:globalChat",
                                "options": {"message": "Admin: restart in 5"}
                            }
                        }
                    })
            },
            json!({"data": {"type": "rconCommandResult"}}),
        );

        Servers::new(&transport, DEFAULT_BASE_URL)
            .send_chat("1", "restart in 5", "Admin")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_console_command() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/servers/1/command",
            |route| body(route)["data"]["attributes"]["options"]["raw"] == "kick 7656",
            json!({"data": {}}),
        );

        Servers::new(&transport, DEFAULT_BASE_URL)
            .console_command("1", "kick 7656")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_player_count_history_default_resolution() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/servers/1/player-count-history",
            |route| {
                route.query_value("resolution").as_deref() == Some("raw")
                    && route.query_value("start").is_some()
                    && route.query_value("stop").is_some()
            },
            json!({"data": []}),
        );

        Servers::new(&transport, DEFAULT_BASE_URL)
            .player_count_history("1", None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_sends_ports_as_strings() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/servers",
            |route| {
                let body = body(route);
                body["data"]["attributes"]["port"] == "28015"
                    && body["data"]["attributes"]["portQuery"] == "28016"
                    && body["data"]["relationships"]["game"]["data"]["id"] == "rust"
            },
            json!({"data": {"type": "server", "id": "1", "attributes": {"name": "new"}}}),
        );

        Servers::new(&transport, DEFAULT_BASE_URL)
            .create("1.2.3.4", 28015, 28016, "rust")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_extra_histories_share_the_window() {
        let mut transport = MockTransport::new();
        for path in [
            "/servers/1/group-rank-history",
            "/servers/1/first-time-history",
            "/servers/1/unique-player-history",
        ] {
            expect_route(
                &mut transport,
                Method::Get,
                path,
                |route| route.query_value("start").is_some() && route.query_value("stop").is_some(),
                json!({"data": []}),
            );
        }

        let servers = Servers::new(&transport, DEFAULT_BASE_URL);
        servers.group_rank_history("1", None).await.unwrap();
        servers.first_time_played_history("1", None).await.unwrap();
        servers.unique_players_history("1", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_outage_and_downtime_defaults() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/servers/1/relationships/outages",
            |route| {
                route.query_value("include").as_deref() == Some("uptime:90")
                    && route.query_value("page[size]").as_deref() == Some("90")
                    && route.query_value("filter[range]").is_some_and(|r| r.contains(':'))
            },
            json!({"data": []}),
        );
        expect_route(
            &mut transport,
            Method::Get,
            "/servers/1/relationships/downtime",
            |route| route.query_value("resolution").as_deref() == Some("60"),
            json!({"data": []}),
        );

        let servers = Servers::new(&transport, DEFAULT_BASE_URL);
        servers.outage_history("1", None, None).await.unwrap();
        servers.downtime_history("1", None, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_rcon_connection_routes() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/servers/1/rcon",
            |route| {
                let attributes = body(route)["data"]["attributes"].clone();
                attributes["portRCON"] == 28016 && attributes["rconPassword"] == "secret"
            },
            json!({"data": {"type": "server", "id": "1"}}),
        );
        expect_route(
            &mut transport,
            Method::Delete,
            "/servers/1/rcon/connect",
            |_| true,
            json!({}),
        );
        expect_route(
            &mut transport,
            Method::Delete,
            "/servers/1/rcon/disconnect",
            |_| true,
            json!({}),
        );

        let servers = Servers::new(&transport, DEFAULT_BASE_URL);
        servers.enable_rcon("1", 28016, "secret").await.unwrap();
        servers.connect_rcon("1").await.unwrap();
        servers.disconnect_rcon("1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_sends_only_set_fields() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Patch,
            "/servers/1",
            |route| {
                body(route)
                    == json!({
                        "data": {
                            "type": "server",
                            "id": "1",
                            "attributes": {"address": "play.example.com", "private": true},
                            "relationships": {
                                "defaultBanList": {"data": {"type": "banList", "id": "bl-1"}}
                            }
                        }
                    })
            },
            json!({"data": {"type": "server", "id": "1", "attributes": {"name": "EU"}}}),
        );

        let update = ServerUpdate {
            address: Some("play.example.com".to_owned()),
            private: Some(true),
            default_ban_list: Some("bl-1".to_owned()),
            ..Default::default()
        };
        let server = Servers::new(&transport, DEFAULT_BASE_URL)
            .update("1", &update)
            .await
            .unwrap();

        assert_eq!(server.data.attributes.name, "EU");
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_their_segment() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/servers/1%2Frcon%3Fx=1",
            |route| route.query_value("x").is_none(),
            json!({"data": {"type": "server", "id": "1", "attributes": {"name": "EU"}}}),
        );

        Servers::new(&transport, DEFAULT_BASE_URL)
            .info("1/rcon?x=1")
            .await
            .unwrap();
    }
}
