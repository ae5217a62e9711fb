//! Player lookup and moderation: `/players`.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE, linkage};
use crate::types::{Ban, Document, Note, Player};
use crate::utils::{TimeRange, expires_in, format_time};

/// Identifier types attached to a new ban.
const BANNED_IDENTIFIER_TYPES: [&str; 2] = ["steamID", "BEGUID"];

/// Filters for [`Players::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSearch {
    pub search: Option<String>,
    /// Only players currently online.
    pub online: bool,
    /// Server ids, comma separated.
    pub servers: Option<String>,
    pub organization: Option<String>,
    /// Public results only, as opposed to the RCON view of the token's
    /// organizations.
    pub public: bool,
    /// Player flag id.
    pub flag: Option<String>,
}

/// Filters for [`Players::coplay`]. Values are comma separated ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoplayFilter {
    pub players: Option<String>,
    pub organizations: Option<String>,
    pub servers: Option<String>,
}

/// A ban to create with [`Players::add_ban`].
///
/// The banned player is given either by BattleMetrics id or by Steam id.
///
/// # Examples
///
/// ```
/// use battlemetrics::resources::NewBan;
///
/// let ban = NewBan::new("cheating", "org-1", "list-1", "server-1")
///     .note("caught on stream")
///     .steam_id("76561198000000000");
/// assert!(ban.org_wide);
/// assert!(ban.expires.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewBan {
    /// Reason shown to the player.
    pub reason: String,
    /// Staff-only note.
    pub note: String,
    pub organization_id: String,
    pub ban_list_id: String,
    pub server_id: String,
    /// `None` for a permanent ban.
    pub expires: Option<DateTime<Utc>>,
    pub org_wide: bool,
    pub battlemetrics_id: Option<String>,
    pub steam_id: Option<String>,
}

impl NewBan {
    /// A permanent, organization-wide ban.
    pub fn new(reason: &str, organization_id: &str, ban_list_id: &str, server_id: &str) -> Self {
        NewBan {
            reason: reason.to_owned(),
            note: String::new(),
            organization_id: organization_id.to_owned(),
            ban_list_id: ban_list_id.to_owned(),
            server_id: server_id.to_owned(),
            expires: None,
            org_wide: true,
            battlemetrics_id: None,
            steam_id: None,
        }
    }

    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_owned();
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Expire the ban after a duration such as `30m`, `12h` or `7d`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the duration does not parse.
    pub fn expires_in(self, duration: &str) -> Result<Self> {
        Ok(self.expires(expires_in(duration)?))
    }

    pub fn org_wide(mut self, org_wide: bool) -> Self {
        self.org_wide = org_wide;
        self
    }

    /// BattleMetrics id of the player.
    pub fn player(mut self, battlemetrics_id: &str) -> Self {
        self.battlemetrics_id = Some(battlemetrics_id.to_owned());
        self
    }

    pub fn steam_id(mut self, steam_id: &str) -> Self {
        self.steam_id = Some(steam_id.to_owned());
        self
    }
}

/// Handle on the player endpoints.
pub struct Players<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Players<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Players {
            api: Api::new(transport, base_url),
        }
    }

    /// Request `/players/{player_id}` with identifiers, servers, counters
    /// and flags included.
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
    /// # Ok(())
    /// # }
    /// ```
    pub async fn info(&self, player_id: &str) -> Result<Document<Player>> {
        info!("request player {}", player_id);
        let route = self
            .api
            .resource(Method::Get, &["players", player_id])
            .query(
                "include",
                "identifier,server,playerCounter,playerFlag,flagPlayer",
            );
        self.api.decode(route).await
    }

    /// List players matching the filters.
    pub async fn search(&self, search: &PlayerSearch) -> Result<Document<Vec<Player>>> {
        info!("search players");
        let route = self
            .api
            .route(Method::Get, "/players")
            .query("page[size]", PAGE_SIZE)
            .query("include", "server,identifier,playerFlag,flagPlayer")
            .query_opt("filter[search]", search.search.as_ref())
            .query_opt("filter[server]", search.servers.as_ref())
            .query_opt("filter[organization]", search.organization.as_ref())
            .query_opt("filter[playerFlags]", search.flag.as_ref())
            .query("filter[online]", search.online)
            .query("filter[public]", search.public);
        self.api.decode(route).await
    }

    /// Identifiers of a player and the players sharing them.
    pub async fn identifiers(&self, player_id: &str) -> Result<Value> {
        info!("request related identifiers of player {}", player_id);
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "relationships", "related-identifiers"])
            .query("include", "player,identifier")
            .query("page[size]", PAGE_SIZE);
        self.api.json(route).await
    }

    /// Time played by a player on a server, per day.
    ///
    /// Defaults to the window from five days ago to tomorrow.
    pub async fn play_history(
        &self,
        player_id: &str,
        server_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Value> {
        info!("request play history of player {} on {}", player_id, server_id);
        let range =
            range.unwrap_or_else(|| TimeRange::around_now(TimeDelta::days(5), TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "time-played-history", server_id])
            .query("start", range.start_param())
            .query("stop", range.end_param());
        self.api.json(route).await
    }

    /// Server specific information about a player.
    pub async fn server_info(&self, player_id: &str, server_id: &str) -> Result<Value> {
        info!("request server {} info of player {}", server_id, player_id);
        let route = self.api.resource(Method::Get, &["players", player_id, "servers", server_id]);
        self.api.json(route).await
    }

    /// Search players by identifier. Rate limited to one call per second.
    ///
    /// # Arguments
    ///
    /// * `identifier` - The identifier value, e.g. a Steam id.
    /// * `identifier_type` - `steamID`, `BEGUID`, `ip`, `name`...
    pub async fn match_identifiers(
        &self,
        identifier: &str,
        identifier_type: Option<&str>,
    ) -> Result<Value> {
        info!("match identifier {}", identifier);
        let route = self
            .api
            .route(Method::Post, "/players/match")
            .query("include", "player,server,identifier,playerFlag,flagPlayer")
            .json(identifier_query(identifier, identifier_type));
        self.api.json(route).await
    }

    /// Like [`Players::match_identifiers`] with a higher rate limit and
    /// fewer details.
    pub async fn quick_match(&self, identifier: &str, identifier_type: &str) -> Result<Value> {
        info!("quick match identifier {}", identifier);
        let route = self
            .api
            .route(Method::Post, "/players/quick-match")
            .json(identifier_query(identifier, Some(identifier_type)));
        self.api.json(route).await
    }

    /// Sessions of a player, optionally limited to a server or an
    /// organization.
    pub async fn session_history(
        &self,
        player_id: &str,
        server_id: Option<&str>,
        organization_id: Option<&str>,
    ) -> Result<Value> {
        info!("request session history of player {}", player_id);
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "relationships", "sessions"])
            .query("include", "identifier,server")
            .query("page[size]", PAGE_SIZE)
            .query_opt("filter[servers]", server_id)
            .query_opt("filter[organizations]", organization_id);
        self.api.json(route).await
    }

    /// Flags on a player's profile.
    pub async fn flags(&self, player_id: &str) -> Result<Value> {
        info!("request flags of player {}", player_id);
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "relationships", "flags"])
            .query("page[size]", PAGE_SIZE)
            .query("include", "playerFlag");
        self.api.json(route).await
    }

    /// Put a flag on a player. Without `flag_id` the API creates a new flag.
    pub async fn add_flag(&self, player_id: &str, flag_id: Option<&str>) -> Result<Value> {
        info!("add flag to player {}", player_id);
        let mut flag = json!({"type": "playerFlag"});
        if let Some(flag_id) = flag_id {
            flag["id"] = json!(flag_id);
        }

        let route = self
            .api
            .resource(Method::Post, &["players", player_id, "relationships", "flags"])
            .json(json!({ "data": [flag] }));
        self.api.json(route).await
    }

    /// Remove a flag from a player.
    pub async fn remove_flag(&self, player_id: &str, flag_id: &str) -> Result<()> {
        info!("remove flag {} from player {}", flag_id, player_id);
        let route = self.api.resource(
            Method::Delete,
            &["players", player_id, "relationships", "flags", flag_id],
        );
        self.api.send(route).await?;
        Ok(())
    }

    /// Players who played with `player_id`. Defaults to the last day.
    pub async fn coplay(
        &self,
        player_id: &str,
        range: Option<TimeRange>,
        filter: &CoplayFilter,
    ) -> Result<Value> {
        info!("request coplay of player {}", player_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "relationships", "coplay"])
            .query("filter[period]", range.period())
            .query("page[size]", PAGE_SIZE)
            .query("fields[coplayrelation]", "name,duration")
            .query_opt("filter[players]", filter.players.as_ref())
            .query_opt("filter[organizations]", filter.organizations.as_ref())
            .query_opt("filter[servers]", filter.servers.as_ref());
        self.api.json(route).await
    }

    /// Attach a note to a player.
    pub async fn add_note(
        &self,
        player_id: &str,
        organization_id: &str,
        note: &str,
        shared: bool,
    ) -> Result<Document<Note>> {
        info!("add note to player {}", player_id);
        let route = self
            .api
            .resource(Method::Post, &["players", player_id, "relationships", "notes"])
            .json(json!({
                "data": {
                    "type": "playerNote",
                    "attributes": {"note": note, "shared": shared},
                    "relationships": {"organization": linkage("organization", organization_id)}
                }
            }));
        self.api.decode(route).await
    }

    /// Ban a player.
    ///
    /// A Steam id is first resolved to a BattleMetrics player. The player's
    /// Steam and BattlEye identifiers are attached to the ban.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the ban names neither a BattleMetrics
    /// id nor a Steam id. Nothing is sent in that case.
    pub async fn add_ban(&self, ban: &NewBan) -> Result<Document<Ban>> {
        let player_id = match (&ban.battlemetrics_id, &ban.steam_id) {
            (Some(player_id), _) => player_id.clone(),
            (None, Some(steam_id)) => self.resolve_steam_id(steam_id).await?,
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "a ban needs a BattleMetrics id or a Steam id".to_owned(),
                ));
            }
        };
        info!("ban player {}", player_id);

        let player = self.info(&player_id).await?;
        let identifiers: Vec<Value> = player
            .included_of("identifier")
            .filter(|identifier| {
                identifier
                    .pointer("/attributes/type")
                    .and_then(Value::as_str)
                    .is_some_and(|kind| BANNED_IDENTIFIER_TYPES.contains(&kind))
            })
            .filter_map(|identifier| identifier.get("id").and_then(Value::as_str))
            .map(|id| id.parse::<u64>().map_or_else(|_| json!(id), |id| json!(id)))
            .collect();
        debug!("ban of player {} covers identifiers {:?}", player_id, identifiers);

        let uid: String = Uuid::new_v4().to_string().chars().take(14).collect();
        let route = self.api.route(Method::Post, "/bans").json(json!({
            "data": {
                "type": "ban",
                "attributes": {
                    "uid": uid,
                    "reason": ban.reason,
                    "note": ban.note,
                    "expires": ban.expires.as_ref().map(format_time),
                    "identifiers": identifiers,
                    "orgWide": ban.org_wide,
                    "autoAddEnabled": true,
                    "nativeEnabled": null
                },
                "relationships": {
                    "organization": linkage("organization", &ban.organization_id),
                    "server": linkage("server", &ban.server_id),
                    "player": linkage("player", &player_id),
                    "banList": linkage("banList", &ban.ban_list_id)
                }
            }
        }));
        self.api.decode(route).await
    }

    async fn resolve_steam_id(&self, steam_id: &str) -> Result<String> {
        let matched = self.match_identifiers(steam_id, Some("steamID")).await?;
        matched
            .pointer("/data/0/relationships/player/data/id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("no player matches Steam id {}", steam_id))
            })
    }
}

fn identifier_query(identifier: &str, identifier_type: Option<&str>) -> Value {
    json!({
        "data": [{
            "type": "identifier",
            "attributes": {"type": identifier_type, "identifier": identifier}
        }]
    })
}
