//! Organizations, their friends and statistics.

use chrono::TimeDelta;
use log::info;
use serde_json::{Value, json};

use crate::error::Result;
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE, linkage};
use crate::utils::TimeRange;

/// Filters for [`Organizations::friends`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendFilter {
    pub accepted: bool,
    pub origin: bool,
    pub reciprocated: bool,
    pub name: Option<String>,
}

impl Default for FriendFilter {
    fn default() -> Self {
        FriendFilter {
            accepted: true,
            origin: true,
            reciprocated: true,
            name: None,
        }
    }
}

/// What an organization shares with a friend organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendSharing {
    /// Identifier types shared, e.g. `steamID`, `ip`.
    pub identifiers: Vec<String>,
    pub notes: bool,
    /// Player flag ids shared.
    pub flags: Vec<String>,
}

impl Default for FriendSharing {
    fn default() -> Self {
        FriendSharing {
            identifiers: vec!["steamID".to_owned()],
            notes: true,
            flags: Vec::new(),
        }
    }
}

impl FriendSharing {
    fn shared_flags(&self) -> Value {
        let flags: Vec<Value> = self
            .flags
            .iter()
            .map(|id| json!({"type": "playerFlag", "id": id}))
            .collect();
        json!({ "data": flags })
    }
}

/// Filters for [`Organizations::command_stats`]. Ids are comma separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStatsFilter {
    /// Defaults to the last day.
    pub range: Option<TimeRange>,
    pub summary: bool,
    pub users: Option<String>,
    pub commands: Option<String>,
    pub servers: Option<String>,
}

/// Handle on the organization endpoints.
pub struct Organizations<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Organizations<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Organizations {
            api: Api::new(transport, base_url),
        }
    }

    pub async fn info(&self, organization_id: &str) -> Result<Value> {
        info!("request organization {}", organization_id);
        let route = self
            .api
            .resource(Method::Get, &["organizations", organization_id])
            .query("include", "organizationUser,banList,role,organizationStats");
        self.api.json(route).await
    }

    /// Organizations the token's user belongs to.
    pub async fn list(&self) -> Result<Value> {
        info!("request organizations");
        let route = self
            .api
            .route(Method::Get, "/organizations")
            .query("page[size]", PAGE_SIZE)
            .query("include", "organizationUser,banList,organizationStats");
        self.api.json(route).await
    }

    /// Where the organization's players come from. Defaults to the last
    /// day; the API accepts at most 90 days.
    pub async fn player_stats(
        &self,
        organization_id: &str,
        range: Option<TimeRange>,
        game: Option<&str>,
    ) -> Result<Value> {
        info!("request player stats of organization {}", organization_id);
        let range = range.unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let route = self
            .api
            .resource(Method::Get, &["organizations", organization_id, "stats", "players"])
            .query("filter[range]", range.period())
            .query_opt("filter[game]", game);
        self.api.json(route).await
    }

    pub async fn friends(&self, organization_id: &str, filter: &FriendFilter) -> Result<Value> {
        info!("request friends of organization {}", organization_id);
        let route = self
            .api
            .resource(Method::Get, &["organizations", organization_id, "relationships", "friends"])
            .query("include", "organization")
            .query("filter[accepted]", filter.accepted)
            .query("filter[origin]", filter.origin)
            .query("filter[reciprocated]", filter.reciprocated)
            .query_opt("filter[name]", filter.name.as_ref());
        self.api.json(route).await
    }

    pub async fn friend(&self, organization_id: &str, friend_id: &str) -> Result<Value> {
        info!(
            "request friend {} of organization {}",
            friend_id, organization_id
        );
        let route = self
            .api
            .resource(
                Method::Get,
                &["organizations", organization_id, "relationships", "friends", friend_id],
            )
            .query("include", "organization,playerFlag,organizationStats");
        self.api.json(route).await
    }

    /// Send a friend request to `friend_id`.
    pub async fn create_friend(
        &self,
        organization_id: &str,
        friend_id: &str,
        sharing: &FriendSharing,
    ) -> Result<Value> {
        info!(
            "request friendship of organization {} with {}",
            organization_id, friend_id
        );
        let route = self
            .api
            .resource(
                Method::Post,
                &["organizations", organization_id, "relationships", "friends"],
            )
            .json(json!({
                "data": {
                    "type": "organizationFriend",
                    "attributes": {"identifiers": sharing.identifiers, "notes": sharing.notes},
                    "relationships": {
                        "friend": linkage("organization", friend_id),
                        "flagsShared": sharing.shared_flags()
                    }
                }
            }));
        self.api.json(route).await
    }

    /// Accept or change a friendship.
    pub async fn update_friend(
        &self,
        organization_id: &str,
        friend_id: &str,
        sharing: &FriendSharing,
        accepted: bool,
    ) -> Result<Value> {
        info!(
            "update friend {} of organization {}",
            friend_id, organization_id
        );
        let route = self
            .api
            .resource(
                Method::Patch,
                &["organizations", organization_id, "relationships", "friends", friend_id],
            )
            .json(json!({
                "data": {
                    "type": "organizationFriend",
                    "id": friend_id,
                    "attributes": {
                        "accepted": accepted,
                        "identifiers": sharing.identifiers,
                        "notes": sharing.notes
                    },
                    "relationships": {"flagsShared": sharing.shared_flags()}
                }
            }));
        self.api.json(route).await
    }

    pub async fn delete_friend(&self, organization_id: &str, friend_id: &str) -> Result<()> {
        info!(
            "delete friend {} of organization {}",
            friend_id, organization_id
        );
        let route = self.api.resource(
            Method::Delete,
            &["organizations", organization_id, "relationships", "friends", friend_id],
        );
        self.api.send(route).await?;
        Ok(())
    }

    /// Audit log of the organization: flags, bans, notes and RCON activity.
    pub async fn audit_log(&self, organization_id: &str) -> Result<Value> {
        info!("request audit log of organization {}", organization_id);
        let route = self
            .api
            .route(Method::Get, "/audit-log")
            .query("filter[organizations]", organization_id)
            .query("page[size]", PAGE_SIZE)
            .query(
                "include",
                "flagPlayer,playerFlag,identifier,player,playerCounter,activityMessage,\
                 server,organization,organizationUser",
            );
        self.api.json(route).await
    }

    /// Usage of in-game and RCON commands by the organization's staff.
    pub async fn command_stats(
        &self,
        organization_id: &str,
        filter: &CommandStatsFilter,
    ) -> Result<Value> {
        info!("request command stats of organization {}", organization_id);
        let range = filter
            .range
            .unwrap_or_else(|| TimeRange::last(TimeDelta::days(1)));
        let mut route = self
            .api
            .resource(
                Method::Get,
                &["organizations", organization_id, "relationships", "command-stats"],
            )
            .query("filter[timestamp]", range.period())
            .query_opt("filter[users]", filter.users.as_ref())
            .query_opt("filter[commands]", filter.commands.as_ref())
            .query_opt("filter[servers]", filter.servers.as_ref());
        if filter.summary {
            route = route.query("filter[summary]", true);
        }
        self.api.json(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{DEFAULT_BASE_URL, MockTransport, Normalized, Route};
    use crate::resources::testing::expect_route;
    use crate::resources::testing::body;
    use chrono::{TimeZone, Utc};
    use mockall::predicate;

    #[tokio::test]
    async fn test_friends_default_filter() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/organizations/9/relationships/friends",
            |route| {
                route.query_value("filter[accepted]").as_deref() == Some("true")
                    && route.query_value("filter[origin]").as_deref() == Some("true")
                    && route.query_value("filter[reciprocated]").as_deref() == Some("true")
                    && route.query_value("filter[name]").is_none()
            },
            json!({"data": []}),
        );

        Organizations::new(&transport, DEFAULT_BASE_URL)
            .friends("9", &FriendFilter::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_command_stats_range_and_summary() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/organizations/9/relationships/command-stats",
            |route| {
                route.query_value("filter[timestamp]").as_deref()
                    == Some("2024-03-01T00:00:00Z:2024-03-02T00:00:00Z")
                    && route.query_value("filter[summary]").as_deref() == Some("true")
                    && route.query_value("filter[users]").as_deref() == Some("u-1")
            },
            json!({"data": []}),
        );

        let filter = CommandStatsFilter {
            range: Some(TimeRange::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
            )),
            summary: true,
            users: Some("u-1".to_owned()),
            ..Default::default()
        };
        Organizations::new(&transport, DEFAULT_BASE_URL)
            .command_stats("9", &filter)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_audit_log_filters_organization() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/audit-log",
            |route| route.query_value("filter[organizations]").as_deref() == Some("9"),
            json!({"data": []}),
        );

        Organizations::new(&transport, DEFAULT_BASE_URL)
            .audit_log("9")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_friend() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(predicate::function(|route: &Route| {
                route.method() == Method::Delete
                    && route.url().path() == "/organizations/9/relationships/friends/10"
            }))
            .times(1)
            .returning(|_| Ok(Normalized::Empty));

        Organizations::new(&transport, DEFAULT_BASE_URL)
            .delete_friend("9", "10")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_friend() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/organizations/9/relationships/friends",
            |route| {
                let body = body(route);
                body["data"]["attributes"]
                    == json!({"identifiers": ["steamID", "ip"], "notes": false})
                    && body["data"]["relationships"]["friend"]["data"]["id"] == "10"
                    && body["data"]["relationships"]["flagsShared"]
                        == json!({"data": [{"type": "playerFlag", "id": "f-1"}]})
            },
            json!({"data": {"type": "organizationFriend", "id": "10"}}),
        );

        let sharing = FriendSharing {
            identifiers: vec!["steamID".to_owned(), "ip".to_owned()],
            notes: false,
            flags: vec!["f-1".to_owned()],
        };
        Organizations::new(&transport, DEFAULT_BASE_URL)
            .create_friend("9", "10", &sharing)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_friend_accepts() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Patch,
            "/organizations/9/relationships/friends/10",
            |route| {
                let body = body(route);
                body["data"]["id"] == "10"
                    && body["data"]["attributes"]["accepted"] == true
                    && body["data"]["attributes"]["notes"] == true
                    && body["data"]["relationships"]["flagsShared"] == json!({"data": []})
            },
            json!({"data": {"type": "organizationFriend", "id": "10"}}),
        );

        Organizations::new(&transport, DEFAULT_BASE_URL)
            .update_friend("9", "10", &FriendSharing::default(), true)
            .await
            .unwrap();
    }
}
