//! Ban management: `/bans` and `/bans-native`.

use log::info;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::http::{Method, RouteBuilder, Transport};
use crate::resources::{Api, PAGE_SIZE};
use crate::types::{Ban, Document};

/// Filters for [`Bans::search`].
///
/// The default lists every ban, expired ones included, without exemptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanSearch {
    /// Free text, typically a Steam id or a player name.
    pub search: Option<String>,
    /// BattleMetrics player id.
    pub player: Option<String>,
    pub ban_list: Option<String>,
    pub server: Option<String>,
    pub organization: Option<String>,
    /// Ids of the users who issued the bans, comma separated.
    pub users: Option<String>,
    pub expired: bool,
    pub exempt: bool,
}

impl Default for BanSearch {
    fn default() -> Self {
        BanSearch {
            search: None,
            player: None,
            ban_list: None,
            server: None,
            organization: None,
            users: None,
            expired: true,
            exempt: false,
        }
    }
}

/// Handle on the ban endpoints.
pub struct Bans<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Bans<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Bans {
            api: Api::new(transport, base_url),
        }
    }

    fn info_route(&self, ban_id: &str) -> RouteBuilder {
        self.api
            .resource(Method::Get, &["bans", ban_id])
            .query(
                "include",
                "server,user,playerIdentifiers,organization,banExemption",
            )
    }

    /// Request `/bans/{ban_id}` with its server, issuer, organization and
    /// exemptions.
    pub async fn info(&self, ban_id: &str) -> Result<Document<Ban>> {
        info!("request ban {}", ban_id);
        self.api.decode(self.info_route(ban_id)).await
    }

    /// List, search and filter bans, most recent first.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use battlemetrics::{Battlemetrics, resources::BanSearch};
    ///
    /// # async fn run() -> battlemetrics::Result<()> {
    /// let client = Battlemetrics::new("your_token")?;
    /// let search = BanSearch {
    ///     search: Some("76561198000000000".to_owned()),
    ///     ..Default::default()
    /// };
    /// let bans = client.bans().search(&search).await?;
    /// println!("{} bans", bans.data.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn search(&self, search: &BanSearch) -> Result<Document<Vec<Ban>>> {
        info!("search bans");
        let route = self
            .api
            .route(Method::Get, "/bans")
            .query("include", "server,user,player,organization")
            .query("filter[expired]", search.expired)
            .query("filter[exempt]", search.exempt)
            .query("sort", "-timestamp")
            .query("page[size]", PAGE_SIZE)
            .query_opt("filter[organization]", search.organization.as_ref())
            .query_opt("filter[player]", search.player.as_ref())
            .query_opt("filter[server]", search.server.as_ref())
            .query_opt("filter[search]", search.search.as_ref())
            .query_opt("filter[banList]", search.ban_list.as_ref())
            .query_opt("filter[users]", search.users.as_ref());

        self.api.decode(route).await
    }

    /// Change the reason and/or the note of a ban.
    ///
    /// The current ban is fetched first and sent back with the changes
    /// applied. With `append`, `note` is added on a new line after the
    /// existing note instead of replacing it.
    ///
    /// # Arguments
    ///
    /// * `ban_id` - The ban to update.
    /// * `reason` - New reason, unchanged when `None`.
    /// * `note` - New note, unchanged when `None`.
    /// * `append` - Append `note` to the existing note.
    pub async fn update(
        &self,
        ban_id: &str,
        reason: Option<&str>,
        note: Option<&str>,
        append: bool,
    ) -> Result<Document<Ban>> {
        info!("update ban {}", ban_id);
        let current = self.api.json(self.info_route(ban_id)).await?;
        let mut data = current
            .get("data")
            .cloned()
            .ok_or_else(|| Error::UnexpectedResponse(format!("ban {} has no data", ban_id)))?;

        let attributes = data
            .get_mut("attributes")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| Error::UnexpectedResponse(format!("ban {} has no attributes", ban_id)))?;

        if let Some(reason) = reason {
            attributes.insert("reason".to_owned(), json!(reason));
        }
        if let Some(note) = note {
            let existing = attributes.get("note").and_then(Value::as_str).unwrap_or("");
            let note = if append && !existing.is_empty() {
                format!("{}\n{}", existing, note)
            } else {
                note.to_owned()
            };
            attributes.insert("note".to_owned(), json!(note));
        }

        let route = self
            .api
            .resource(Method::Patch, &["bans", ban_id])
            .json(json!({ "data": data }));
        self.api.decode(route).await
    }

    /// Delete a ban.
    pub async fn delete(&self, ban_id: &str) -> Result<()> {
        info!("delete ban {}", ban_id);
        self.api
            .send(self.api.resource(Method::Delete, &["bans", ban_id]))
            .await?;
        Ok(())
    }

    /// Native bans (bans pushed to the game server itself), newest first.
    pub async fn native_list(&self, server_id: Option<&str>, ban_id: Option<&str>) -> Result<Value> {
        info!("request native bans");
        let route = self
            .api
            .route(Method::Get, "/bans-native")
            .query("page[size]", PAGE_SIZE)
            .query("include", "server,ban")
            .query("sort", "-createdAt")
            .query("fields[ban]", "reason")
            .query("fields[server]", "name")
            .query("fields[banNative]", "createdAt,reason")
            .query_opt("filter[ban]", ban_id)
            .query_opt("filter[server]", server_id);

        self.api.json(route).await
    }

    /// Force the game server to re-sync a native ban.
    pub async fn native_force_update(&self, native_id: &str) -> Result<Value> {
        info!("force update of native ban {}", native_id);
        let route = self
            .api
            .resource(Method::Post, &["bans-native", native_id, "force-update"]);
        self.api.json(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{DEFAULT_BASE_URL, MockTransport, Normalized};
    use crate::resources::testing::{body, expect_route};
    use mockall::Sequence;
    use mockall::predicate;

    fn ban_json(note: &str) -> Value {
        json!({
            "data": {
                "type": "ban",
                "id": "55",
                "attributes": {"reason": "cheating", "note": note, "orgWide": true},
                "relationships": {"organization": {"data": {"type": "organization", "id": "9"}}}
            },
            "included": [{"type": "server", "id": "1"}]
        })
    }

    #[tokio::test]
    async fn test_info() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/bans/55",
            |route| route.query_value("include").is_some_and(|i| i.contains("banExemption")),
            ban_json("n"),
        );

        let ban = Bans::new(&transport, DEFAULT_BASE_URL).info("55").await.unwrap();

        assert_eq!(ban.data.id, "55");
        assert_eq!(ban.data.attributes.reason, "cheating");
        assert_eq!(ban.included.len(), 1);
    }

    #[tokio::test]
    async fn test_search_default_filters() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Get,
            "/bans",
            |route| {
                route.query_value("filter[expired]").as_deref() == Some("true")
                    && route.query_value("filter[exempt]").as_deref() == Some("false")
                    && route.query_value("sort").as_deref() == Some("-timestamp")
                    && route.query_value("page[size]").as_deref() == Some("100")
                    && route.query_value("filter[search]").as_deref() == Some("7656")
                    && route.query_value("filter[organization]").is_none()
            },
            json!({"data": []}),
        );

        let search = BanSearch {
            search: Some("7656".to_owned()),
            ..Default::default()
        };
        let bans = Bans::new(&transport, DEFAULT_BASE_URL)
            .search(&search)
            .await
            .unwrap();

        assert!(bans.data.is_empty());
    }

    #[tokio::test]
    async fn test_update_appends_note() {
        let mut transport = MockTransport::new();
        let mut sequence = Sequence::new();

        transport
            .expect_request()
            .with(predicate::function(|route: &crate::http::Route| {
                route.method() == Method::Get
            }))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Normalized::Json(ban_json("first"))));
        transport
            .expect_request()
            .with(predicate::function(|route: &crate::http::Route| {
                let body = body(route);
                route.method() == Method::Patch
                    && route.url().path() == "/bans/55"
                    && body["data"]["attributes"]["note"] == "first\nsecond"
                    && body["data"]["attributes"]["reason"] == "aimbot"
                    && body.get("included").is_none()
            }))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(Normalized::Json(ban_json("first\nsecond"))));

        let ban = Bans::new(&transport, DEFAULT_BASE_URL)
            .update("55", Some("aimbot"), Some("second"), true)
            .await
            .unwrap();

        assert_eq!(ban.data.attributes.note.as_deref(), Some("first\nsecond"));
    }

    #[tokio::test]
    async fn test_update_replaces_note() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(predicate::function(|route: &crate::http::Route| {
                route.method() == Method::Get
            }))
            .times(1)
            .returning(|_| Ok(Normalized::Json(ban_json("first"))));
        transport
            .expect_request()
            .with(predicate::function(|route: &crate::http::Route| {
                let body = body(route);
                route.method() == Method::Patch
                    && body["data"]["attributes"]["note"] == "second"
                    && body["data"]["attributes"]["reason"] == "cheating"
            }))
            .times(1)
            .returning(|_| Ok(Normalized::Json(ban_json("second"))));

        Bans::new(&transport, DEFAULT_BASE_URL)
            .update("55", None, Some("second"), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_request()
            .with(predicate::function(|route: &crate::http::Route| {
                route.method() == Method::Delete && route.url().path() == "/bans/55"
            }))
            .times(1)
            .returning(|_| Ok(Normalized::Empty));

        Bans::new(&transport, DEFAULT_BASE_URL)
            .delete("55")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_propagates_errors() {
        let mut transport = MockTransport::new();
        transport.expect_request().times(1).returning(|_| {
            Err(Error::Http {
                status: 404,
                message: "not found".to_owned(),
                raw_body: None,
            })
        });

        let error = Bans::new(&transport, DEFAULT_BASE_URL)
            .delete("55")
            .await
            .unwrap_err();

        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_native_force_update() {
        let mut transport = MockTransport::new();
        expect_route(
            &mut transport,
            Method::Post,
            "/bans-native/abc/force-update",
            |_| true,
            json!({"data": null}),
        );

        Bans::new(&transport, DEFAULT_BASE_URL)
            .native_force_update("abc")
            .await
            .unwrap();
    }
}
