//! Ban lists, their invites and exemptions.

use log::info;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::http::{BanRecord, Method, Transport};
use crate::resources::{Api, PAGE_SIZE, linkage};
use crate::types::{BanList, Document};

/// Defaults a ban list applies to the bans it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanListSettings {
    /// `none`, `log` or `kick`.
    pub action: String,
    /// Identifier types banned by default, e.g. `steamID`, `ip`.
    pub default_identifiers: Vec<String>,
    pub default_reasons: Vec<String>,
    pub auto_add: bool,
    /// Also push the bans to the game server.
    pub native: bool,
}

impl Default for BanListSettings {
    fn default() -> Self {
        BanListSettings {
            action: "none".to_owned(),
            default_identifiers: vec!["steamID".to_owned()],
            default_reasons: Vec::new(),
            auto_add: true,
            native: false,
        }
    }
}

impl BanListSettings {
    fn attributes(&self) -> Value {
        json!({
            "action": self.action,
            "defaultIdentifiers": self.default_identifiers,
            "defaultReasons": self.default_reasons,
            "defaultAutoAddEnabled": self.auto_add,
            "defaultNativeEnabled": self.native,
            "nativeBanTTL": null,
            "nativeBanTempMaxExpires": null,
            "nativeBanPermMaxExpires": null
        })
    }
}

/// Changes applied by [`BanLists::update`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BanListUpdate {
    pub name: Option<String>,
    pub action: Option<String>,
    pub default_identifiers: Option<Vec<String>>,
    pub default_reasons: Option<Vec<String>>,
    pub auto_add: Option<bool>,
    pub native: Option<bool>,
}

impl BanListUpdate {
    fn apply(&self, attributes: &mut Map<String, Value>) {
        let changes = [
            ("name", self.name.as_ref().map(|v| json!(v))),
            ("action", self.action.as_ref().map(|v| json!(v))),
            (
                "defaultIdentifiers",
                self.default_identifiers.as_ref().map(|v| json!(v)),
            ),
            (
                "defaultReasons",
                self.default_reasons.as_ref().map(|v| json!(v)),
            ),
            ("defaultAutoAddEnabled", self.auto_add.map(Value::Bool)),
            ("defaultNativeEnabled", self.native.map(Value::Bool)),
        ];
        for (key, value) in changes {
            if let Some(value) = value {
                attributes.insert(key.to_owned(), value);
            }
        }
    }
}

/// What an invited organization may do with a ban list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvitePermissions {
    pub manage: bool,
    pub create: bool,
    pub update: bool,
    pub delete: bool,
}

/// Handle on the ban list endpoints.
pub struct BanLists<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> BanLists<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        BanLists {
            api: Api::new(transport, base_url),
        }
    }

    /// Download the organization's bans in the Rust `bans.cfg` format.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use battlemetrics::Battlemetrics;
    ///
    /// # async fn run() -> battlemetrics::Result<()> {
    /// let client = Battlemetrics::new("your_token")?;
    /// for record in client.ban_lists().export("12345", None).await? {
    ///     println!("{} {}", record.external_id, record.reason);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn export(
        &self,
        organization_id: &str,
        server_id: Option<&str>,
    ) -> Result<Vec<BanRecord>> {
        info!("export bans of organization {}", organization_id);
        let route = self
            .api
            .route(Method::Get, "/bans/export")
            .query("filter[organization]", organization_id)
            .query("format", "rust/bans.cfg")
            .query_opt("filter[server]", server_id);
        self.api.send(route).await?.into_ban_records()
    }

    /// Ban lists the token can see.
    pub async fn list(&self) -> Result<Document<Vec<BanList>>> {
        info!("request ban lists");
        let route = self
            .api
            .route(Method::Get, "/ban-lists")
            .query("include", "server,organization,owner")
            .query("page[size]", PAGE_SIZE);
        self.api.decode(route).await
    }

    pub async fn read(&self, ban_list_id: &str) -> Result<Document<BanList>> {
        info!("request ban list {}", ban_list_id);
        let route = self
            .api
            .resource(Method::Get, &["ban-lists", ban_list_id])
            .query("include", "owner");
        self.api.decode(route).await
    }

    /// Create a ban list owned by `organization_id`.
    pub async fn create(
        &self,
        organization_id: &str,
        name: &str,
        settings: &BanListSettings,
    ) -> Result<Document<BanList>> {
        info!("create ban list {:?}", name);
        let mut attributes = settings.attributes();
        attributes["name"] = json!(name);

        let route = self.api.route(Method::Post, "/ban-lists").json(json!({
            "data": {
                "type": "banList",
                "attributes": attributes,
                "relationships": {
                    "organization": linkage("organization", organization_id),
                    "owner": linkage("organization", organization_id)
                }
            }
        }));
        self.api.decode(route).await
    }

    /// Organizations subscribed to a ban list. Needs the manage permission.
    pub async fn subscribed_organizations(&self, ban_list_id: &str) -> Result<Value> {
        info!("request subscribers of ban list {}", ban_list_id);
        let route = self
            .api
            .resource(Method::Get, &["ban-lists", ban_list_id, "relationships", "organizations"])
            .query("include", "server,organization,owner")
            .query("page[size]", PAGE_SIZE);
        self.api.json(route).await
    }

    /// Subscription of one organization to a ban list.
    pub async fn subscriber(&self, ban_list_id: &str, organization_id: &str) -> Result<Value> {
        info!(
            "request subscription of organization {} to ban list {}",
            organization_id, ban_list_id
        );
        let route = self
            .api
            .resource(
                Method::Get,
                &["ban-lists", ban_list_id, "relationships", "organizations", organization_id],
            )
            .query("include", "organization,owner,server");
        self.api.json(route).await
    }

    /// Change the settings an organization applies to a ban list.
    ///
    /// The ban list is fetched first and sent back with the changes applied.
    pub async fn update(
        &self,
        ban_list_id: &str,
        organization_id: &str,
        update: &BanListUpdate,
    ) -> Result<Value> {
        info!(
            "update ban list {} for organization {}",
            ban_list_id, organization_id
        );
        let current = self
            .api
            .json(self.api.resource(Method::Get, &["ban-lists", ban_list_id]))
            .await?;
        let mut attributes = current["data"]["attributes"]
            .as_object()
            .cloned()
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("ban list {} has no attributes", ban_list_id))
            })?;
        update.apply(&mut attributes);

        let route = self
            .api
            .resource(
                Method::Patch,
                &["ban-lists", ban_list_id, "relationships", "organizations", organization_id],
            )
            .json(json!({
                "data": {"type": "banList", "id": ban_list_id, "attributes": attributes}
            }));
        self.api.json(route).await
    }

    pub async fn unsubscribe(&self, ban_list_id: &str, organization_id: &str) -> Result<()> {
        info!(
            "unsubscribe organization {} from ban list {}",
            organization_id, ban_list_id
        );
        let route = self.api.resource(
            Method::Delete,
            &["ban-lists", ban_list_id, "relationships", "organizations", organization_id],
        );
        self.api.send(route).await?;
        Ok(())
    }

    /// Invite `organization_id` to subscribe to a ban list.
    ///
    /// # Arguments
    ///
    /// * `limit` - How many times the invite may be used.
    pub async fn create_invite(
        &self,
        ban_list_id: &str,
        organization_id: &str,
        permissions: InvitePermissions,
        limit: u32,
    ) -> Result<Value> {
        info!("invite organization {} to ban list {}", organization_id, ban_list_id);
        let route = self
            .api
            .resource(Method::Post, &["ban-lists", ban_list_id, "relationships", "invites"])
            .json(json!({
                "data": {
                    "type": "banListInvite",
                    "attributes": {
                        "uses": 0,
                        "limit": limit,
                        "permManage": permissions.manage,
                        "permCreate": permissions.create,
                        "permUpdate": permissions.update,
                        "permDelete": permissions.delete
                    },
                    "relationships": {"organization": linkage("organization", organization_id)}
                }
            }));
        self.api.json(route).await
    }

    pub async fn read_invite(&self, invite_id: &str) -> Result<Value> {
        info!("request ban list invite {}", invite_id);
        let route = self
            .api
            .resource(Method::Get, &["ban-list-invites", invite_id])
            .query("include", "banList");
        self.api.json(route).await
    }

    pub async fn invites(&self, ban_list_id: &str) -> Result<Value> {
        info!("request invites of ban list {}", ban_list_id);
        let route = self
            .api
            .resource(Method::Get, &["ban-lists", ban_list_id, "relationships", "invites"])
            .query("include", "banList")
            .query("page[size]", PAGE_SIZE);
        self.api.json(route).await
    }

    pub async fn delete_invite(&self, ban_list_id: &str, invite_id: &str) -> Result<()> {
        info!("delete invite {} of ban list {}", invite_id, ban_list_id);
        let route = self.api.resource(
            Method::Delete,
            &["ban-lists", ban_list_id, "relationships", "invites", invite_id],
        );
        self.api.send(route).await?;
        Ok(())
    }

    /// Subscribe `organization_id` to a ban list with an invite code.
    pub async fn accept_invite(
        &self,
        code: &str,
        organization_id: &str,
        owner_id: &str,
        settings: &BanListSettings,
    ) -> Result<Value> {
        info!("accept ban list invite for organization {}", organization_id);
        let mut attributes = settings.attributes();
        attributes["code"] = json!(code);

        let route = self
            .api
            .route(Method::Post, "/ban-lists/accept-invite")
            .json(json!({
                "data": {
                    "type": "banList",
                    "attributes": attributes,
                    "relationships": {
                        "organization": linkage("organization", organization_id),
                        "owner": linkage("organization", owner_id)
                    }
                }
            }));
        self.api.json(route).await
    }

    /// Exempt `organization_id` from a ban.
    pub async fn create_exemption(
        &self,
        ban_id: &str,
        organization_id: &str,
        reason: Option<&str>,
    ) -> Result<Value> {
        info!("exempt organization {} from ban {}", organization_id, ban_id);
        let route = self
            .api
            .resource(Method::Post, &["bans", ban_id, "relationships", "exemptions"])
            .json(json!({
                "data": {
                    "type": "banExemption",
                    "attributes": {"reason": reason},
                    "relationships": {"organization": linkage("organization", organization_id)}
                }
            }));
        self.api.json(route).await
    }

    pub async fn exemptions(&self, ban_id: &str) -> Result<Value> {
        info!("request exemptions of ban {}", ban_id);
        let route = self
            .api
            .resource(Method::Get, &["bans", ban_id, "relationships", "exemptions"])
            .query("fields[banExemption]", "reason");
        self.api.json(route).await
    }

    pub async fn exemption(&self, ban_id: &str, exemption_id: &str) -> Result<Value> {
        info!("request exemption {} of ban {}", exemption_id, ban_id);
        let route = self.api.resource(
            Method::Get,
            &["bans", ban_id, "relationships", "exemptions", exemption_id],
        );
        self.api.json(route).await
    }

    /// Change the reason of an exemption.
    pub async fn update_exemption(
        &self,
        ban_id: &str,
        exemption_id: &str,
        reason: &str,
    ) -> Result<Value> {
        info!("update exemption {} of ban {}", exemption_id, ban_id);
        let current = self.exemption(ban_id, exemption_id).await?;
        let mut data = current.get("data").cloned().ok_or_else(|| {
            Error::UnexpectedResponse(format!("exemption {} has no data", exemption_id))
        })?;
        data.get_mut("attributes")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("exemption {} has no attributes", exemption_id))
            })?
            .insert("reason".to_owned(), json!(reason));

        let route = self
            .api
            .resource(Method::Patch, &["bans", ban_id, "relationships", "exemptions"])
            .json(json!({ "data": data }));
        self.api.json(route).await
    }

    /// Remove the exemptions of a ban.
    pub async fn delete_exemption(&self, ban_id: &str) -> Result<()> {
        info!("delete exemptions of ban {}", ban_id);
        let route = self.api.resource(
            Method::Delete,
            &["bans", ban_id, "relationships", "exemptions"],
        );
        self.api.send(route).await?;
        Ok(())
    }
}
