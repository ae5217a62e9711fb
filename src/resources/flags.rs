//! Player flags: `/player-flags`.

use log::info;
use serde_json::{Value, json};

use crate::error::Result;
use crate::http::{Method, Transport};
use crate::resources::{Api, PAGE_SIZE, linkage};
use crate::types::{Document, Flag};

/// Appearance of a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: String,
    /// Hex color, e.g. `#ff0000`.
    pub color: String,
    pub description: String,
    /// Material icon name.
    pub icon: Option<String>,
}

impl FlagSpec {
    pub fn new(name: &str, color: &str, description: &str) -> Self {
        FlagSpec {
            name: name.to_owned(),
            color: color.to_owned(),
            description: description.to_owned(),
            icon: None,
        }
    }

    fn attributes(&self) -> Value {
        json!({
            "icon": self.icon,
            "name": self.name,
            "color": self.color,
            "description": self.description
        })
    }
}

/// Handle on the flag endpoints.
pub struct Flags<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Flags<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Flags {
            api: Api::new(transport, base_url),
        }
    }

    /// Flags of the token's organizations, or only the user's own with
    /// `personal`.
    pub async fn list(&self, personal: bool) -> Result<Document<Vec<Flag>>> {
        info!("request player flags");
        let route = self
            .api
            .route(Method::Get, "/player-flags")
            .query("page[size]", PAGE_SIZE)
            .query("include", "organization")
            .query("filter[personal]", personal);
        self.api.decode(route).await
    }

    pub async fn info(&self, flag_id: &str) -> Result<Document<Flag>> {
        info!("request player flag {}", flag_id);
        let route = self
            .api
            .resource(Method::Get, &["player-flags", flag_id]);
        self.api.decode(route).await
    }

    /// Create a flag shared with the organization.
    pub async fn create(
        &self,
        organization_id: &str,
        user_id: &str,
        flag: &FlagSpec,
    ) -> Result<Document<Flag>> {
        info!("create player flag {:?}", flag.name);
        let route = self.api.route(Method::Post, "/player-flags").json(json!({
            "data": {
                "type": "playerFlag",
                "attributes": flag.attributes(),
                "relationships": {
                    "organization": linkage("organization", organization_id),
                    "user": linkage("user", user_id)
                }
            }
        }));
        self.api.decode(route).await
    }

    pub async fn update(&self, flag_id: &str, flag: &FlagSpec) -> Result<Document<Flag>> {
        info!("update player flag {}", flag_id);
        let route = self
            .api
            .resource(Method::Patch, &["player-flags", flag_id])
            .json(json!({
                "data": {"type": "playerFlag", "id": flag_id, "attributes": flag.attributes()}
            }));
        self.api.decode(route).await
    }

    pub async fn delete(&self, flag_id: &str) -> Result<()> {
        info!("delete player flag {}", flag_id);
        self.api
            .send(
                self.api
                    .resource(Method::Delete, &["player-flags", flag_id]),
            )
            .await?;
        Ok(())
    }
}
