//! Attribute sets of the resources the client decodes.
//!
//! Every field is optional or defaulted: the API omits attributes depending
//! on the token's permissions and on `fields[...]` filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::strip_html_tags;

/// Attributes of a `ban`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BanAttributes {
    pub uid: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Reason shown to the banned player.
    pub reason: String,
    /// Staff-only note.
    pub note: Option<String>,
    /// `None` for a permanent ban.
    pub expires: Option<DateTime<Utc>>,
    pub identifiers: Vec<Value>,
    pub org_wide: bool,
    pub auto_add_enabled: bool,
    pub native_enabled: Option<bool>,
}

/// Attributes of a `playerNote`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteAttributes {
    pub clearance_level: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Note body, in HTML.
    pub note: String,
    pub shared: bool,
}

impl NoteAttributes {
    /// The note as plain text.
    pub fn content(&self) -> String {
        strip_html_tags(&self.note)
    }
}

/// Attributes of a `player`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerAttributes {
    pub name: String,
    pub private: bool,
    pub positive_match: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Attributes of a `server`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerAttributes {
    pub name: String,
    pub address: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub players: u32,
    pub max_players: u32,
    pub rank: Option<u32>,
    pub status: Option<String>,
    pub country: Option<String>,
    pub details: Option<Value>,
}

/// Attributes of a `playerFlag`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlagAttributes {
    pub name: String,
    /// `#rrggbb`
    pub color: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Attributes of a `banList`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BanListAttributes {
    pub name: String,
    /// `none`, `log` or `kick`.
    pub action: Option<String>,
    pub default_identifiers: Vec<String>,
    pub default_reasons: Vec<String>,
    pub default_auto_add_enabled: Option<bool>,
    pub default_native_enabled: Option<bool>,
}

/// Attributes of a metrics `dataPoint`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DataPoint {
    pub name: Option<String>,
    pub group: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
}

/// Result of a token introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiScopes {
    pub active: bool,
    pub scopes: Vec<String>,
    pub client_id: String,
    pub token_type: String,
}

/// Raw introspection payload.
#[derive(Default, Deserialize)]
#[serde(default)]
pub(crate) struct Introspection {
    active: bool,
    scope: String,
    client_id: String,
    #[serde(rename = "type")]
    token_type: String,
}

impl From<Introspection> for ApiScopes {
    /// Scopes are sent as one `:`-separated string.
    fn from(introspection: Introspection) -> Self {
        ApiScopes {
            active: introspection.active,
            scopes: introspection
                .scope
                .split(':')
                .filter(|scope| !scope.is_empty())
                .map(str::to_owned)
                .collect(),
            client_id: introspection.client_id,
            token_type: introspection.token_type,
        }
    }
}
