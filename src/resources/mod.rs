//! Resource handles, one per area of the API.
//!
//! Handles are cheap borrows of the client obtained through its accessors
//! ([`Battlemetrics::players`](crate::Battlemetrics::players), ...). Every
//! method builds a [`Route`](crate::http::Route), sends it through the
//! client's [`Transport`] and decodes the answer.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::Result;
use crate::http::{Method, Normalized, Route, RouteBuilder, Transport};

mod ban_lists;
mod bans;
mod flags;
mod game_info;
mod notes;
mod organizations;
mod players;
mod servers;
mod sessions;

pub use ban_lists::{BanListSettings, BanListUpdate, BanLists, InvitePermissions};
pub use bans::{BanSearch, Bans};
pub use flags::{FlagSpec, Flags};
pub use game_info::GameInfo;
pub use notes::Notes;
pub use organizations::{CommandStatsFilter, FriendFilter, FriendSharing, Organizations};
pub use players::{CoplayFilter, NewBan, PlayerSearch, Players};
pub use servers::{ServerSearch, ServerUpdate, Servers};
pub use sessions::{SessionFilter, Sessions};

/// Page size requested by list endpoints.
pub(crate) const PAGE_SIZE: u32 = 100;

/// Route building and dispatch shared by the handles.
pub(crate) struct Api<'a, T> {
    transport: &'a T,
    base_url: &'a str,
}

impl<'a, T: Transport> Api<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Api {
            transport,
            base_url,
        }
    }

    /// Route builder for a path relative to the API base URL.
    pub(crate) fn route(&self, method: Method, path: &str) -> RouteBuilder {
        Route::builder(method).base(self.base_url).path(path)
    }

    /// Route builder for the path made of `segments`, each one
    /// percent-encoded.
    pub(crate) fn resource(&self, method: Method, segments: &[&str]) -> RouteBuilder {
        segments
            .iter()
            .fold(Route::builder(method).base(self.base_url), |route, segment| {
                route.segment(segment)
            })
    }

    pub(crate) async fn send(&self, route: RouteBuilder) -> Result<Normalized> {
        self.transport.request(route.build()?).await
    }

    /// Sends the route and returns the raw JSON document.
    pub(crate) async fn json(&self, route: RouteBuilder) -> Result<Value> {
        self.send(route).await?.into_json()
    }

    /// Sends the route and decodes the JSON document into `D`.
    pub(crate) async fn decode<D: DeserializeOwned>(&self, route: RouteBuilder) -> Result<D> {
        self.send(route).await?.decode()
    }
}

/// JSON:API resource linkage for a relationship body.
pub(crate) fn linkage(kind: &str, id: &str) -> Value {
    json!({"data": {"type": kind, "id": id}})
}
