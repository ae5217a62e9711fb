//! Player notes: `/players/{id}/relationships/notes`.

use log::info;
use serde_json::json;

use crate::error::Result;
use crate::http::{Method, RouteBuilder, Transport};
use crate::resources::{Api, PAGE_SIZE};
use crate::types::{Document, Note};

/// Handle on the note endpoints. Notes are created with
/// [`Players::add_note`](crate::resources::Players::add_note).
pub struct Notes<'a, T> {
    api: Api<'a, T>,
}

impl<'a, T: Transport> Notes<'a, T> {
    pub(crate) fn new(transport: &'a T, base_url: &'a str) -> Self {
        Notes {
            api: Api::new(transport, base_url),
        }
    }

    fn note_route(&self, method: Method, player_id: &str, note_id: &str) -> RouteBuilder {
        self.api.resource(
            method,
            &["players", player_id, "relationships", "notes", note_id],
        )
    }

    /// Notes attached to a player.
    ///
    /// # Arguments
    ///
    /// * `personal` - Only the notes written by the token's user.
    pub async fn list(&self, player_id: &str, personal: bool) -> Result<Document<Vec<Note>>> {
        info!("request notes of player {}", player_id);
        let route = self
            .api
            .resource(Method::Get, &["players", player_id, "relationships", "notes"])
            .query("include", "user,organization")
            .query("page[size]", PAGE_SIZE)
            .query("filter[personal]", personal);
        self.api.decode(route).await
    }

    pub async fn info(&self, player_id: &str, note_id: &str) -> Result<Document<Note>> {
        info!("request note {} of player {}", note_id, player_id);
        let route = self.note_route(Method::Get, player_id, note_id);
        self.api.decode(route).await
    }

    /// Rewrite a note, or with `append` add `note` on a new line after the
    /// current content.
    pub async fn update(
        &self,
        player_id: &str,
        note_id: &str,
        note: &str,
        shared: bool,
        append: bool,
    ) -> Result<Document<Note>> {
        info!("update note {} of player {}", note_id, player_id);
        let content = if append {
            let current = self.info(player_id, note_id).await?;
            if current.data.attributes.note.is_empty() {
                note.to_owned()
            } else {
                format!("{}\n{}", current.data.attributes.note, note)
            }
        } else {
            note.to_owned()
        };

        let route = self
            .note_route(Method::Patch, player_id, note_id)
            .json(json!({
                "data": {
                    "type": "playerNote",
                    "id": note_id,
                    "attributes": {"note": content, "shared": shared}
                }
            }));
        self.api.decode(route).await
    }

    pub async fn delete(&self, player_id: &str, note_id: &str) -> Result<()> {
        info!("delete note {} of player {}", note_id, player_id);
        self.api
            .send(self.note_route(Method::Delete, player_id, note_id))
            .await?;
        Ok(())
    }
}
