//! Typed records decoded from JSON:API responses.

mod attributes;
mod document;

pub(crate) use attributes::Introspection;
pub use attributes::{
    ApiScopes, BanAttributes, BanListAttributes, DataPoint, FlagAttributes, NoteAttributes,
    PlayerAttributes, ServerAttributes,
};
pub use document::{Document, Identifier, Links, Relationship, RelationshipData, Resource};

pub type Ban = Resource<BanAttributes>;
pub type BanList = Resource<BanListAttributes>;
pub type Flag = Resource<FlagAttributes>;
pub type Note = Resource<NoteAttributes>;
pub type Player = Resource<PlayerAttributes>;
pub type Server = Resource<ServerAttributes>;
