//! JSON:API envelope shared by every typed response.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level JSON:API document.
///
/// `T` is a single [`Resource`] for read endpoints and a `Vec` of them for
/// list endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Document<T> {
    pub data: T,
    /// Side-loaded resources requested with `include`, kept untyped.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Value>,
    /// Pagination links, when the endpoint is paginated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}

impl<T> Document<T> {
    /// Included resources of the given JSON:API type.
    pub fn included_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.included
            .iter()
            .filter(move |resource| resource.get("type").and_then(Value::as_str) == Some(kind))
    }
}

/// One JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Resource<A> {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: A,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub relationships: HashMap<String, Relationship>,
}

impl<A> Resource<A> {
    /// Id of a to-one relationship, e.g. `related_id("organization")`.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        match self.relationships.get(name)?.data.as_ref()? {
            RelationshipData::One(identifier) => Some(&identifier.id),
            RelationshipData::Many(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(Identifier),
    Many(Vec<Identifier>),
}

/// Resource linkage: the `{type, id}` pair pointing at another resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[test]
    fn test_decode_single_resource() {
        let document: Document<Resource<Named>> = serde_json::from_value(json!({
            "data": {
                "type": "server",
                "id": "7",
                "attributes": {"name": "Rust EU"},
                "relationships": {
                    "organization": {"data": {"type": "organization", "id": "12"}},
                    "game": {"data": null},
                    "tags": {"data": [{"type": "tag", "id": "1"}]}
                }
            },
            "included": [
                {"type": "organization", "id": "12"},
                {"type": "identifier", "id": "99"}
            ]
        }))
        .unwrap();

        assert_eq!(document.data.id, "7");
        assert_eq!(document.data.kind, "server");
        assert_eq!(document.data.attributes.name, "Rust EU");
        assert_eq!(document.data.related_id("organization"), Some("12"));
        assert_eq!(document.data.related_id("game"), None);
        assert_eq!(document.data.related_id("tags"), None);
        assert_eq!(document.data.related_id("missing"), None);
        assert_eq!(document.included_of("identifier").count(), 1);
        assert!(document.links.is_none());
    }

    #[test]
    fn test_decode_resource_list_with_links() {
        let document: Document<Vec<Resource<Named>>> = serde_json::from_value(json!({
            "data": [
                {"type": "server", "id": "1", "attributes": {"name": "a"}},
                {"type": "server", "id": "2", "attributes": {"name": "b"}}
            ],
            "links": {"next": "https://api.battlemetrics.com/servers?page[key]=2"}
        }))
        .unwrap();

        assert_eq!(document.data.len(), 2);
        assert!(document.included.is_empty());
        assert!(document.links.unwrap().next.is_some());
    }
}
