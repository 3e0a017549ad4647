//! JSON:API document types.
//!
//! These are deliberately loose: attribute, meta and link values are raw
//! [`serde_json::Value`]s and no schema validation is performed. Relationships
//! are kept as reference descriptors (`{ data: { type, id } }` or
//! `{ data: [{ type, id }, ...] }`) and are never resolved to live records by
//! this layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A top-level JSON:API document: `{ data?, included?, meta?, links? }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Value>,
}

impl Document {
    /// Wrap a single resource as a document's primary data.
    pub fn from_resource(resource: Resource) -> Self {
        Document {
            data: Some(PrimaryData::One(resource)),
            ..Document::default()
        }
    }

    /// Wrap a batch of resources as a document's primary data.
    pub fn from_resources(resources: Vec<Resource>) -> Self {
        Document {
            data: Some(PrimaryData::Many(resources)),
            ..Document::default()
        }
    }
}

/// The `data` member of a document: a single resource or a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Resource),
    Many(Vec<Resource>),
}

/// A single resource object: `{ id?, type, attributes?, relationships? }`.
///
/// `attributes` and `relationships` are independently optional so that
/// partial update bodies can carry one without the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Resource {
            kind: kind.into(),
            ..Resource::default()
        }
    }

    pub fn with_id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Resource {
            id: Some(id.into()),
            kind: kind.into(),
            ..Resource::default()
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        self.relationships
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), relationship);
        self
    }
}

/// A relationship reference descriptor. `data` is `null` for an emptied
/// to-one relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: Option<RelationshipData>,
}

impl Relationship {
    pub fn to_one(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Relationship {
            data: Some(RelationshipData::ToOne(Identifier::new(kind, id))),
        }
    }

    pub fn to_many(identifiers: Vec<Identifier>) -> Self {
        Relationship {
            data: Some(RelationshipData::ToMany(identifiers)),
        }
    }

    /// True if this descriptor points at a list of resources.
    pub fn is_to_many(&self) -> bool {
        matches!(self.data, Some(RelationshipData::ToMany(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToOne(Identifier),
    ToMany(Vec<Identifier>),
}

/// A `{ type, id }` resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl Identifier {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Identifier {
            kind: kind.into(),
            id: id.into(),
        }
    }
}
