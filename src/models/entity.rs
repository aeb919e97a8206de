use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// A pinned reference to a catalog entity.
///
/// `uid` is the stable identity. `name` and `source` are a display cache
/// captured when the entity was pinned (or refreshed from the catalog) and
/// may be stale relative to the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EntityReference {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, source: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            name: Some(name.into()),
            source,
        }
    }

    /// A reference carrying only an identity, as stored by older formats.
    pub fn bare(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: None,
            source: None,
        }
    }

    /// Validate the shape of an externally supplied entity.
    ///
    /// The uid must be a non-empty string and the name must be a string.
    /// Anything else is an [`StoreError::InvalidEntity`]: a malformed catalog
    /// entity is a caller contract violation, not a soft failure.
    pub fn from_entity<E: CatalogEntity + ?Sized>(entity: &E) -> Result<Self> {
        let uid = match entity.uid() {
            Some(uid) if !uid.is_empty() => uid,
            _ => {
                return Err(StoreError::InvalidEntity(
                    "entity uid must be a non-empty string".to_string(),
                ))
            }
        };
        let name = entity.name().ok_or_else(|| {
            StoreError::InvalidEntity(format!("entity {uid} name must be a string"))
        })?;

        Ok(Self {
            uid: uid.to_string(),
            name: Some(name.to_string()),
            source: entity.source().map(str::to_string),
        })
    }

    /// Display name, falling back to the uid when no name is cached.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uid)
    }
}

/// Read accessors of a live catalog entity.
///
/// Each accessor returns `None` when the underlying value is missing or not a
/// string, which is what [`EntityReference::from_entity`] rejects.
pub trait CatalogEntity {
    fn uid(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;
    fn source(&self) -> Option<&str> {
        None
    }
}

impl CatalogEntity for EntityReference {
    fn uid(&self) -> Option<&str> {
        Some(&self.uid)
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Raw JSON entities, either `{ "metadata": { "uid", "name", "source" } }`
/// as the catalog serializes them, or a flat `{ "uid", "name", "source" }`.
impl CatalogEntity for Value {
    fn uid(&self) -> Option<&str> {
        metadata(self).get("uid")?.as_str()
    }

    fn name(&self) -> Option<&str> {
        metadata(self).get("name")?.as_str()
    }

    fn source(&self) -> Option<&str> {
        metadata(self).get("source")?.as_str()
    }
}

fn metadata(value: &Value) -> &Value {
    value.get("metadata").unwrap_or(value)
}
