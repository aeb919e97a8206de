use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::hotbar::Hotbar;

/// Root of the persisted store file.
///
/// ```json
/// {
///   "__internal__": { "migrations": { "version": "5.0.0" } },
///   "hotbars": [ { "id": "...", "name": "default", "items": [ {}, ... ] } ],
///   "activeHotbarId": "..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(rename = "__internal__")]
    pub internal: InternalMeta,
    pub hotbars: Vec<Hotbar>,
    /// A missing or malformed value reads as the nil id, which matches no
    /// hotbar and is repaired on load.
    #[serde(
        rename = "activeHotbarId",
        default,
        deserialize_with = "deserialize_lenient_id"
    )]
    pub active_hotbar_id: Uuid,
}

fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default())
}

/// Bookkeeping section of the store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalMeta {
    pub migrations: MigrationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMeta {
    /// Schema version the document was last migrated to.
    pub version: String,
}

impl StoreDocument {
    pub fn new(version: impl Into<String>, hotbars: Vec<Hotbar>, active_hotbar_id: Uuid) -> Self {
        Self {
            internal: InternalMeta {
                migrations: MigrationMeta {
                    version: version.into(),
                },
            },
            hotbars,
            active_hotbar_id,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.internal.migrations.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_active(active: Option<Value>) -> Value {
        let mut document = json!({
            "__internal__": { "migrations": { "version": "5.0.0" } },
            "hotbars": []
        });
        if let Some(active) = active {
            document["activeHotbarId"] = active;
        }
        document
    }

    #[test]
    fn test_active_hotbar_id_reads_valid_uuid() {
        let id = Uuid::new_v4();
        let document: StoreDocument =
            serde_json::from_value(with_active(Some(json!(id)))).unwrap();
        assert_eq!(document.active_hotbar_id, id);
    }

    #[test]
    fn test_missing_or_malformed_active_hotbar_id_reads_as_nil() {
        for active in [None, Some(json!("not-a-uuid")), Some(json!(7)), Some(Value::Null)] {
            let document: StoreDocument = serde_json::from_value(with_active(active)).unwrap();
            assert!(document.active_hotbar_id.is_nil());
        }
    }
}
