//! Version-gated transforms of the raw store document.
//!
//! Every migration is tagged with the version it upgrades the document *to*.
//! A document runs each migration whose version is newer than the one it
//! records, in ascending order, and is then stamped with the final version.
//! Whether a migration runs depends only on the recorded version, never on
//! what the document looks like.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::version::SchemaVersion;
use crate::catalog::CatalogLookup;
use crate::models::EntityReference;

/// Schema version of documents written by this crate.
pub const CURRENT_VERSION: &str = "5.0.0";

/// Namespace for hotbar ids derived while migrating.
const HOTBAR_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_93b7_4d0a_8c55_1e2f_7a9b_3c64);

type Document = Map<String, Value>;

/// Inputs migrations may consult besides the document itself.
pub struct MigrationContext<'a> {
    pub catalog: &'a dyn CatalogLookup,
    pub capacity: usize,
    pub default_hotbar_name: &'a str,
    pub bootstrap_entity: Option<&'a EntityReference>,
}

struct Migration {
    version: &'static str,
    name: &'static str,
    run: fn(Document, &MigrationContext<'_>) -> Document,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "5.0.0-alpha.0",
        name: "create-default-hotbar",
        run: create_default_hotbar,
    },
    Migration {
        version: "5.0.0-alpha.2",
        name: "assign-hotbar-ids",
        run: assign_hotbar_ids,
    },
    Migration {
        version: "5.0.0-beta.5",
        name: "enrich-entity-references",
        run: enrich_entity_references,
    },
    Migration {
        version: "5.0.0",
        name: "normalize-hotbar-layout",
        run: normalize_hotbar_layout,
    },
];

/// What a pipeline run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version recorded in the document before migrating, if any.
    pub recorded_version: Option<String>,
    /// Names of the migrations applied, in order.
    pub applied: Vec<&'static str>,
    /// Version the document is stamped with.
    pub version: String,
}

pub fn run_migrations(
    mut document: Document,
    ctx: &MigrationContext<'_>,
) -> (Document, MigrationReport) {
    let recorded_version = recorded_version(&document);
    let from = match recorded_version.as_deref().map(str::parse::<SchemaVersion>) {
        Some(Ok(version)) => version,
        Some(Err(e)) => {
            tracing::debug!("{e}, migrating from the baseline");
            SchemaVersion::BASELINE
        }
        None => SchemaVersion::BASELINE,
    };

    let mut applied = Vec::new();
    for migration in MIGRATIONS {
        let target = match migration.version.parse::<SchemaVersion>() {
            Ok(target) => target,
            Err(e) => {
                tracing::error!("Skipping migration {}: {e}", migration.name);
                continue;
            }
        };
        if target <= from {
            continue;
        }

        tracing::info!("Applying migration {}: {}", migration.version, migration.name);
        document = (migration.run)(document, ctx);
        applied.push(migration.name);
    }

    // Never stamp a document written by a newer version back down; its
    // newer migrations would run a second time after the next upgrade.
    let version = match CURRENT_VERSION.parse::<SchemaVersion>() {
        Ok(latest) if from > latest => {
            tracing::warn!("Store document was written by newer version {from}");
            recorded_version
                .clone()
                .unwrap_or_else(|| from.to_string())
        }
        _ => CURRENT_VERSION.to_string(),
    };
    stamp_version(&mut document, &version);

    (
        document,
        MigrationReport {
            recorded_version,
            applied,
            version,
        },
    )
}

fn recorded_version(document: &Document) -> Option<String> {
    document
        .get("__internal__")?
        .get("migrations")?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

fn stamp_version(document: &mut Document, version: &str) {
    let mut internal = take_object(document, "__internal__");
    let mut migrations = take_object(&mut internal, "migrations");
    migrations.insert("version".to_string(), Value::String(version.to_string()));
    internal.insert("migrations".to_string(), Value::Object(migrations));
    document.insert("__internal__".to_string(), Value::Object(internal));
}

fn take_object(map: &mut Document, key: &str) -> Document {
    match map.remove(key) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    }
}

/// Stable id for a hotbar that has none (or an unusable one).
pub(super) fn derived_id(seed: &str) -> Uuid {
    Uuid::new_v5(&HOTBAR_ID_NAMESPACE, seed.as_bytes())
}

fn empty_slot() -> Value {
    json!({})
}

fn hotbars_mut(document: &mut Document) -> impl Iterator<Item = &mut Document> {
    document
        .get_mut("hotbars")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn default_hotbar(ctx: &MigrationContext<'_>) -> Value {
    let mut items = vec![Value::Null; ctx.capacity];
    if let (Some(entity), Some(first)) = (ctx.bootstrap_entity, items.first_mut()) {
        *first = json!({ "entity": entity });
    }
    json!({ "name": ctx.default_hotbar_name, "items": items })
}

// ============================================================
// Migrations
// ============================================================

/// 5.0.0-alpha.0: documents without hotbars get one default hotbar.
fn create_default_hotbar(mut document: Document, ctx: &MigrationContext<'_>) -> Document {
    let has_hotbars = document
        .get("hotbars")
        .and_then(Value::as_array)
        .is_some_and(|hotbars| !hotbars.is_empty());

    if !has_hotbars {
        document.insert("hotbars".to_string(), json!([default_hotbar(ctx)]));
    }
    document
}

/// 5.0.0-alpha.2: every hotbar gets an id.
fn assign_hotbar_ids(mut document: Document, _ctx: &MigrationContext<'_>) -> Document {
    for (index, hotbar) in hotbars_mut(&mut document).enumerate() {
        if hotbar.get("id").is_some_and(Value::is_string) {
            continue;
        }
        let name = hotbar.get("name").and_then(Value::as_str).unwrap_or_default();
        let id = derived_id(&format!("{index}:{name}"));
        hotbar.insert("id".to_string(), Value::String(id.to_string()));
    }
    document
}

/// 5.0.0-beta.5: slots stored only `{ entity: { uid } }` and used `null` for
/// empty cells. Known uids are enriched with the catalog's current name and
/// source; unknown uids are dropped so dangling references do not pile up.
/// Positions are preserved.
fn enrich_entity_references(mut document: Document, ctx: &MigrationContext<'_>) -> Document {
    for hotbar in hotbars_mut(&mut document) {
        let Some(items) = hotbar.get_mut("items").and_then(Value::as_array_mut) else {
            continue;
        };

        for item in items.iter_mut() {
            let live = item
                .get("entity")
                .and_then(|entity| entity.get("uid"))
                .and_then(Value::as_str)
                .and_then(|uid| ctx.catalog.find_by_uid(uid));

            *item = match live {
                Some(entity) => json!({ "entity": entity }),
                None => {
                    if !item.is_null() {
                        tracing::debug!(item = %item, "dropping reference to unknown entity");
                    }
                    empty_slot()
                }
            };
        }
    }
    document
}

/// 5.0.0: every hotbar has a unique UUID id, a name, and exactly-capacity
/// explicit slots; `activeHotbarId` points at an existing hotbar.
fn normalize_hotbar_layout(mut document: Document, ctx: &MigrationContext<'_>) -> Document {
    let mut hotbars: Vec<Value> = match document.remove("hotbars") {
        Some(Value::Array(hotbars)) => hotbars.into_iter().filter(Value::is_object).collect(),
        _ => Vec::new(),
    };
    if hotbars.is_empty() {
        hotbars.push(default_hotbar(ctx));
    }

    let mut ids = Vec::with_capacity(hotbars.len());
    let mut seen = HashSet::new();
    for (index, hotbar) in hotbars.iter_mut().filter_map(Value::as_object_mut).enumerate() {
        let name = match hotbar.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                let name = format!("Hotbar {}", index + 1);
                hotbar.insert("name".to_string(), Value::String(name.clone()));
                name
            }
        };

        let mut id = match hotbar.get("id").and_then(Value::as_str) {
            Some(raw) => raw.parse::<Uuid>().unwrap_or_else(|_| derived_id(raw)),
            None => derived_id(&format!("{index}:{name}")),
        };
        if !seen.insert(id) {
            id = derived_id(&format!("{index}:{id}"));
            seen.insert(id);
        }
        hotbar.insert("id".to_string(), Value::String(id.to_string()));
        ids.push(id);

        let mut items: Vec<Value> = match hotbar.remove("items") {
            Some(Value::Array(items)) => items.into_iter().map(normalize_slot).collect(),
            _ => Vec::new(),
        };
        if items.len() < ctx.capacity {
            items.resize_with(ctx.capacity, empty_slot);
        }
        hotbar.insert("items".to_string(), Value::Array(items));
    }

    let active = document
        .get("activeHotbarId")
        .and_then(Value::as_str)
        .map(|raw| raw.parse::<Uuid>().unwrap_or_else(|_| derived_id(raw)))
        .filter(|id| ids.contains(id))
        .or_else(|| ids.first().copied());
    if let Some(active) = active {
        document.insert("activeHotbarId".to_string(), Value::String(active.to_string()));
    }

    document.insert("hotbars".to_string(), Value::Array(hotbars));
    document
}

/// A slot is either `{}` or `{ "entity": { "uid": <non-empty string>, ... } }`.
fn normalize_slot(item: Value) -> Value {
    let valid = item
        .get("entity")
        .and_then(|entity| entity.get("uid"))
        .and_then(Value::as_str)
        .is_some_and(|uid| !uid.is_empty());

    if valid {
        item
    } else {
        empty_slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItem, EmptyCatalog, StaticCatalog};

    fn context<'a>(catalog: &'a dyn CatalogLookup) -> MigrationContext<'a> {
        MigrationContext {
            catalog,
            capacity: 4,
            default_hotbar_name: "default",
            bootstrap_entity: None,
        }
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn all_names() -> Vec<&'static str> {
        MIGRATIONS.iter().map(|m| m.name).collect()
    }

    #[test]
    fn test_migration_versions_are_valid_and_ascending() {
        let versions: Vec<SchemaVersion> = MIGRATIONS
            .iter()
            .map(|m| m.version.parse().unwrap())
            .collect();
        assert!(versions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(
            versions.last().unwrap(),
            &CURRENT_VERSION.parse::<SchemaVersion>().unwrap()
        );
    }

    #[test]
    fn test_unversioned_document_runs_every_migration() {
        let (migrated, report) = run_migrations(Map::new(), &context(&EmptyCatalog));

        assert_eq!(report.recorded_version, None);
        assert_eq!(report.applied, all_names());
        assert_eq!(recorded_version(&migrated).as_deref(), Some(CURRENT_VERSION));

        let hotbars = migrated["hotbars"].as_array().unwrap();
        assert_eq!(hotbars.len(), 1);
        assert_eq!(hotbars[0]["items"], json!([{}, {}, {}, {}]));
        assert_eq!(migrated["activeHotbarId"], hotbars[0]["id"]);
    }

    #[test]
    fn test_migrations_are_not_reapplied() {
        let ctx = context(&EmptyCatalog);
        let (once, _) = run_migrations(Map::new(), &ctx);
        let (twice, report) = run_migrations(once.clone(), &ctx);

        assert!(report.applied.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_current_document_is_stamped_without_transforms() {
        let document = doc(json!({
            "__internal__": { "migrations": { "version": CURRENT_VERSION } },
            "hotbars": [{ "id": "not-a-uuid", "name": "x", "items": [null] }]
        }));
        let (migrated, report) = run_migrations(document, &context(&EmptyCatalog));

        assert!(report.applied.is_empty());
        // Untouched: gating is by recorded version, not by shape.
        assert_eq!(migrated["hotbars"][0]["items"], json!([null]));
    }

    #[test]
    fn test_gating_skips_older_transforms() {
        let catalog = StaticCatalog::new([CatalogItem::new("known", "Known", Some("local"))]);
        let document = doc(json!({
            "__internal__": { "migrations": { "version": "5.0.0-beta.5" } },
            "hotbars": [{ "id": "3caac17f-aec2-4723-9694-ad204465d935", "name": "x",
                          "items": [{ "entity": { "uid": "known" } }, null] }]
        }));
        let (migrated, report) = run_migrations(document, &context(&catalog));

        assert_eq!(report.applied, vec!["normalize-hotbar-layout"]);
        // Not enriched: the enrichment version is already recorded.
        assert_eq!(
            migrated["hotbars"][0]["items"],
            json!([{ "entity": { "uid": "known" } }, {}, {}, {}])
        );
    }

    #[test]
    fn test_unparseable_version_is_treated_as_baseline() {
        let document = doc(json!({ "__internal__": { "migrations": { "version": "garbage" } } }));
        let (_, report) = run_migrations(document, &context(&EmptyCatalog));
        assert_eq!(report.applied, all_names());
    }

    #[test]
    fn test_newer_version_is_not_stamped_down() {
        let document = doc(json!({
            "__internal__": { "migrations": { "version": "6.1.0" } },
            "hotbars": []
        }));
        let (migrated, report) = run_migrations(document, &context(&EmptyCatalog));

        assert!(report.applied.is_empty());
        assert_eq!(report.version, "6.1.0");
        assert_eq!(recorded_version(&migrated).as_deref(), Some("6.1.0"));
    }

    #[test]
    fn test_enrich_entity_references() {
        let catalog = StaticCatalog::new([CatalogItem::new("known", "Known", Some("remote"))]);
        let document = doc(json!({
            "hotbars": [{ "items": [
                { "entity": { "uid": "known" } },
                { "entity": { "uid": "gone", "name": "stale", "source": "local" } },
                null
            ] }]
        }));
        let migrated = enrich_entity_references(document, &context(&catalog));

        assert_eq!(
            migrated["hotbars"][0]["items"],
            json!([{ "entity": { "uid": "known", "name": "Known", "source": "remote" } }, {}, {}])
        );
    }

    #[test]
    fn test_assign_hotbar_ids_is_deterministic() {
        let input = json!({ "hotbars": [{ "name": "a" }, { "id": "keep", "name": "b" }] });
        let first = assign_hotbar_ids(doc(input.clone()), &context(&EmptyCatalog));
        let second = assign_hotbar_ids(doc(input), &context(&EmptyCatalog));

        assert_eq!(first["hotbars"][0]["id"], second["hotbars"][0]["id"]);
        assert!(first["hotbars"][0]["id"].as_str().unwrap().parse::<Uuid>().is_ok());
        assert_eq!(first["hotbars"][1]["id"], "keep");
    }

    #[test]
    fn test_normalize_repairs_ids_layout_and_active_selection() {
        let document = doc(json!({
            "hotbars": [
                { "id": "hottest", "name": "a", "items": [null, { "entity": { "uid": "x" } }] },
                { "id": "hottest", "items": [{ "entity": {} }, 5] },
                "not a hotbar"
            ],
            "activeHotbarId": "missing"
        }));
        let migrated = normalize_hotbar_layout(document, &context(&EmptyCatalog));
        let hotbars = migrated["hotbars"].as_array().unwrap();

        assert_eq!(hotbars.len(), 2);
        assert_eq!(hotbars[0]["id"], derived_id("hottest").to_string());
        assert_ne!(hotbars[0]["id"], hotbars[1]["id"]);
        assert_eq!(hotbars[1]["name"], "Hotbar 2");
        assert_eq!(hotbars[0]["items"], json!([{}, { "entity": { "uid": "x" } }, {}, {}]));
        assert_eq!(hotbars[1]["items"], json!([{}, {}, {}, {}]));
        assert_eq!(migrated["activeHotbarId"], hotbars[0]["id"]);
    }

    #[test]
    fn test_normalize_maps_non_uuid_active_id_consistently() {
        let document = doc(json!({
            "hotbars": [
                { "id": "3caac17f-aec2-4723-9694-ad204465d935", "name": "a", "items": [] },
                { "id": "hottest", "name": "b", "items": [] }
            ],
            "activeHotbarId": "hottest"
        }));
        let migrated = normalize_hotbar_layout(document, &context(&EmptyCatalog));
        assert_eq!(migrated["activeHotbarId"], migrated["hotbars"][1]["id"]);
    }

    #[test]
    fn test_default_hotbar_carries_bootstrap_entity() {
        let bootstrap = EntityReference::new("catalog-entity", "Catalog", Some("app".into()));
        let ctx = MigrationContext {
            bootstrap_entity: Some(&bootstrap),
            ..context(&EmptyCatalog)
        };
        let migrated = create_default_hotbar(Map::new(), &ctx);

        assert_eq!(
            migrated["hotbars"][0]["items"][0],
            json!({ "entity": { "uid": "catalog-entity", "name": "Catalog", "source": "app" } })
        );
        assert_eq!(migrated["hotbars"][0]["items"][1], Value::Null);
    }
}
