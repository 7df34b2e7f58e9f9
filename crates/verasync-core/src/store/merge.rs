// ── lu_sdata merge ──
//
// Applies one poll response to the store: collections first, in the
// hub's fixed order, then hub-wide metadata and the cursor.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{trace, warn};

use super::DataStore;
use super::collection::EntityCollection;
use crate::error::CoreError;
use crate::event::UpdatedEntity;
use crate::model::value;
use crate::model::{
    Category, Entity, HouseMode, HubState, JsonObject, Room, Scene, Section, SyncCursor,
};
use crate::registry::DeviceRegistry;

/// What a merged response changed.
#[derive(Debug, Default)]
pub(crate) struct MergeOutcome {
    /// Devices and scenes that already existed and changed, in merge order.
    pub updated: Vec<UpdatedEntity>,
    /// Number of entities seen for the first time.
    pub created: usize,
    pub cursor: SyncCursor,
}

/// Merge `body` into `store`.
///
/// `full_snapshot` is whether the request was sent with the initial
/// cursor; every collection is then replaced wholesale. Returns `None`
/// for an empty body.
pub(crate) fn apply_sync(
    store: &DataStore,
    registry: &DeviceRegistry,
    body: &str,
    full_snapshot: bool,
) -> Result<Option<MergeOutcome>, CoreError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let root = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(root)) => root,
        Ok(other) => {
            return Err(CoreError::Protocol {
                message: format!("lu_sdata returned a JSON {}, not an object", json_kind(&other)),
            });
        }
        Err(e) => {
            return Err(CoreError::Protocol {
                message: format!("lu_sdata body is not JSON: {e}"),
            });
        }
    };

    let mut outcome = MergeOutcome::default();

    let full = full_snapshot;
    outcome.created += merge(&store.sections, &root, "sections", full, Section::from_json).created;
    outcome.created += merge(&store.rooms, &root, "rooms", full, Room::from_json).created;
    outcome.created +=
        merge(&store.categories, &root, "categories", full, Category::from_json).created;

    let scenes = merge(&store.scenes, &root, "scenes", full, Scene::from_json);
    outcome.created += scenes.created;
    outcome
        .updated
        .extend(scenes.updated.into_iter().map(UpdatedEntity::Scene));

    let devices = merge(&store.devices, &root, "devices", full, |item| {
        registry.construct(item)
    });
    outcome.created += devices.created;
    outcome
        .updated
        .extend(devices.updated.into_iter().map(UpdatedEntity::Device));

    apply_metadata(store, &root);
    outcome.cursor = store.cursor();

    trace!(
        full_snapshot,
        created = outcome.created,
        updated = outcome.updated.len(),
        cursor = %outcome.cursor,
        "merged lu_sdata"
    );
    Ok(Some(outcome))
}

struct Merged<T> {
    updated: Vec<Arc<T>>,
    created: usize,
}

/// Merge one collection by id. Items without a usable id are skipped.
fn merge<T: Entity>(
    collection: &EntityCollection<T>,
    root: &JsonObject,
    key: &str,
    replace: bool,
    construct: impl Fn(&JsonObject) -> Result<T, CoreError>,
) -> Merged<T> {
    let mut merged = Merged {
        updated: Vec::new(),
        created: 0,
    };

    let items: &[Value] = match root.get(key) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            warn!(key, kind = json_kind(other), "ignoring non-array collection");
            &[]
        }
        None => &[],
    };
    // A delta without this key leaves the collection alone.
    if items.is_empty() && !replace {
        return merged;
    }

    collection.batch(|map| {
        if replace {
            map.clear();
        }
        for item in items {
            let Value::Object(item) = item else {
                warn!(kind = T::KIND, "skipping non-object item");
                continue;
            };
            let Some(id) = value::id(item, "id") else {
                warn!(kind = T::KIND, "skipping item without a numeric id");
                continue;
            };

            let existing = map.get(&id).map(|entry| Arc::clone(entry.value()));
            match existing {
                Some(current) => {
                    let mut next = T::clone(&current);
                    if next.update(item) {
                        let next = Arc::new(next);
                        map.insert(id, Arc::clone(&next));
                        merged.updated.push(next);
                    }
                }
                None => match construct(item) {
                    Ok(entity) => {
                        map.insert(id, Arc::new(entity));
                        merged.created += 1;
                    }
                    Err(e) => warn!(kind = T::KIND, error = %e, "skipping item"),
                },
            }
        }
    });

    merged
}

/// Refresh hub-wide fields for the keys present in `root`.
fn apply_metadata(store: &DataStore, root: &JsonObject) {
    store.hub.send_modify(|hub| {
        if value::int(root, "full") == Some(1) {
            if let Some(model) = value::text(root, "model") {
                hub.model = Some(model);
            }
            if let Some(serial) = value::text(root, "serial_number") {
                hub.serial_number = Some(serial);
            }
            if let Some(unit) = value::text(root, "temperature") {
                hub.temperature_unit = Some(unit);
            }
            if let Some(version) = value::text(root, "version") {
                hub.version = Some(version);
            }
        }

        if let Some(state) = value::int(root, "state") {
            hub.state = HubState::from_code(state);
        }
        if let Some(comment) = value::text(root, "comment") {
            hub.comment = comment;
        }
        if let Some(loadtime) = value::int(root, "loadtime") {
            hub.cursor.loadtime = loadtime;
        }
        if let Some(dataversion) = value::int(root, "dataversion") {
            hub.cursor.dataversion = dataversion;
        }
        if let Some(mode) = value::int(root, "mode") {
            hub.house_mode = HouseMode::from_code(mode);
        }

        hub.last_update = Some(Utc::now());
    });
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
