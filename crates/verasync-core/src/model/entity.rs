// ── Entity contract ──

use serde_json::Value;

use super::value;
use crate::error::CoreError;

/// A JSON object as delivered by the hub.
pub type JsonObject = serde_json::Map<String, Value>;

/// Anything the sync engine merges by id.
///
/// Entities never reference the controller or each other; relations are
/// plain ids resolved through the `DataStore`.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Collection name used in logs (`"device"`, `"room"`, ...).
    const KIND: &'static str;

    fn id(&self) -> u32;

    fn name(&self) -> &str;

    /// Every field the hub has reported for this entity, latest values.
    fn fields(&self) -> &JsonObject;

    /// Apply the keys present in `item`, leaving the others untouched.
    /// Returns `true` if any value actually changed.
    fn update(&mut self, item: &JsonObject) -> bool;
}

/// Merge `item` into `fields`. Returns `true` if anything changed.
pub(crate) fn merge_fields(fields: &mut JsonObject, item: &JsonObject) -> bool {
    let mut changed = false;
    for (key, value) in item {
        if fields.get(key) != Some(value) {
            fields.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Read the mandatory `id` of an item.
pub(crate) fn require_id(fields: &JsonObject, kind: &str) -> Result<u32, CoreError> {
    value::id(fields, "id").ok_or_else(|| CoreError::Protocol {
        message: format!("{kind} without a numeric id: {}", Value::Object(fields.clone())),
    })
}
