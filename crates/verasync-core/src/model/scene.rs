// ── Scenes ──

use serde::Serialize;

use super::entity::{Entity, JsonObject, merge_fields, require_id};
use super::value;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub id: u32,
    pub name: String,
    pub room_id: Option<u32>,
    /// Whether the scene's devices currently match its definition.
    pub active: bool,
    /// Luup job state of the last run, if reported.
    pub state: Option<i64>,
    pub comment: String,
    #[serde(rename = "raw")]
    fields: JsonObject,
}

impl Scene {
    pub fn from_json(item: &JsonObject) -> Result<Self, CoreError> {
        Self::project(item.clone())
    }

    fn project(fields: JsonObject) -> Result<Self, CoreError> {
        Ok(Self {
            id: require_id(&fields, Self::KIND)?,
            name: value::text(&fields, "name").unwrap_or_default(),
            room_id: value::reference(&fields, "room"),
            active: value::flag(&fields, "active"),
            state: value::int(&fields, "state"),
            comment: value::text(&fields, "comment").unwrap_or_default(),
            fields,
        })
    }
}

impl Entity for Scene {
    const KIND: &'static str = "scene";

    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &JsonObject {
        &self.fields
    }

    fn update(&mut self, item: &JsonObject) -> bool {
        let mut fields = self.fields.clone();
        if !merge_fields(&mut fields, item) {
            return false;
        }
        match Self::project(fields) {
            Ok(next) => {
                *self = next;
                true
            }
            Err(_) => false,
        }
    }
}
