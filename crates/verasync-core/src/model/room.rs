// ── Sections and rooms ──

use serde::Serialize;

use super::entity::{Entity, JsonObject, merge_fields, require_id};
use super::value;
use crate::error::CoreError;

/// A group of rooms (e.g. a floor or a building).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: u32,
    pub name: String,
    #[serde(skip)]
    fields: JsonObject,
}

impl Section {
    pub fn from_json(item: &JsonObject) -> Result<Self, CoreError> {
        Self::project(item.clone())
    }

    fn project(fields: JsonObject) -> Result<Self, CoreError> {
        Ok(Self {
            id: require_id(&fields, Self::KIND)?,
            name: value::text(&fields, "name").unwrap_or_default(),
            fields,
        })
    }
}

impl Entity for Section {
    const KIND: &'static str = "section";

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

/// A room. Devices and scenes point at it through their `room_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: u32,
    pub name: String,
    /// Owning section, if the hub assigned one.
    pub section_id: Option<u32>,
    #[serde(skip)]
    fields: JsonObject,
}

impl Room {
    pub fn from_json(item: &JsonObject) -> Result<Self, CoreError> {
        Self::project(item.clone())
    }

    fn project(fields: JsonObject) -> Result<Self, CoreError> {
        Ok(Self {
            id: require_id(&fields, Self::KIND)?,
            name: value::text(&fields, "name").unwrap_or_default(),
            section_id: value::reference(&fields, "section"),
            fields,
        })
    }
}

impl Entity for Room {
    const KIND: &'static str = "room";

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
