// ── Device categories ──

use std::fmt;

use serde::{Serialize, Serializer};

use super::entity::{Entity, JsonObject, merge_fields, require_id};
use super::value;
use crate::error::CoreError;

/// Luup device category code (the `category` field of a device).
///
/// Only used as a lookup key when materializing devices; see
/// [`DeviceRegistry`](crate::registry::DeviceRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCategory {
    Interface,
    DimmableLight,
    Switch,
    SecuritySensor,
    Thermostat,
    DoorLock,
    WindowCovering,
    SceneController,
    HumiditySensor,
    TemperatureSensor,
    PowerMeter,
    Other(u32),
}

impl DeviceCategory {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Interface,
            2 => Self::DimmableLight,
            3 => Self::Switch,
            4 => Self::SecuritySensor,
            5 => Self::Thermostat,
            7 => Self::DoorLock,
            8 => Self::WindowCovering,
            14 => Self::SceneController,
            16 => Self::HumiditySensor,
            17 => Self::TemperatureSensor,
            21 => Self::PowerMeter,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Interface => 1,
            Self::DimmableLight => 2,
            Self::Switch => 3,
            Self::SecuritySensor => 4,
            Self::Thermostat => 5,
            Self::DoorLock => 7,
            Self::WindowCovering => 8,
            Self::SceneController => 14,
            Self::HumiditySensor => 16,
            Self::TemperatureSensor => 17,
            Self::PowerMeter => 21,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interface => "interface",
            Self::DimmableLight => "dimmable light",
            Self::Switch => "switch",
            Self::SecuritySensor => "security sensor",
            Self::Thermostat => "thermostat",
            Self::DoorLock => "door lock",
            Self::WindowCovering => "window covering",
            Self::SceneController => "scene controller",
            Self::HumiditySensor => "humidity sensor",
            Self::TemperatureSensor => "temperature sensor",
            Self::PowerMeter => "power meter",
            Self::Other(code) => return write!(f, "category {code}"),
        };
        f.write_str(name)
    }
}

impl Serialize for DeviceCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A category as listed by the hub (id + display name).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
    #[serde(skip)]
    fields: JsonObject,
}

impl Category {
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

    /// The well-known category this entry describes.
    pub fn category(&self) -> DeviceCategory {
        DeviceCategory::from_code(self.id)
    }
}

impl Entity for Category {
    const KIND: &'static str = "category";

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
