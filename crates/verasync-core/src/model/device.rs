// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::category::DeviceCategory;
use super::entity::{Entity, JsonObject, merge_fields, require_id};
use super::value;
use crate::error::CoreError;

/// Category-specific view of a device's state.
///
/// The variant is chosen once, when the device is first seen, by the
/// factory registered for its category code. Later deltas refresh the
/// values but never change the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceKind {
    /// No category-specific shape (unregistered category code).
    Generic,
    Interface,
    DimmableLight {
        on: bool,
        level: u8,
    },
    Switch {
        on: bool,
    },
    SecuritySensor {
        armed: bool,
        tripped: bool,
        last_trip: Option<DateTime<Utc>>,
    },
    Thermostat {
        mode: Option<String>,
        heat_setpoint: Option<f64>,
        cool_setpoint: Option<f64>,
        temperature: Option<f64>,
    },
    DoorLock {
        locked: bool,
    },
    WindowCovering {
        level: u8,
    },
    SceneController,
    HumiditySensor {
        humidity: Option<f64>,
    },
    TemperatureSensor {
        temperature: Option<f64>,
    },
    PowerMeter {
        watts: Option<f64>,
        kwh: Option<f64>,
    },
}

// ── Factories ───────────────────────────────────────────────────────
// Each one matches `registry::DeviceFactory`.

impl DeviceKind {
    pub fn generic(_fields: &JsonObject) -> Self {
        Self::Generic
    }

    pub fn interface(_fields: &JsonObject) -> Self {
        Self::Interface
    }

    pub fn dimmable_light(fields: &JsonObject) -> Self {
        Self::DimmableLight {
            on: value::flag(fields, "status"),
            level: value::percent(fields, "level"),
        }
    }

    pub fn switch(fields: &JsonObject) -> Self {
        Self::Switch {
            on: value::flag(fields, "status"),
        }
    }

    pub fn security_sensor(fields: &JsonObject) -> Self {
        Self::SecuritySensor {
            armed: value::flag(fields, "armed"),
            tripped: value::flag(fields, "tripped"),
            last_trip: value::timestamp(fields, "lasttrip"),
        }
    }

    pub fn thermostat(fields: &JsonObject) -> Self {
        Self::Thermostat {
            mode: value::text(fields, "mode"),
            heat_setpoint: value::float(fields, "heatsp").or_else(|| value::float(fields, "setpoint")),
            cool_setpoint: value::float(fields, "coolsp"),
            temperature: value::float(fields, "temperature"),
        }
    }

    pub fn door_lock(fields: &JsonObject) -> Self {
        Self::DoorLock {
            locked: value::flag(fields, "locked"),
        }
    }

    pub fn window_covering(fields: &JsonObject) -> Self {
        Self::WindowCovering {
            level: value::percent(fields, "level"),
        }
    }

    pub fn scene_controller(_fields: &JsonObject) -> Self {
        Self::SceneController
    }

    pub fn humidity_sensor(fields: &JsonObject) -> Self {
        Self::HumiditySensor {
            humidity: value::float(fields, "humidity"),
        }
    }

    pub fn temperature_sensor(fields: &JsonObject) -> Self {
        Self::TemperatureSensor {
            temperature: value::float(fields, "temperature"),
        }
    }

    pub fn power_meter(fields: &JsonObject) -> Self {
        Self::PowerMeter {
            watts: value::float(fields, "watts"),
            kwh: value::float(fields, "kwh"),
        }
    }

    /// Re-read the values of the current variant from `fields`.
    fn refresh(&mut self, fields: &JsonObject) {
        *self = match self {
            Self::Generic | Self::Interface | Self::SceneController => return,
            Self::DimmableLight { .. } => Self::dimmable_light(fields),
            Self::Switch { .. } => Self::switch(fields),
            Self::SecuritySensor { .. } => Self::security_sensor(fields),
            Self::Thermostat { .. } => Self::thermostat(fields),
            Self::DoorLock { .. } => Self::door_lock(fields),
            Self::WindowCovering { .. } => Self::window_covering(fields),
            Self::HumiditySensor { .. } => Self::humidity_sensor(fields),
            Self::TemperatureSensor { .. } => Self::temperature_sensor(fields),
            Self::PowerMeter { .. } => Self::power_meter(fields),
        };
    }

    /// Short one-line rendering of the state, for tables.
    pub fn summary(&self) -> String {
        match self {
            Self::Generic | Self::Interface | Self::SceneController => String::new(),
            Self::DimmableLight { on, level } => {
                if *on {
                    format!("on {level}%")
                } else {
                    "off".into()
                }
            }
            Self::Switch { on } => if *on { "on" } else { "off" }.into(),
            Self::SecuritySensor { armed, tripped, .. } => format!(
                "{}{}",
                if *armed { "armed" } else { "disarmed" },
                if *tripped { ", tripped" } else { "" }
            ),
            Self::Thermostat {
                mode, temperature, ..
            } => format!(
                "{} {}",
                mode.as_deref().unwrap_or("-"),
                fmt_reading(*temperature, "°")
            ),
            Self::DoorLock { locked } => if *locked { "locked" } else { "unlocked" }.into(),
            Self::WindowCovering { level } => format!("{level}% open"),
            Self::HumiditySensor { humidity } => fmt_reading(*humidity, "%"),
            Self::TemperatureSensor { temperature } => fmt_reading(*temperature, "°"),
            Self::PowerMeter { watts, .. } => fmt_reading(*watts, " W"),
        }
    }
}

fn fmt_reading(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v}{unit}"))
}

// ── Device ──────────────────────────────────────────────────────────

/// A device reported by the hub.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: u32,
    pub name: String,
    /// Protocol-level address (Z-Wave node id, etc.).
    pub alt_id: String,
    pub category: DeviceCategory,
    pub subcategory: Option<u32>,
    pub room_id: Option<u32>,
    pub parent_id: Option<u32>,
    /// Luup job state of the device's last action, if reported.
    pub state: Option<i64>,
    pub comment: String,
    pub kind: DeviceKind,
    #[serde(rename = "raw")]
    fields: JsonObject,
}

impl Device {
    /// Build a device whose category-specific shape comes from `factory`.
    pub fn build(
        item: &JsonObject,
        factory: fn(&JsonObject) -> DeviceKind,
    ) -> Result<Self, CoreError> {
        let kind = factory(item);
        Self::project(item.clone(), kind)
    }

    /// Build a device with the generic shape.
    pub fn from_json(item: &JsonObject) -> Result<Self, CoreError> {
        Self::build(item, DeviceKind::generic)
    }

    fn project(fields: JsonObject, kind: DeviceKind) -> Result<Self, CoreError> {
        Ok(Self {
            id: require_id(&fields, Self::KIND)?,
            name: value::text(&fields, "name").unwrap_or_default(),
            alt_id: value::text(&fields, "altid").unwrap_or_default(),
            category: DeviceCategory::from_code(value::id(&fields, "category").unwrap_or(0)),
            subcategory: value::id(&fields, "subcategory"),
            room_id: value::reference(&fields, "room"),
            parent_id: value::reference(&fields, "parent"),
            state: value::int(&fields, "state"),
            comment: value::text(&fields, "comment").unwrap_or_default(),
            kind,
            fields,
        })
    }

    /// Raw `status` field, as most actuators report it.
    pub fn status(&self) -> Option<i64> {
        value::int(&self.fields, "status")
    }
}

impl Entity for Device {
    const KIND: &'static str = "device";

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
        let mut kind = self.kind.clone();
        kind.refresh(&fields);
        match Self::project(fields, kind) {
            Ok(next) => {
                *self = next;
                true
            }
            Err(_) => false,
        }
    }
}
