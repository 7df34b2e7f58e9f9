// ── Device category registry ──
//
// Maps a Luup category code to the factory that builds the
// category-specific `DeviceKind`. The table is a plain value handed to
// the `Controller` at construction; nothing is discovered at runtime.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use tracing::trace;

use crate::error::CoreError;
use crate::model::{Device, DeviceCategory, DeviceKind, JsonObject};
use crate::model::value;

/// Builds the category-specific shape of a newly observed device.
pub type DeviceFactory = fn(&JsonObject) -> DeviceKind;

/// Every category with a dedicated shape.
const BUILTIN: &[(DeviceCategory, DeviceFactory)] = &[
    (DeviceCategory::Interface, DeviceKind::interface),
    (DeviceCategory::DimmableLight, DeviceKind::dimmable_light),
    (DeviceCategory::Switch, DeviceKind::switch),
    (DeviceCategory::SecuritySensor, DeviceKind::security_sensor),
    (DeviceCategory::Thermostat, DeviceKind::thermostat),
    (DeviceCategory::DoorLock, DeviceKind::door_lock),
    (DeviceCategory::WindowCovering, DeviceKind::window_covering),
    (DeviceCategory::SceneController, DeviceKind::scene_controller),
    (DeviceCategory::HumiditySensor, DeviceKind::humidity_sensor),
    (DeviceCategory::TemperatureSensor, DeviceKind::temperature_sensor),
    (DeviceCategory::PowerMeter, DeviceKind::power_meter),
];

/// Category code → device factory.
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    factories: HashMap<u32, DeviceFactory>,
}

impl DeviceRegistry {
    /// A registry with no entries; every device gets the generic shape.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full table of known categories.
    pub fn builtin() -> Self {
        BUILTIN
            .iter()
            .fold(Self::empty(), |registry, (category, factory)| {
                registry.with(category.code(), *factory)
            })
    }

    /// Register `factory` for `code`. The first registration for a code
    /// wins; returns `false` if the code was already taken.
    pub fn register(&mut self, code: u32, factory: DeviceFactory) -> bool {
        match self.factories.entry(code) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(factory);
                true
            }
        }
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, code: u32, factory: DeviceFactory) -> Self {
        self.register(code, factory);
        self
    }

    pub fn factory(&self, code: u32) -> Option<DeviceFactory> {
        self.factories.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Materialize a device, using the factory mapped to its `category`
    /// or the generic shape for unmapped codes.
    pub fn construct(&self, item: &JsonObject) -> Result<Device, CoreError> {
        let code = value::id(item, "category").unwrap_or(0);
        let factory = self.factory(code).unwrap_or_else(|| {
            trace!(category = code, "no factory registered, using generic shape");
            DeviceKind::generic
        });
        Device::build(item, factory)
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.factories.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("DeviceRegistry")
            .field("codes", &codes)
            .finish()
    }
}
