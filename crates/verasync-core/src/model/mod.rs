// ── Hub domain model ──
//
// Canonical representations of everything the hub reports through
// `lu_sdata`. Entities keep every field the hub ever sent in `fields`;
// the typed accessors are projections of that map, rebuilt on change.

pub mod category;
pub mod device;
pub mod entity;
pub mod hub;
pub mod room;
pub mod scene;
pub(crate) mod value;

// ── Re-exports ──────────────────────────────────────────────────────

pub use category::{Category, DeviceCategory};
pub use device::{Device, DeviceKind};
pub use entity::{Entity, JsonObject};
pub use hub::{HouseMode, HubInfo, HubState, SyncCursor};
pub use room::{Room, Section};
pub use scene::Scene;
