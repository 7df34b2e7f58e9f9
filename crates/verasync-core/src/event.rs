// ── Sync notifications ──
//
// The fixed set of typed events a `Controller` emits. Delivered over a
// `tokio::sync::broadcast` channel; a slow subscriber lags, it never
// stalls the poll loop.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{Device, HouseMode, Scene, SyncCursor};

/// An entity that changed in place during a poll.
#[derive(Debug, Clone)]
pub enum UpdatedEntity {
    Device(Arc<Device>),
    Scene(Arc<Scene>),
}

impl UpdatedEntity {
    pub fn id(&self) -> u32 {
        match self {
            Self::Device(d) => d.id,
            Self::Scene(s) => s.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Device(d) => &d.name,
            Self::Scene(s) => &s.name,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A hub request completed. `path` is relative to the connection's
    /// base URL and never contains credentials.
    DataSent { path: String, length: u64 },

    /// A `lu_sdata` response was merged.
    DataReceived {
        body: Arc<str>,
        length: usize,
        cursor: SyncCursor,
    },

    /// A poll iteration failed; the loop keeps going after backoff.
    Error(Arc<CoreError>),

    EntityUpdated(UpdatedEntity),

    /// The `variableget` house-mode query returned a different mode.
    ///
    /// Only that query raises this event. A `mode` key inside a `lu_sdata`
    /// response updates the stored mode without notifying, and the loop
    /// merges the poll before it queries the mode. On hubs that report
    /// `mode` in every delta the query therefore finds nothing new, and
    /// this event never fires. Read [`Controller::house_mode`] or watch
    /// `DataReceived` for those hubs.
    ///
    /// [`Controller::house_mode`]: crate::Controller::house_mode
    HouseModeChanged { old: HouseMode, new: HouseMode },
}
