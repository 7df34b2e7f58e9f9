// verasync-core: live mirror of a Vera / MiOS hub between verasync-api and consumers.

pub mod backoff;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod model;
pub mod registry;
pub mod requests;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{HubConfig, HubTarget, SyncConfig, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use event::{SyncEvent, UpdatedEntity};
pub use registry::{DeviceFactory, DeviceRegistry};
pub use requests::{
    DeviceCommand, DeviceControl, DeviceControlState, IntervalUnit, SceneBuilder, SceneRequest,
    SolarEvent, TimeOfDay, Timer, TimerSchedule, Trigger,
};
pub use store::DataStore;
pub use stream::{EntityStream, EntityWatchStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Category, Device, DeviceCategory, DeviceKind, Entity, HouseMode, HubInfo, HubState,
    JsonObject, Room, Scene, Section, SyncCursor,
};

// Connection types consumers need to build a controller by hand.
pub use verasync_api::{
    AccountDevice, CloudEndpoints, Connection, ConnectionKind, DeviceInfo, DEFAULT_AUTH_HOST,
    DEFAULT_LOCAL_PORT,
};
