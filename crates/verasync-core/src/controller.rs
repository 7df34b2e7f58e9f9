// ── Controller ──
//
// One mirrored hub session: the connection, the entity store, the
// background lu_sdata loop and the notification channel. Every operation
// is async; blocking wrappers belong to the outermost caller.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use verasync_api::{Connection, HubResponse};

use crate::backoff::Backoff;
use crate::config::{HubConfig, SyncConfig};
use crate::error::CoreError;
use crate::event::SyncEvent;
use crate::model::{Category, Device, HouseMode, HubInfo, Room, Scene, Section};
use crate::registry::DeviceRegistry;
use crate::requests::SceneRequest;
use crate::session;
use crate::store::{DataStore, apply_sync};
use crate::stream::EntityStream;

const HOME_AUTOMATION_GATEWAY: &str = "urn:micasaverde-com:serviceId:HomeAutomationGateway1";

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. The background loop only
/// holds a weak handle, so dropping the last `Controller` stops it.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    connection: Connection,
    registry: DeviceRegistry,
    sync: SyncConfig,
    store: Arc<DataStore>,
    event_tx: broadcast::Sender<SyncEvent>,
    listening: watch::Sender<bool>,
    /// Serializes lu_sdata polls: the loop and manual refreshes never
    /// write the store concurrently.
    poll_lock: Mutex<()>,
    listener: Mutex<Option<Listener>>,
}

struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.cancel.cancel();
        }
    }
}

impl Controller {
    /// Create a controller over `connection` with the built-in device
    /// registry. Does NOT contact the hub.
    pub fn new(connection: Connection, sync: SyncConfig) -> Self {
        Self::with_registry(connection, DeviceRegistry::builtin(), sync)
    }

    /// Create a controller that materializes devices through `registry`.
    pub fn with_registry(connection: Connection, registry: DeviceRegistry, sync: SyncConfig) -> Self {
        let (event_tx, _) = broadcast::channel(sync.event_capacity.max(1));
        let (listening, _) = watch::channel(false);

        Self {
            inner: Arc::new(ControllerInner {
                connection,
                registry,
                sync,
                store: Arc::new(DataStore::new()),
                event_tx,
                listening,
                poll_lock: Mutex::new(()),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Open the connection described by `config` (running the cloud
    /// cascade if needed) and wrap it in a stopped controller.
    pub async fn connect(config: &HubConfig) -> Result<Self, CoreError> {
        let connection = session::open(config).await?;
        info!(hub = %connection.kind(), "hub connection ready");
        Ok(Self::new(connection, config.sync.clone()))
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    // ── Listening lifecycle ──────────────────────────────────────

    pub fn is_listening(&self) -> bool {
        *self.inner.listening.borrow()
    }

    /// Start the background sync loop.
    ///
    /// No-op when already listening. Fails without starting when the hub
    /// does not answer the liveness probe. With an initial cursor, one
    /// full-snapshot poll runs before this returns and its failure is
    /// returned to the caller.
    pub async fn start_listening(&self) -> Result<(), CoreError> {
        let mut listener = self.inner.listener.lock().await;
        if listener.is_some() {
            debug!("already listening");
            return Ok(());
        }

        self.inner.probe().await?;
        if self.inner.store.cursor().is_initial() {
            self.inner.poll().await?;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(listen_task(Arc::downgrade(&self.inner), cancel.clone()));
        *listener = Some(Listener { cancel, handle });
        self.inner.listening.send_replace(true);
        info!(hub = %self.inner.connection.kind(), "listening for hub changes");
        Ok(())
    }

    /// Stop the background sync loop and wait for it to exit.
    ///
    /// No-op when stopped. An in-flight request is abandoned, not reported.
    pub async fn stop_listening(&self) {
        let Some(listener) = self.inner.listener.lock().await.take() else {
            return;
        };
        listener.cancel.cancel();
        if let Err(e) = listener.handle.await {
            warn!(error = %e, "sync task ended abnormally");
        }
        self.inner.listening.send_replace(false);
        info!("stopped listening");
    }

    // ── Manual synchronization ───────────────────────────────────

    /// Fetch a complete snapshot once. Only allowed while stopped.
    pub async fn full_refresh(&self) -> Result<(), CoreError> {
        self.ensure_stopped("refresh")?;
        self.inner.probe().await?;
        self.inner.store.reset_cursor();
        self.inner.poll().await?;

        debug!(
            devices = self.inner.store.device_count(),
            scenes = self.inner.store.scene_count(),
            rooms = self.inner.store.room_count(),
            "full refresh complete"
        );
        Ok(())
    }

    /// Make the next poll a full snapshot. Only allowed while stopped.
    pub fn demand_full_snapshot(&self) -> Result<(), CoreError> {
        self.ensure_stopped("request a full snapshot")?;
        self.inner.store.reset_cursor();
        Ok(())
    }

    fn ensure_stopped(&self, operation: &str) -> Result<(), CoreError> {
        if self.is_listening() {
            return Err(CoreError::ListenerRunning {
                operation: operation.into(),
            });
        }
        Ok(())
    }

    // ── One-shot actions ─────────────────────────────────────────

    /// Liveness probe (`lu_alive`).
    pub async fn is_alive(&self) -> bool {
        match self.inner.probe().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Query the house mode, emitting `HouseModeChanged` if it moved.
    pub async fn request_house_mode(&self) -> Result<HouseMode, CoreError> {
        self.inner.refresh_house_mode().await
    }

    pub async fn set_house_mode(&self, mode: HouseMode) -> Result<(), CoreError> {
        if !mode.is_settable() {
            return Err(CoreError::ValidationFailed {
                message: format!("house mode {mode} cannot be set"),
            });
        }
        let code = mode.code().to_string();
        let resp = self
            .inner
            .request(&[
                ("id", "lu_action"),
                ("serviceId", HOME_AUTOMATION_GATEWAY),
                ("action", "SetHouseMode"),
                ("Mode", &code),
            ])
            .await?;

        if !resp.body.contains("<OK>OK</OK>") {
            return Err(rejected(&resp));
        }
        info!(%mode, "house mode change requested");
        Ok(())
    }

    /// Create a room, then poll once so it shows up in the store.
    ///
    /// Returns the new room, or `None` if the follow-up poll failed or
    /// did not report it.
    pub async fn create_room(&self, name: &str) -> Result<Option<Arc<Room>>, CoreError> {
        let name = validate_room_name(name)?;
        let resp = self
            .inner
            .request(&[("id", "room"), ("action", "create"), ("name", name)])
            .await?;
        if !resp.body.contains("OK") {
            return Err(rejected(&resp));
        }
        info!(name, "room created");

        if let Err(e) = self.inner.poll().await {
            warn!(error = %e, "poll after room creation failed");
            return Ok(None);
        }
        Ok(self.inner.store.room_by_name(name))
    }

    pub async fn rename_room(&self, id: u32, name: &str) -> Result<Arc<Room>, CoreError> {
        let name = validate_room_name(name)?;
        if self.inner.store.room(id).is_none() {
            return Err(CoreError::RoomNotFound { id });
        }
        let room = id.to_string();
        let resp = self
            .inner
            .request(&[("id", "room"), ("action", "rename"), ("room", &room), ("name", name)])
            .await?;
        if !resp.body.contains("OK") {
            return Err(rejected(&resp));
        }
        info!(id, name, "room renamed");

        self.inner
            .store
            .rename_room(id, name)
            .ok_or(CoreError::RoomNotFound { id })
    }

    pub async fn delete_room(&self, id: u32) -> Result<(), CoreError> {
        if self.inner.store.room(id).is_none() {
            return Err(CoreError::RoomNotFound { id });
        }
        let room = id.to_string();
        let resp = self
            .inner
            .request(&[("id", "room"), ("action", "delete"), ("room", &room)])
            .await?;
        if !resp.body.contains("OK") {
            return Err(rejected(&resp));
        }
        self.inner.store.remove_room(id);
        info!(id, "room deleted");
        Ok(())
    }

    /// Create a scene from a built request, then poll once so it shows up
    /// in the store.
    ///
    /// The target room must be known locally. Returns the new scene, or
    /// `None` if the follow-up poll failed or did not report it.
    pub async fn create_scene(
        &self,
        request: &SceneRequest,
    ) -> Result<Option<Arc<Scene>>, CoreError> {
        let room = request.room();
        if self.inner.store.room(room).is_none() {
            return Err(CoreError::RoomNotFound { id: room });
        }
        let json = request.to_json()?;
        let resp = self
            .inner
            .request(&[("id", "scene"), ("action", "create"), ("json", &json)])
            .await?;
        if !resp.body.contains("OK") {
            return Err(rejected(&resp));
        }
        info!(name = request.name(), room, "scene created");

        if let Err(e) = self.inner.poll().await {
            warn!(error = %e, "poll after scene creation failed");
            return Ok(None);
        }
        Ok(self
            .inner
            .store
            .scenes_in_room(room)
            .into_iter()
            .find(|s| s.name == request.name()))
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to sync notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn hub_info(&self) -> HubInfo {
        self.inner.store.hub_info()
    }

    pub fn house_mode(&self) -> HouseMode {
        self.inner.store.house_mode()
    }

    // ── Snapshot accessors (delegate to DataStore) ───────────────

    pub fn sections_snapshot(&self) -> Arc<Vec<Arc<Section>>> {
        self.inner.store.sections_snapshot()
    }

    pub fn rooms_snapshot(&self) -> Arc<Vec<Arc<Room>>> {
        self.inner.store.rooms_snapshot()
    }

    pub fn categories_snapshot(&self) -> Arc<Vec<Arc<Category>>> {
        self.inner.store.categories_snapshot()
    }

    pub fn scenes_snapshot(&self) -> Arc<Vec<Arc<Scene>>> {
        self.inner.store.scenes_snapshot()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.inner.store.devices_snapshot()
    }

    // ── Stream accessors (delegate to DataStore) ─────────────────

    pub fn rooms(&self) -> EntityStream<Room> {
        self.inner.store.subscribe_rooms()
    }

    pub fn scenes(&self) -> EntityStream<Scene> {
        self.inner.store.subscribe_scenes()
    }

    pub fn devices(&self) -> EntityStream<Device> {
        self.inner.store.subscribe_devices()
    }
}

// ── Requests and polling ─────────────────────────────────────────

impl ControllerInner {
    /// Send one hub request and announce it.
    async fn request(&self, params: &[(&str, &str)]) -> Result<HubResponse, CoreError> {
        let resp = self.connection.data_request(params).await?;
        let _ = self.event_tx.send(SyncEvent::DataSent {
            path: resp.path.clone(),
            length: resp.length(),
        });
        Ok(resp)
    }

    async fn probe(&self) -> Result<(), CoreError> {
        let unreachable = |reason: String| CoreError::HubUnreachable {
            target: self.connection.kind().to_string(),
            reason,
        };
        let resp = self
            .request(&[("id", "lu_alive")])
            .await
            .map_err(|e| unreachable(e.to_string()))?;
        if resp.body.trim() != "OK" {
            return Err(unreachable(format!(
                "unexpected lu_alive answer {:?}",
                excerpt(&resp.body)
            )));
        }
        Ok(())
    }

    /// One lu_sdata request plus merge.
    async fn poll(&self) -> Result<(), CoreError> {
        let _guard = self.poll_lock.lock().await;

        let cursor = self.store.cursor();
        let loadtime = cursor.loadtime.to_string();
        let dataversion = cursor.dataversion.to_string();
        let minimum_delay = self.sync.minimum_delay.as_millis().to_string();
        let timeout = self.sync.poll_timeout.as_secs().to_string();

        let resp = self
            .request(&[
                ("id", "lu_sdata"),
                ("loadtime", &loadtime),
                ("dataversion", &dataversion),
                ("minimumdelay", &minimum_delay),
                ("timeout", &timeout),
            ])
            .await?;

        let Some(outcome) = apply_sync(&self.store, &self.registry, &resp.body, cursor.is_initial())?
        else {
            debug!("empty lu_sdata response");
            return Ok(());
        };

        for entity in outcome.updated {
            let _ = self.event_tx.send(SyncEvent::EntityUpdated(entity));
        }
        let length = resp.body.len();
        let _ = self.event_tx.send(SyncEvent::DataReceived {
            body: Arc::from(resp.body),
            length,
            cursor: outcome.cursor,
        });
        Ok(())
    }

    async fn refresh_house_mode(&self) -> Result<HouseMode, CoreError> {
        let resp = self
            .request(&[("id", "variableget"), ("Variable", "Mode")])
            .await?;
        let code: i64 = resp.body.trim().parse().map_err(|_| CoreError::Protocol {
            message: format!("house mode is not a number: {:?}", excerpt(&resp.body)),
        })?;

        let mode = HouseMode::from_code(code);
        if let Some(old) = self.store.replace_house_mode(mode) {
            info!(%old, new = %mode, "house mode changed");
            let _ = self
                .event_tx
                .send(SyncEvent::HouseModeChanged { old, new: mode });
        }
        Ok(mode)
    }

    /// One loop iteration: poll, then house mode.
    async fn iteration(&self) -> Result<(), CoreError> {
        self.poll().await?;
        self.refresh_house_mode().await?;
        Ok(())
    }
}

// ── Background task ──────────────────────────────────────────────

/// Poll until cancelled, backing off after failures.
///
/// Cancellation is observed at the iteration boundary and while a
/// request or sleep is pending.
async fn listen_task(inner: Weak<ControllerInner>, cancel: CancellationToken) {
    let Some(sync) = inner.upgrade().map(|ctrl| ctrl.sync.clone()) else {
        return;
    };
    let mut backoff = Backoff::new(sync.backoff_base, sync.backoff_ceiling);

    loop {
        let Some(ctrl) = inner.upgrade() else { break };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = ctrl.iteration() => result,
        };

        let delay = match result {
            Ok(()) => {
                backoff.reset();
                sync.request_pause
            }
            Err(e) => {
                let delay = backoff.fail();
                warn!(
                    error = %e,
                    failures = backoff.count(),
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "sync iteration failed"
                );
                let _ = ctrl.event_tx.send(SyncEvent::Error(Arc::new(e)));
                delay
            }
        };
        drop(ctrl);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!("sync loop exited");
}

// ── Helpers ──────────────────────────────────────────────────────

fn validate_room_name(name: &str) -> Result<&str, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: "room name must not be empty".into(),
        });
    }
    Ok(name)
}

fn rejected(resp: &HubResponse) -> CoreError {
    CoreError::Rejected {
        message: format!("{} answered {:?}", resp.path, excerpt(&resp.body)),
    }
}

/// First line of a body, shortened for error messages.
fn excerpt(body: &str) -> String {
    let line = body.trim().lines().next().unwrap_or_default();
    if line.chars().count() > 80 {
        let short: String = line.chars().take(80).collect();
        format!("{short}...")
    } else {
        line.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_are_trimmed_and_required() {
        assert_eq!(validate_room_name("  Den ").ok(), Some("Den"));
        assert!(matches!(
            validate_room_name("   "),
            Err(CoreError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn excerpt_keeps_the_first_line_short() {
        assert_eq!(excerpt("ERROR: nope\nmore"), "ERROR: nope");
        let long = "x".repeat(200);
        assert_eq!(excerpt(&long).len(), 83);
    }
}
