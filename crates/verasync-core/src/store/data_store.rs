// ── Central reactive data store ──
//
// Thread-safe storage for everything mirrored from the hub. The poll
// loop is the only writer; any number of readers take `Arc` snapshots or
// subscribe to changes through `watch` channels.

use std::sync::Arc;

use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{
    Category, Device, Entity, HouseMode, HubInfo, JsonObject, Room, Scene, Section, SyncCursor,
};
use crate::stream::EntityStream;

/// Central reactive store for all hub entities and hub-wide state.
///
/// Entities reference each other by id only; the relation lookups below
/// resolve those ids against the store's own collections.
pub struct DataStore {
    pub(crate) sections: EntityCollection<Section>,
    pub(crate) rooms: EntityCollection<Room>,
    pub(crate) categories: EntityCollection<Category>,
    pub(crate) scenes: EntityCollection<Scene>,
    pub(crate) devices: EntityCollection<Device>,
    pub(crate) hub: watch::Sender<HubInfo>,
}

impl DataStore {
    pub fn new() -> Self {
        let (hub, _) = watch::channel(HubInfo::default());

        Self {
            sections: EntityCollection::new(),
            rooms: EntityCollection::new(),
            categories: EntityCollection::new(),
            scenes: EntityCollection::new(),
            devices: EntityCollection::new(),
            hub,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn sections_snapshot(&self) -> Arc<Vec<Arc<Section>>> {
        self.sections.snapshot()
    }

    pub fn rooms_snapshot(&self) -> Arc<Vec<Arc<Room>>> {
        self.rooms.snapshot()
    }

    pub fn categories_snapshot(&self) -> Arc<Vec<Arc<Category>>> {
        self.categories.snapshot()
    }

    pub fn scenes_snapshot(&self) -> Arc<Vec<Arc<Scene>>> {
        self.scenes.snapshot()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.devices.snapshot()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn section(&self, id: u32) -> Option<Arc<Section>> {
        self.sections.get(id)
    }

    pub fn room(&self, id: u32) -> Option<Arc<Room>> {
        self.rooms.get(id)
    }

    pub fn category(&self, id: u32) -> Option<Arc<Category>> {
        self.categories.get(id)
    }

    pub fn scene(&self, id: u32) -> Option<Arc<Scene>> {
        self.scenes.get(id)
    }

    pub fn device(&self, id: u32) -> Option<Arc<Device>> {
        self.devices.get(id)
    }

    // ── Relation lookups ─────────────────────────────────────────────

    pub fn section_of(&self, room: &Room) -> Option<Arc<Section>> {
        room.section_id.and_then(|id| self.sections.get(id))
    }

    pub fn room_of(&self, device: &Device) -> Option<Arc<Room>> {
        device.room_id.and_then(|id| self.rooms.get(id))
    }

    pub fn room_of_scene(&self, scene: &Scene) -> Option<Arc<Room>> {
        scene.room_id.and_then(|id| self.rooms.get(id))
    }

    pub fn parent_of(&self, device: &Device) -> Option<Arc<Device>> {
        device.parent_id.and_then(|id| self.devices.get(id))
    }

    pub fn devices_in_room(&self, room_id: u32) -> Vec<Arc<Device>> {
        self.devices
            .snapshot()
            .iter()
            .filter(|d| d.room_id == Some(room_id))
            .cloned()
            .collect()
    }

    pub fn scenes_in_room(&self, room_id: u32) -> Vec<Arc<Scene>> {
        self.scenes
            .snapshot()
            .iter()
            .filter(|s| s.room_id == Some(room_id))
            .cloned()
            .collect()
    }

    /// First room whose name matches exactly.
    pub fn room_by_name(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms
            .snapshot()
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    // ── Count accessors ──────────────────────────────────────────────

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // ── Hub-wide state ───────────────────────────────────────────────

    pub fn hub_info(&self) -> HubInfo {
        self.hub.borrow().clone()
    }

    pub fn cursor(&self) -> SyncCursor {
        self.hub.borrow().cursor
    }

    pub fn house_mode(&self) -> HouseMode {
        self.hub.borrow().house_mode
    }

    /// Forget the cursor so the next poll asks for a full snapshot.
    pub(crate) fn reset_cursor(&self) {
        self.hub
            .send_modify(|hub| hub.cursor = SyncCursor::INITIAL);
    }

    /// Store `mode`; returns the previous mode if it differed.
    pub(crate) fn replace_house_mode(&self, mode: HouseMode) -> Option<HouseMode> {
        let mut previous = None;
        self.hub.send_if_modified(|hub| {
            if hub.house_mode == mode {
                return false;
            }
            previous = Some(hub.house_mode);
            hub.house_mode = mode;
            true
        });
        previous
    }

    // ── Local edits after successful one-shot actions ────────────────

    pub(crate) fn rename_room(&self, id: u32, name: &str) -> Option<Arc<Room>> {
        let mut room = Room::clone(&*self.rooms.get(id)?);
        let mut delta = JsonObject::new();
        delta.insert("name".into(), name.into());
        room.update(&delta);
        self.rooms.upsert(id, room);
        self.rooms.get(id)
    }

    pub(crate) fn remove_room(&self, id: u32) -> Option<Arc<Room>> {
        self.rooms.remove(id)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_rooms(&self) -> EntityStream<Room> {
        EntityStream::new(self.rooms.subscribe())
    }

    pub fn subscribe_scenes(&self) -> EntityStream<Scene> {
        EntityStream::new(self.scenes.subscribe())
    }

    pub fn subscribe_devices(&self) -> EntityStream<Device> {
        EntityStream::new(self.devices.subscribe())
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
