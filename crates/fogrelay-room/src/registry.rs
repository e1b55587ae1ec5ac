//! Registry: issues room ids and secrets, authorizes publishers, and finds
//! rooms for players.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use fogrelay_protocol::RoomId;
use parking_lot::Mutex;

use crate::room::{Room, RoomInfo};
use crate::{
    PublishHandle, RegistryConfig, RelayMetrics, Replay, RoomError,
    SubscriptionQueue, generate_room_id, generate_secret,
};

/// Maps room ids to rooms. Cheap to clone; clones share the same rooms.
///
/// The map lock is held only while looking up, inserting, or removing a
/// room (plus the room's own short, non-blocking bookkeeping). Rooms are
/// removed only by their own actor task once they expire.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: RegistryConfig,
    metrics: Arc<RelayMetrics>,
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
}

impl Registry {
    /// Creates a registry with its own metrics.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] if `config` doesn't validate.
    pub fn new(config: RegistryConfig) -> Result<Self, RoomError> {
        Self::with_metrics(config, Arc::new(RelayMetrics::new()))
    }

    /// Creates a registry that reports into `metrics`.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] if `config` doesn't validate.
    pub fn with_metrics(
        config: RegistryConfig,
        metrics: Arc<RelayMetrics>,
    ) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RegistryInner {
                config,
                metrics,
                rooms: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.inner.metrics
    }

    /// Returns a handle to publish into a room.
    ///
    /// - Empty `id`: a fresh id and secret are generated and a new room is
    ///   created (`secret` is ignored).
    /// - Known `id`: `secret` must match the room's secret. The previous
    ///   handle is revoked and a new one returned.
    /// - Unknown `id`: a room is created with `id` and `secret` as given,
    ///   so a game master can reclaim a room that expired.
    ///
    /// Must be called from within a Tokio runtime (new rooms spawn a task).
    ///
    /// # Errors
    /// - [`RoomError::Unauthorized`] — wrong secret; nothing changed
    /// - [`RoomError::Overloaded`] — the generated id is already taken
    pub fn publish(
        &self,
        id: &str,
        secret: &str,
    ) -> Result<PublishHandle, RoomError> {
        let mut rooms = self.inner.rooms.lock();

        let (id, secret) = if id.is_empty() {
            self.inner.metrics.generated_room_ids.inc();
            let id = generate_room_id();
            if live_room(&rooms, &id).is_some() {
                tracing::warn!(room_id = %id, "generated room id collision");
                return Err(RoomError::Overloaded);
            }
            (id, generate_secret())
        } else {
            let id = RoomId::from(id);
            if let Some(room) = live_room(&rooms, &id) {
                if room.secret() != secret {
                    tracing::warn!(room_id = %id, "publish with wrong secret");
                    return Err(RoomError::Unauthorized);
                }
                return room.install_publisher();
            }
            (id, secret.to_string())
        };

        let (room, inbound) = Room::new(
            id.clone(),
            secret,
            &self.inner.config,
            Arc::clone(&self.inner.metrics),
        );
        let handle = room.install_publisher()?;

        // A closed room that hasn't removed itself yet is replaced; its
        // actor will find the new room in its slot and leave it alone.
        if rooms.insert(id.clone(), Arc::clone(&room)).is_none() {
            self.inner.metrics.stored_rooms.inc();
        }
        tracing::info!(room_id = %id, rooms = rooms.len(), "room created");
        drop(rooms);

        let registry = Arc::downgrade(&self.inner);
        let expiration = self.inner.config.expiration;
        tokio::spawn(async move {
            Arc::clone(&room).run(inbound, expiration).await;
            remove_room(&registry, &room);
        });

        Ok(handle)
    }

    /// Attaches a new subscription queue to an existing room.
    ///
    /// The replay snapshot holds the last message of every category at
    /// the moment of subscribing; deliver it before reading live messages.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if no live room has this id.
    pub fn subscribe(
        &self,
        id: &str,
    ) -> Result<(SubscriptionQueue, Replay), RoomError> {
        let rooms = self.inner.rooms.lock();
        let id = RoomId::from(id);
        let room = live_room(&rooms, &id).ok_or(RoomError::NotFound(id))?;
        room.attach_subscriber()
    }

    /// Returns info about a room.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if no room has this id.
    pub fn room_info(&self, id: &str) -> Result<RoomInfo, RoomError> {
        let rooms = self.inner.rooms.lock();
        let id = RoomId::from(id);
        rooms
            .get(&id)
            .map(|room| room.info())
            .ok_or(RoomError::NotFound(id))
    }

    /// Returns `true` if the registry holds a room with this id.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.rooms.lock().contains_key(&RoomId::from(id))
    }

    /// Returns the number of rooms held.
    pub fn room_count(&self) -> usize {
        self.inner.rooms.lock().len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("rooms", &self.inner.rooms.lock().len())
            .finish()
    }
}

/// Looks up a room that hasn't closed yet.
fn live_room<'a>(
    rooms: &'a HashMap<RoomId, Arc<Room>>,
    id: &RoomId,
) -> Option<&'a Arc<Room>> {
    rooms.get(id).filter(|room| !room.is_closed())
}

/// Called by a room's actor task after the room closed. Removes the entry
/// only if it still points at this room.
fn remove_room(registry: &Weak<RegistryInner>, room: &Arc<Room>) {
    let Some(inner) = registry.upgrade() else {
        return;
    };
    let mut rooms = inner.rooms.lock();
    let ours = rooms
        .get(room.id())
        .is_some_and(|current| Arc::ptr_eq(current, room));
    if ours {
        rooms.remove(room.id());
        inner.metrics.stored_rooms.dec();
        tracing::info!(
            room_id = %room.id(),
            rooms = rooms.len(),
            "room removed"
        );
    }
}
