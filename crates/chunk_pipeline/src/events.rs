//! Synchronous observer bus for grid notifications.
//!
//! Events are delivered to every listener at emission time, on the emitting
//! thread (which may be a worker). Listeners are expected to be cheap -
//! typically forwarding into a channel - and must not subscribe/unsubscribe
//! from inside a callback.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::types::ChunkPos;

/// Notifications surfaced to rendering/AI consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridEvent {
  /// A chunk's level of detail changed.
  LodChanged { pos: ChunkPos, lod: u8 },
  /// A chunk's walkability data changed (bulk pass or stitch).
  NavmeshChanged { pos: ChunkPos },
  /// The grid's streaming window radius changed.
  RenderDistanceChanged { distance: u32 },
}

/// Handle for removing a subscribed listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&GridEvent) + Send + Sync>;

/// Multi-listener event dispatch with add/remove by handle.
#[derive(Default)]
pub struct EventBus {
  listeners: RwLock<Vec<(ListenerId, Listener)>>,
  next_id: AtomicU64,
}

impl EventBus {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn subscribe<F>(&self, listener: F) -> ListenerId
  where
    F: Fn(&GridEvent) + Send + Sync + 'static,
  {
    let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.listeners.write().push((id, Box::new(listener)));
    id
  }

  /// Remove a listener. Returns whether it was still subscribed.
  pub fn unsubscribe(&self, id: ListenerId) -> bool {
    let mut listeners = self.listeners.write();
    let before = listeners.len();
    listeners.retain(|(lid, _)| *lid != id);
    listeners.len() != before
  }

  /// Deliver `event` to every listener, synchronously.
  pub fn emit(&self, event: &GridEvent) {
    for (_, listener) in self.listeners.read().iter() {
      listener(event);
    }
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.read().len()
  }
}
