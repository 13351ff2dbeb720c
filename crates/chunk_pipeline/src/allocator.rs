//! Pooled, thread-safe chunk factory and registry.
//!
//! The allocator owns two things: the registry mapping [`ChunkId`] to the
//! live chunk (at most one per id), and a free list of voxel buffers that
//! dead chunks flow back into. Acquire and release therefore never touch the
//! heap in steady state - high load/unload churn reuses the same buffers.
//!
//! The allocator is an explicitly constructed, explicitly owned object; the
//! grid and tasks hold it behind an `Arc`. There is no global instance.
//!
//! # Lifetime model
//!
//! `acquire` hands out [`ChunkHandle`]s (`Arc`s). The registry keeps one
//! handle per live chunk; `release` drops that one. The chunk's memory is
//! only recycled when the *last* handle anywhere drops - a task still holding
//! a handle keeps the chunk alive, so release never yanks memory out from
//! under a worker. The voxel buffer then returns through a reclaim channel
//! and is reused by the next acquire.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunk::{Chunk, ChunkHandle};
use crate::constants::CHUNK_SIZE_CB;
use crate::types::{ChunkId, ChunkPos, VoxelId, AIR};

/// Allocation failure modes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
  /// The configured chunk limit is reached and growth is disabled.
  /// Recoverable: release chunks or back off.
  #[error("chunk pool exhausted ({limit} chunks live)")]
  Exhausted { limit: usize },
}

/// Pool sizing policy.
#[derive(Clone, Copy, Debug)]
pub struct AllocatorConfig {
  /// Voxel buffers allocated up front.
  pub preallocate: usize,
  /// Maximum simultaneously live chunks.
  pub max_chunks: usize,
  /// When `false`, acquire fails with [`AllocError::Exhausted`] at the
  /// limit instead of growing.
  pub grow: bool,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self {
      preallocate: 0,
      max_chunks: 4096,
      grow: true,
    }
  }
}

/// Thread-safe pooled chunk allocator. See the module docs.
pub struct ChunkAllocator {
  registry: Mutex<HashMap<ChunkId, ChunkHandle>>,
  free: Mutex<Vec<Vec<VoxelId>>>,
  reclaim_tx: Sender<Vec<VoxelId>>,
  reclaim_rx: Receiver<Vec<VoxelId>>,
  config: AllocatorConfig,
}

impl ChunkAllocator {
  pub fn new(config: AllocatorConfig) -> Self {
    let (reclaim_tx, reclaim_rx) = crossbeam_channel::unbounded();
    let free = (0..config.preallocate)
      .map(|_| vec![AIR; CHUNK_SIZE_CB])
      .collect();
    Self {
      registry: Mutex::new(HashMap::new()),
      free: Mutex::new(free),
      reclaim_tx,
      reclaim_rx,
      config,
    }
  }

  /// Acquire a handle for the chunk at `pos`.
  ///
  /// Returns the existing chunk if one is live (concurrent acquires for the
  /// same position serialize on the registry lock and see the same chunk),
  /// otherwise allocates from the pool with all stages reset to `None` and
  /// air-filled storage - pool reuse never leaks a previous occupant's data.
  pub fn acquire(&self, pos: ChunkPos) -> Result<ChunkHandle, AllocError> {
    let id = ChunkId::from_pos(pos);
    let mut registry = self.registry.lock();

    if let Some(existing) = registry.get(&id) {
      return Ok(existing.clone());
    }

    if !self.config.grow && registry.len() >= self.config.max_chunks {
      warn!(?pos, limit = self.config.max_chunks, "chunk pool exhausted");
      return Err(AllocError::Exhausted {
        limit: self.config.max_chunks,
      });
    }

    let storage = self.take_storage();
    let chunk = Arc::new(Chunk::new(id, pos, storage, self.reclaim_tx.clone()));
    registry.insert(id, chunk.clone());
    debug!(?pos, live = registry.len(), "chunk acquired");
    Ok(chunk)
  }

  /// Handle to an already-live chunk, incrementing its reference count.
  /// `None` if no chunk is registered for the position.
  pub fn acquire_existing(&self, pos: ChunkPos) -> Option<ChunkHandle> {
    self.registry.lock().get(&ChunkId::from_pos(pos)).cloned()
  }

  /// Drop the registry's handle for `id`, returning whether an entry
  /// existed.
  ///
  /// Callers must stop issuing new tasks for the chunk first; any handles
  /// still held elsewhere (in-flight tasks, renderers) keep the memory alive
  /// until they drop, at which point the buffer re-enters the free list.
  pub fn release(&self, id: ChunkId) -> bool {
    let removed = self.registry.lock().remove(&id);
    if removed.is_some() {
      debug!(pos = ?id.to_pos(), "chunk released");
    }
    removed.is_some()
  }

  /// Number of live (registered) chunks.
  pub fn live_count(&self) -> usize {
    self.registry.lock().len()
  }

  /// Buffers currently sitting in the free list (reclaim channel drained).
  pub fn free_count(&self) -> usize {
    self.drain_reclaimed();
    self.free.lock().len()
  }

  pub fn contains(&self, pos: ChunkPos) -> bool {
    self.registry.lock().contains_key(&ChunkId::from_pos(pos))
  }

  fn take_storage(&self) -> Vec<VoxelId> {
    self.drain_reclaimed();
    let recycled = self.free.lock().pop();
    match recycled {
      Some(mut buffer) => {
        buffer.clear();
        buffer.resize(CHUNK_SIZE_CB, AIR);
        buffer
      }
      None => vec![AIR; CHUNK_SIZE_CB],
    }
  }

  fn drain_reclaimed(&self) {
    let mut free = self.free.lock();
    while let Ok(buffer) = self.reclaim_rx.try_recv() {
      free.push(buffer);
    }
  }
}

#[cfg(test)]
#[path = "allocator_test.rs"]
mod allocator_test;
