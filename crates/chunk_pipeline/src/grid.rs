//! The chunk grid: owner of the live chunk set and the sole producer of
//! pipeline work.
//!
//! Loading a chunk acquires it from the allocator, links neighbour
//! back-references both ways, and starts a workflow run shaped
//! `generate → {mesh, navmesh-bulk}` with `bulk → stitch` nodes for every
//! neighbour live at load time. Neighbours that arrive later get standalone
//! stitch tasks enqueued toward the new chunk; stitches self-pace by
//! reporting incomplete until both bulk passes land.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::allocator::{AllocError, ChunkAllocator};
use crate::chunk::ChunkHandle;
use crate::events::{EventBus, GridEvent};
use crate::task_queue::{CompletionMode, TaskQueue};
use crate::tasks::{
  ChunkTask, GenerateTask, GreedyMeshTask, MergeComparator, NaiveMeshTask, NavmeshBulkTask,
  NavmeshStitchTask, SolidityPredicate, TaskBinding, VoxelGenerator,
};
use crate::types::{ChunkPos, StitchDir};
use crate::workflow::{WorkflowError, WorkflowGraph, WorkflowRun};

/// Grid failures: allocation or workflow construction, both bubbled up from
/// the owning subsystem.
#[derive(Debug, Error)]
pub enum GridError {
  #[error(transparent)]
  Alloc(#[from] AllocError),
  #[error(transparent)]
  Workflow(#[from] WorkflowError),
}

/// Streaming/meshing policy for a grid.
#[derive(Clone, Copy, Debug)]
pub struct GridConfig {
  /// Window radius (in chunks) maintained by [`ChunkGrid::update_center`].
  pub render_distance: u32,
  /// Greedy or naive meshing for loaded chunks.
  pub greedy_meshing: bool,
}

impl Default for GridConfig {
  fn default() -> Self {
    Self {
      render_distance: 4,
      greedy_meshing: true,
    }
  }
}

/// Shared context the whole pipeline operates on. See the module docs.
pub struct ChunkGrid {
  allocator: Arc<ChunkAllocator>,
  queue: TaskQueue,
  chunks: RwLock<HashMap<ChunkPos, ChunkHandle>>,
  generator: Arc<dyn VoxelGenerator>,
  comparator: Arc<dyn MergeComparator>,
  solidity: Arc<dyn SolidityPredicate>,
  events: EventBus,
  render_distance: AtomicU32,
  greedy: bool,
  /// Weak self-reference handed to task bindings.
  self_ref: Weak<ChunkGrid>,
}

impl ChunkGrid {
  pub fn new(
    allocator: Arc<ChunkAllocator>,
    queue: TaskQueue,
    generator: Arc<dyn VoxelGenerator>,
    comparator: Arc<dyn MergeComparator>,
    solidity: Arc<dyn SolidityPredicate>,
    config: GridConfig,
  ) -> Arc<Self> {
    Arc::new_cyclic(|self_ref| Self {
      allocator,
      queue,
      chunks: RwLock::new(HashMap::new()),
      generator,
      comparator,
      solidity,
      events: EventBus::new(),
      render_distance: AtomicU32::new(config.render_distance),
      greedy: config.greedy_meshing,
      self_ref: self_ref.clone(),
    })
  }

  pub fn events(&self) -> &EventBus {
    &self.events
  }

  pub fn queue(&self) -> &TaskQueue {
    &self.queue
  }

  pub fn allocator(&self) -> &Arc<ChunkAllocator> {
    &self.allocator
  }

  /// The live chunk at `pos`, if loaded.
  pub fn chunk_at(&self, pos: ChunkPos) -> Option<ChunkHandle> {
    self.chunks.read().get(&pos).cloned()
  }

  pub fn contains(&self, pos: ChunkPos) -> bool {
    self.chunks.read().contains_key(&pos)
  }

  pub fn live_count(&self) -> usize {
    self.chunks.read().len()
  }

  /// Load the chunk at `pos` and start its pipeline. Idempotent: a
  /// re-load of a live chunk returns its handle without new work.
  pub fn load(&self, pos: ChunkPos) -> Result<ChunkHandle, GridError> {
    if let Some(existing) = self.chunk_at(pos) {
      return Ok(existing);
    }

    let chunk = self.allocator.acquire(pos)?;

    let mut linked: SmallVec<[StitchDir; 8]> = SmallVec::new();
    {
      let mut chunks = self.chunks.write();
      // A concurrent load may have won the race while we were allocating.
      if let Some(existing) = chunks.get(&pos) {
        return Ok(existing.clone());
      }
      for dir in StitchDir::ALL {
        if let Some(neighbour) = chunks.get(&(pos + dir.offset())) {
          chunk.set_neighbour(dir, Arc::downgrade(neighbour));
          neighbour.set_neighbour(dir.opposite(), Arc::downgrade(&chunk));
          linked.push(dir);
        }
      }
      chunks.insert(pos, chunk.clone());
    }

    chunk.generation().mark_pending();
    self.start_pipeline(&chunk, &linked)?;

    // Chunks that were already live never scheduled a stitch toward this
    // position; give each one now. They pace themselves on the new chunk's
    // bulk pass.
    for &dir in &linked {
      if let Some(neighbour) = self.chunk_at(pos + dir.offset()) {
        let binding = TaskBinding::new(Arc::downgrade(&neighbour), self.self_ref.clone());
        self.queue.enqueue(
          ChunkTask::NavmeshStitch(NavmeshStitchTask::new(binding, dir.opposite())),
          CompletionMode::Dispose,
        );
      }
    }

    debug!(?pos, neighbours = linked.len(), "chunk load scheduled");
    Ok(chunk)
  }

  /// Build and start the chunk's workflow run.
  ///
  /// Node layout: 0 = generate, 1 = mesh, 2 = navmesh bulk, 3.. = one
  /// stitch per neighbour live at load time.
  fn start_pipeline(
    &self,
    chunk: &ChunkHandle,
    linked: &[StitchDir],
  ) -> Result<(), GridError> {
    let binding = || TaskBinding::new(Arc::downgrade(chunk), self.self_ref.clone());

    let mut tasks = vec![
      ChunkTask::Generate(GenerateTask::new(binding(), self.generator.clone())),
      if self.greedy {
        ChunkTask::MeshGreedy(GreedyMeshTask::new(binding(), self.comparator.clone()))
      } else {
        ChunkTask::MeshNaive(NaiveMeshTask::new(binding()))
      },
      ChunkTask::NavmeshBulk(NavmeshBulkTask::new(binding(), self.solidity.clone())),
    ];
    let mut edges = vec![(0, 1), (0, 2)];
    for &dir in linked {
      edges.push((2, tasks.len()));
      tasks.push(ChunkTask::NavmeshStitch(NavmeshStitchTask::new(
        binding(),
        dir,
      )));
    }

    let graph = Arc::new(WorkflowGraph::new(tasks.len(), &edges)?);
    let run = Arc::new(WorkflowRun::new(graph, tasks, CompletionMode::Dispose)?);
    run.start(&self.queue);
    Ok(())
  }

  /// Unload the chunk at `pos`: sever neighbour back-references and drop
  /// the grid's and allocator's handles. In-flight tasks still holding a
  /// handle finish as no-ops against the detached chunk; its memory
  /// returns to the pool when the last handle drops.
  pub fn unload(&self, pos: ChunkPos) -> bool {
    let Some(chunk) = self.chunks.write().remove(&pos) else {
      return false;
    };

    {
      let chunks = self.chunks.read();
      for dir in StitchDir::ALL {
        if let Some(neighbour) = chunks.get(&(pos + dir.offset())) {
          neighbour.clear_neighbour(dir.opposite());
        }
      }
    }

    self.allocator.release(chunk.id());
    debug!(?pos, "chunk unloaded");
    true
  }

  /// Set a chunk's level of detail, notifying listeners.
  pub fn set_lod(&self, pos: ChunkPos, lod: u8) -> bool {
    let Some(chunk) = self.chunk_at(pos) else {
      return false;
    };
    chunk.set_lod(lod);
    self.events.emit(&GridEvent::LodChanged { pos, lod });
    true
  }

  pub fn render_distance(&self) -> u32 {
    self.render_distance.load(Ordering::Acquire)
  }

  pub fn set_render_distance(&self, distance: u32) {
    self.render_distance.store(distance, Ordering::Release);
    self.events.emit(&GridEvent::RenderDistanceChanged { distance });
  }

  /// Maintain the streaming window: load every chunk in the lateral square
  /// of radius [`render_distance`](Self::render_distance) around `center`
  /// (at the center's Y layer) and unload everything outside it. Returns
  /// `(loaded, unloaded)` counts.
  pub fn update_center(&self, center: ChunkPos) -> Result<(usize, usize), GridError> {
    let d = self.render_distance() as i32;

    let mut loaded = 0;
    for dx in -d..=d {
      for dz in -d..=d {
        let pos = ChunkPos::new(center.x + dx, center.y, center.z + dz);
        if !self.contains(pos) {
          self.load(pos)?;
          loaded += 1;
        }
      }
    }

    let stale: Vec<ChunkPos> = self
      .chunks
      .read()
      .keys()
      .copied()
      .filter(|pos| {
        pos.y != center.y || (pos.x - center.x).abs() > d || (pos.z - center.z).abs() > d
      })
      .collect();
    let mut unloaded = 0;
    for pos in stale {
      if self.unload(pos) {
        unloaded += 1;
      }
    }

    Ok((loaded, unloaded))
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
