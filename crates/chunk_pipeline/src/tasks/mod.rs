//! Chunk Pipeline Tasks
//!
//! The closed set of per-chunk work items and the dependency shape the grid
//! schedules them in:
//!
//! ```text
//! ┌──────────┐      ┌────────────────────┐
//! │ Generate ├──┬──►│ Mesh (naive|greedy)│
//! └──────────┘  │   └────────────────────┘
//!               │   ┌──────────────┐      ┌──────────────────────┐
//!               └──►│ Navmesh bulk ├─────►│ Navmesh stitch ×8    │
//!                   └──────────────┘      │ (one per direction,  │
//!                                         │  waits on neighbour's│
//!                                         │  bulk pass)          │
//!                                         └──────────────────────┘
//! ```
//!
//! Every task binds to one chunk (and the grid) through weak references
//! before it is queued, and exposes a single `execute` entry point returning
//! a completion flag: `true` means done (the workflow may advance), `false`
//! means "re-queue me" - the task's precondition (a neighbour's bulk pass,
//! the chunk's generation) has not landed yet. Transient non-completion is
//! not an error and never surfaces as one.

pub mod types;

mod generate;
mod mesh;
mod navmesh;

use std::sync::{Arc, Weak};

use crate::chunk::{ChunkHandle, WeakChunkHandle};
use crate::grid::ChunkGrid;
use crate::task_queue::TaskQueue;
use crate::types::TaskKind;

pub use generate::GenerateTask;
pub use mesh::{greedy_mesh, naive_mesh, GreedyMeshTask, NaiveMeshTask};
pub use navmesh::{compute_walkable, NavmeshBulkTask, NavmeshStitchTask};
pub use types::{
  ChunkMesh, MergeComparator, MeshQuad, NavmeshData, SolidityPredicate, VoxelGenerator,
};

/// Weak chunk + grid references a task captures before queueing.
///
/// Both are upgraded per execution (lock-to-strong-or-fail): a dead chunk
/// reference means the chunk was unloaded mid-pipeline, and the task
/// completes as a no-op rather than erroring.
pub struct TaskBinding {
  chunk: WeakChunkHandle,
  grid: Weak<ChunkGrid>,
}

impl TaskBinding {
  pub fn new(chunk: WeakChunkHandle, grid: Weak<ChunkGrid>) -> Self {
    Self { chunk, grid }
  }

  /// Bind to a live chunk and grid.
  pub fn bound(chunk: &ChunkHandle, grid: &Arc<ChunkGrid>) -> Self {
    Self {
      chunk: Arc::downgrade(chunk),
      grid: Arc::downgrade(grid),
    }
  }

  pub fn chunk(&self) -> Option<ChunkHandle> {
    self.chunk.upgrade()
  }

  pub fn grid(&self) -> Option<Arc<ChunkGrid>> {
    self.grid.upgrade()
  }
}

/// A unit of chunk work. Tagged variant over the closed task set; dispatch
/// happens through the single [`execute`](ChunkTask::execute) entry point.
/// Extension lives in the pluggable strategies ([`VoxelGenerator`],
/// [`MergeComparator`], [`SolidityPredicate`]), not in new variants.
pub enum ChunkTask {
  Generate(GenerateTask),
  MeshNaive(NaiveMeshTask),
  MeshGreedy(GreedyMeshTask),
  NavmeshBulk(NavmeshBulkTask),
  NavmeshStitch(NavmeshStitchTask),
}

impl ChunkTask {
  pub fn kind(&self) -> TaskKind {
    match self {
      ChunkTask::Generate(_) => TaskKind::Generate,
      ChunkTask::MeshNaive(_) => TaskKind::MeshNaive,
      ChunkTask::MeshGreedy(_) => TaskKind::MeshGreedy,
      ChunkTask::NavmeshBulk(_) => TaskKind::NavmeshBulk,
      ChunkTask::NavmeshStitch(_) => TaskKind::NavmeshStitch,
    }
  }

  fn binding(&self) -> &TaskBinding {
    match self {
      ChunkTask::Generate(t) => &t.binding,
      ChunkTask::MeshNaive(t) => &t.binding,
      ChunkTask::MeshGreedy(t) => &t.binding,
      ChunkTask::NavmeshBulk(t) => &t.binding,
      ChunkTask::NavmeshStitch(t) => &t.binding,
    }
  }

  /// The chunk this task is bound to, if still live.
  pub fn chunk(&self) -> Option<ChunkHandle> {
    self.binding().chunk()
  }

  /// Run the task. `true` = complete, `false` = re-queue.
  pub fn execute(&mut self, queue: &TaskQueue) -> bool {
    match self {
      ChunkTask::Generate(t) => t.run(queue),
      ChunkTask::MeshNaive(t) => t.run(queue),
      ChunkTask::MeshGreedy(t) => t.run(queue),
      ChunkTask::NavmeshBulk(t) => t.run(queue),
      ChunkTask::NavmeshStitch(t) => t.run(queue),
    }
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
