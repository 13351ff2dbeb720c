//! chunk_pipeline - engine-independent voxel chunk scheduling core
//!
//! This crate owns the lifetime and concurrency machinery for streaming
//! voxel chunks: a pooled allocator handing out reference-counted chunk
//! handles, an MPMC task queue with timing feedback, a fixed worker pool,
//! a workflow DAG scheduler ordering per-chunk pipeline stages, and the
//! grid tying them together.
//!
//! # Pipeline
//!
//! ```text
//! ChunkGrid::load ──► ChunkAllocator::acquire ──► WorkflowRun::start
//!                                                      │
//!                              ┌───────────────────────┘
//!                              ▼
//!                    ┌──────────────────┐   workers dequeue/execute;
//!                    │    TaskQueue     │◄─ incomplete tasks re-enter,
//!                    └──────────────────┘   completions advance the DAG
//!                              ▲
//!                    generate → mesh
//!                    generate → navmesh bulk → stitch ×8
//! ```
//!
//! Rendering, input, and world-generation algorithms live elsewhere; they
//! plug in through the [`VoxelGenerator`], [`MergeComparator`], and
//! [`SolidityPredicate`] strategies and consume [`GridEvent`]s.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chunk_pipeline::*;
//!
//! let allocator = Arc::new(ChunkAllocator::new(AllocatorConfig::default()));
//! let queue = TaskQueue::new();
//! let grid = ChunkGrid::new(
//!     allocator, queue.clone(),
//!     Arc::new(my_generator), Arc::new(my_comparator), Arc::new(my_solidity),
//!     GridConfig::default(),
//! );
//! let pool = WorkerPool::new(queue, 4);
//!
//! grid.update_center(ChunkPos::ZERO)?;
//! // ... chunks generate, mesh, and navmesh on the workers ...
//! pool.stop();
//! ```

pub mod constants;
pub mod types;

// Re-export commonly used items
pub use constants::{
  index_to_voxel, voxel_index, CHUNK_SIZE, CHUNK_SIZE_CB, CHUNK_SIZE_SQ, STEP_HEIGHT,
  WALK_CLEARANCE,
};
pub use types::{
  ChunkId, ChunkPos, Face, StageAtomic, StageState, StitchDir, TaskKind, VoxelId, AIR,
};

// Chunk storage and lifetime
pub mod allocator;
pub mod chunk;
pub use allocator::{AllocError, AllocatorConfig, ChunkAllocator};
pub use chunk::{Chunk, ChunkHandle, ClaimGuard, WeakChunkHandle};

// Task queue and worker pool
pub mod task_queue;
pub mod threading;
pub use task_queue::{CompletionMode, QueuedTask, TaskQueue, TaskTiming};
pub use threading::WorkerPool;

// Dependency-ordered scheduling
pub mod workflow;
pub use workflow::{WorkflowError, WorkflowGraph, WorkflowHook, WorkflowRun};

// The chunk task set and its pluggable strategies
pub mod tasks;
pub use tasks::{
  compute_walkable, greedy_mesh, naive_mesh, ChunkMesh, ChunkTask, GenerateTask, GreedyMeshTask,
  MergeComparator, MeshQuad, NaiveMeshTask, NavmeshBulkTask, NavmeshData, NavmeshStitchTask,
  SolidityPredicate, TaskBinding, VoxelGenerator,
};

// Grid integration and outward-facing events
pub mod events;
pub mod grid;
pub use events::{EventBus, GridEvent, ListenerId};
pub use grid::{ChunkGrid, GridConfig, GridError};

// Timing aggregation
pub mod stats;
pub use stats::{KindStats, TimingStats};
