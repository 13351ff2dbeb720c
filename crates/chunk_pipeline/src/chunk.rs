//! The chunk itself: voxel storage plus the per-stage state machines that
//! coordinate concurrent pipeline work.
//!
//! A chunk is shared between the grid, the worker threads, and any external
//! consumers through [`ChunkHandle`] (an `Arc`): cloning a handle increments
//! the reference count, moving one transfers ownership without touching it,
//! and dropping the last handle returns the voxel buffer to the allocator's
//! pool. Neighbour links are [`WeakChunkHandle`]s - chunks never own each
//! other, so unloading a chunk can never be blocked by its neighbours.
//!
//! Mutation discipline: voxel data is only written by the task currently
//! holding the corresponding stage's `Active` state; stitch progress uses one
//! atomic per direction so stitches against different neighbours never
//! contend.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::Sender;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::CHUNK_SIZE_CB;
use crate::tasks::{ChunkMesh, NavmeshData};
use crate::types::{ChunkId, ChunkPos, StageAtomic, StitchDir, TaskKind, VoxelId};

/// Shared, reference-counted accessor to a live [`Chunk`].
pub type ChunkHandle = Arc<Chunk>;

/// Non-owning chunk reference. Upgrade before use; a failed upgrade means the
/// chunk was unloaded and its memory reclaimed.
pub type WeakChunkHandle = Weak<Chunk>;

/// Sentinel for "no pending task" in the pending-kind marker.
const PENDING_NONE: u8 = u8::MAX;

fn kind_to_u8(kind: TaskKind) -> u8 {
  match kind {
    TaskKind::Generate => 0,
    TaskKind::MeshNaive => 1,
    TaskKind::MeshGreedy => 2,
    TaskKind::NavmeshBulk => 3,
    TaskKind::NavmeshStitch => 4,
  }
}

fn kind_from_u8(v: u8) -> Option<TaskKind> {
  match v {
    0 => Some(TaskKind::Generate),
    1 => Some(TaskKind::MeshNaive),
    2 => Some(TaskKind::MeshGreedy),
    3 => Some(TaskKind::NavmeshBulk),
    4 => Some(TaskKind::NavmeshStitch),
    _ => None,
  }
}

/// One chunk's voxel data and pipeline state.
pub struct Chunk {
  id: ChunkId,
  position: ChunkPos,
  lod: AtomicU8,

  /// Voxel storage, `CHUNK_SIZE_CB` entries. A `Vec` so the buffer can be
  /// recycled through the allocator pool when the chunk dies.
  voxels: RwLock<Vec<VoxelId>>,

  generation: StageAtomic,
  meshing: StageAtomic,
  navmesh: StageAtomic,

  /// Per-direction stitch progress. Independent atomics: stitching north
  /// never waits on a stitch running east.
  stitches: [StageAtomic; StitchDir::COUNT],

  /// Link count per stitch direction, written by the stitch task.
  stitch_links: [AtomicU32; StitchDir::COUNT],

  /// Kind of the most recently queued task for this chunk.
  pending_kind: AtomicU8,

  /// Outstanding processing claims. Nonzero while a task is executing
  /// against this chunk.
  claims: AtomicU32,

  /// Weak back-references to the eight lateral neighbours.
  neighbours: RwLock<[WeakChunkHandle; StitchDir::COUNT]>,

  mesh: RwLock<Option<ChunkMesh>>,
  nav: RwLock<Option<NavmeshData>>,

  /// Returns the voxel buffer to the allocator pool on drop.
  reclaim: Sender<Vec<VoxelId>>,
}

impl Chunk {
  pub(crate) fn new(
    id: ChunkId,
    position: ChunkPos,
    voxels: Vec<VoxelId>,
    reclaim: Sender<Vec<VoxelId>>,
  ) -> Self {
    debug_assert_eq!(voxels.len(), CHUNK_SIZE_CB);
    Self {
      id,
      position,
      lod: AtomicU8::new(0),
      voxels: RwLock::new(voxels),
      generation: StageAtomic::default(),
      meshing: StageAtomic::default(),
      navmesh: StageAtomic::default(),
      stitches: std::array::from_fn(|_| StageAtomic::default()),
      stitch_links: std::array::from_fn(|_| AtomicU32::new(0)),
      pending_kind: AtomicU8::new(PENDING_NONE),
      claims: AtomicU32::new(0),
      neighbours: RwLock::new(std::array::from_fn(|_| Weak::new())),
      mesh: RwLock::new(None),
      nav: RwLock::new(None),
      reclaim,
    }
  }

  pub fn id(&self) -> ChunkId {
    self.id
  }

  pub fn position(&self) -> ChunkPos {
    self.position
  }

  pub fn lod(&self) -> u8 {
    self.lod.load(Ordering::Acquire)
  }

  pub fn set_lod(&self, lod: u8) {
    self.lod.store(lod, Ordering::Release);
  }

  // ---------------------------------------------------------------------------
  // Voxel access
  // ---------------------------------------------------------------------------

  /// Shared read access to the voxel buffer.
  pub fn voxels(&self) -> RwLockReadGuard<'_, Vec<VoxelId>> {
    self.voxels.read()
  }

  /// Exclusive write access to the voxel buffer. Callers must hold the
  /// relevant stage's `Active` state.
  pub fn voxels_mut(&self) -> RwLockWriteGuard<'_, Vec<VoxelId>> {
    self.voxels.write()
  }

  // ---------------------------------------------------------------------------
  // Stage state machines
  // ---------------------------------------------------------------------------

  pub fn generation(&self) -> &StageAtomic {
    &self.generation
  }

  pub fn meshing(&self) -> &StageAtomic {
    &self.meshing
  }

  pub fn navmesh(&self) -> &StageAtomic {
    &self.navmesh
  }

  pub fn stitch(&self, dir: StitchDir) -> &StageAtomic {
    &self.stitches[dir.index()]
  }

  pub fn stitch_link_count(&self, dir: StitchDir) -> u32 {
    self.stitch_links[dir.index()].load(Ordering::Acquire)
  }

  pub(crate) fn set_stitch_links(&self, dir: StitchDir, count: u32) {
    self.stitch_links[dir.index()].store(count, Ordering::Release);
  }

  /// Record the kind of the task most recently queued for this chunk.
  pub fn set_pending_kind(&self, kind: TaskKind) {
    self.pending_kind.store(kind_to_u8(kind), Ordering::Release);
  }

  pub fn pending_kind(&self) -> Option<TaskKind> {
    kind_from_u8(self.pending_kind.load(Ordering::Acquire))
  }

  // ---------------------------------------------------------------------------
  // Processing claims
  // ---------------------------------------------------------------------------

  /// Take a processing claim for the duration of a task's execution.
  ///
  /// The guard borrows the chunk, so a claim can never outlive the handle
  /// that produced it - the compiler enforces the teardown invariant that a
  /// chunk with outstanding claims cannot be reclaimed.
  pub fn claim(&self) -> ClaimGuard<'_> {
    self.claims.fetch_add(1, Ordering::AcqRel);
    ClaimGuard { chunk: self }
  }

  /// Number of tasks currently holding a processing claim.
  pub fn claim_count(&self) -> u32 {
    self.claims.load(Ordering::Acquire)
  }

  // ---------------------------------------------------------------------------
  // Neighbours
  // ---------------------------------------------------------------------------

  /// Upgrade the neighbour link in `dir`, or `None` if absent or unloaded.
  pub fn neighbour(&self, dir: StitchDir) -> Option<ChunkHandle> {
    self.neighbours.read()[dir.index()].upgrade()
  }

  pub(crate) fn set_neighbour(&self, dir: StitchDir, neighbour: WeakChunkHandle) {
    self.neighbours.write()[dir.index()] = neighbour;
  }

  pub(crate) fn clear_neighbour(&self, dir: StitchDir) {
    self.neighbours.write()[dir.index()] = Weak::new();
  }

  // ---------------------------------------------------------------------------
  // Derived outputs
  // ---------------------------------------------------------------------------

  pub fn mesh(&self) -> RwLockReadGuard<'_, Option<ChunkMesh>> {
    self.mesh.read()
  }

  pub(crate) fn set_mesh(&self, mesh: ChunkMesh) {
    *self.mesh.write() = Some(mesh);
  }

  pub fn nav(&self) -> RwLockReadGuard<'_, Option<NavmeshData>> {
    self.nav.read()
  }

  pub(crate) fn set_nav(&self, nav: NavmeshData) {
    *self.nav.write() = Some(nav);
  }
}

impl Drop for Chunk {
  fn drop(&mut self) {
    debug_assert_eq!(
      self.claims.load(Ordering::Acquire),
      0,
      "chunk {:?} dropped with outstanding processing claims",
      self.position
    );
    let buffer = std::mem::take(self.voxels.get_mut());
    // Allocator may already be gone during shutdown.
    let _ = self.reclaim.send(buffer);
  }
}

impl std::fmt::Debug for Chunk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Chunk")
      .field("position", &self.position)
      .field("lod", &self.lod())
      .field("generation", &self.generation.get())
      .field("meshing", &self.meshing.get())
      .field("navmesh", &self.navmesh.get())
      .finish()
  }
}

/// RAII processing claim. See [`Chunk::claim`].
pub struct ClaimGuard<'a> {
  chunk: &'a Chunk,
}

impl Drop for ClaimGuard<'_> {
  fn drop(&mut self) {
    self.chunk.claims.fetch_sub(1, Ordering::AcqRel);
  }
}
