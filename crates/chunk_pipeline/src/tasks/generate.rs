//! Chunk generation task.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::task_queue::TaskQueue;

use super::{TaskBinding, VoxelGenerator};

/// Invokes the pluggable [`VoxelGenerator`] over the chunk's voxel storage,
/// driving the generation stage `Pending → Active → Complete`.
pub struct GenerateTask {
  pub(super) binding: TaskBinding,
  generator: Arc<dyn VoxelGenerator>,
}

impl GenerateTask {
  pub fn new(binding: TaskBinding, generator: Arc<dyn VoxelGenerator>) -> Self {
    Self { binding, generator }
  }

  pub(super) fn run(&mut self, _queue: &TaskQueue) -> bool {
    let Some(chunk) = self.binding.chunk() else {
      trace!("chunk unloaded before generation; dropping task");
      return true;
    };

    let _claim = chunk.claim();
    chunk.generation().begin();
    {
      let mut voxels = chunk.voxels_mut();
      self.generator.generate(chunk.position(), &mut voxels);
    }
    chunk.generation().finish();
    debug!(pos = ?chunk.position(), "chunk generated");
    true
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Weak;

  use glam::IVec3;

  use super::*;
  use crate::allocator::{AllocatorConfig, ChunkAllocator};
  use crate::constants::{voxel_index, CHUNK_SIZE};
  use crate::tasks::ChunkTask;
  use crate::types::{ChunkPos, StageState, VoxelId};

  struct FloorGenerator {
    height: usize,
  }

  impl VoxelGenerator for FloorGenerator {
    fn generate(&self, _pos: ChunkPos, voxels: &mut [VoxelId]) {
      for x in 0..CHUNK_SIZE {
        for y in 0..self.height {
          for z in 0..CHUNK_SIZE {
            voxels[voxel_index(x, y, z)] = 1;
          }
        }
      }
    }
  }

  #[test]
  fn generation_fills_voxels_and_completes_stage() {
    let alloc = ChunkAllocator::new(AllocatorConfig::default());
    let chunk = alloc.acquire(IVec3::ZERO).unwrap();
    let queue = TaskQueue::new();

    let binding = TaskBinding::new(std::sync::Arc::downgrade(&chunk), Weak::new());
    let mut task = ChunkTask::Generate(GenerateTask::new(
      binding,
      std::sync::Arc::new(FloorGenerator { height: 3 }),
    ));

    assert!(task.execute(&queue));
    assert_eq!(chunk.generation().get(), StageState::Complete);
    assert_eq!(chunk.voxels()[voxel_index(5, 0, 5)], 1);
    assert_eq!(chunk.voxels()[voxel_index(5, 3, 5)], 0);
  }

  #[test]
  fn generation_on_dead_chunk_completes_as_noop() {
    let queue = TaskQueue::new();
    let binding = TaskBinding::new(Weak::new(), Weak::new());
    let mut task = ChunkTask::Generate(GenerateTask::new(
      binding,
      std::sync::Arc::new(FloorGenerator { height: 1 }),
    ));
    assert!(task.execute(&queue));
  }
}
