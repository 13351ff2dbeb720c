use std::sync::{Arc, Barrier, Weak};
use std::time::Duration;

use super::*;
use crate::tasks::{ChunkTask, GenerateTask, TaskBinding, VoxelGenerator};
use crate::types::{ChunkPos, VoxelId};

struct NullGenerator;

impl VoxelGenerator for NullGenerator {
  fn generate(&self, _pos: ChunkPos, _voxels: &mut [VoxelId]) {}
}

/// A task with no live chunk: executes instantly as a completed no-op.
fn noop_task() -> ChunkTask {
  ChunkTask::Generate(GenerateTask::new(
    TaskBinding::new(Weak::new(), Weak::new()),
    Arc::new(NullGenerator),
  ))
}

fn noop_tasks(n: usize) -> Vec<ChunkTask> {
  (0..n).map(|_| noop_task()).collect()
}

#[test]
fn rejects_cycles() {
  assert_eq!(
    WorkflowGraph::new(2, &[(0, 1), (1, 0)]).err(),
    Some(WorkflowError::Cycle)
  );
  assert_eq!(
    WorkflowGraph::new(1, &[(0, 0)]).err(),
    Some(WorkflowError::Cycle)
  );
  assert_eq!(
    WorkflowGraph::new(3, &[(0, 1), (1, 2), (2, 1)]).err(),
    Some(WorkflowError::Cycle)
  );
}

#[test]
fn rejects_out_of_range_edges() {
  assert_eq!(
    WorkflowGraph::new(2, &[(0, 5)]).err(),
    Some(WorkflowError::EdgeOutOfRange {
      from: 0,
      to: 5,
      count: 2
    })
  );
}

#[test]
fn rejects_task_count_mismatch() {
  let graph = Arc::new(WorkflowGraph::new(2, &[(0, 1)]).unwrap());
  let err = WorkflowRun::new(graph, noop_tasks(3), CompletionMode::Dispose).err();
  assert_eq!(
    err,
    Some(WorkflowError::TaskCountMismatch {
      expected: 2,
      got: 3
    })
  );
}

#[test]
fn entries_are_zero_in_degree_tasks() {
  // Diamond: 0 → {1, 2} → 3
  let graph = WorkflowGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
  assert_eq!(graph.entries(), &[0]);
  assert_eq!(graph.in_degree(0), 0);
  assert_eq!(graph.in_degree(3), 2);
  assert_eq!(graph.dependents(0), &[1, 2]);
}

#[test]
fn start_enqueues_only_entry_tasks() {
  let queue = TaskQueue::new();
  let graph = Arc::new(WorkflowGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap());
  let run = Arc::new(WorkflowRun::new(graph, noop_tasks(4), CompletionMode::Dispose).unwrap());

  run.start(&queue);
  assert_eq!(queue.len(), 1);
  assert_eq!(run.remaining(3), 2);
}

#[test]
fn diamond_executes_each_task_once_in_dependency_order() {
  let queue = TaskQueue::new();
  let graph = Arc::new(WorkflowGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap());
  let run = Arc::new(WorkflowRun::new(graph, noop_tasks(4), CompletionMode::Dispose).unwrap());
  run.start(&queue);

  // Drive the queue by hand, recording the order nodes become runnable.
  let mut order = Vec::new();
  while let Some(mut queued) = queue.dequeue(Duration::from_millis(10)) {
    assert!(queued.task.execute(&queue));
    let hook = queued.workflow.take().unwrap();
    order.push(hook.node);
    hook.run.complete(hook.node, &queue);
  }

  assert_eq!(order.len(), 4, "each task runs exactly once");
  let position = |n: usize| order.iter().position(|&x| x == n).unwrap();
  assert_eq!(position(0), 0);
  assert!(position(1) < position(3));
  assert!(position(2) < position(3));
}

#[test]
fn shared_dependent_is_enqueued_exactly_once_under_races() {
  // Node 2 has predecessors 0 and 1 completing on different threads at the
  // same moment; the shared counter must admit exactly one dispatch.
  for _ in 0..200 {
    let queue = TaskQueue::new();
    let graph = Arc::new(WorkflowGraph::new(3, &[(0, 2), (1, 2)]).unwrap());
    let run = Arc::new(WorkflowRun::new(graph, noop_tasks(3), CompletionMode::Dispose).unwrap());
    run.start(&queue);
    assert_eq!(queue.len(), 2);

    let barrier = Arc::new(Barrier::new(2));
    let threads: Vec<_> = [0usize, 1]
      .into_iter()
      .map(|node| {
        let run = run.clone();
        let queue = queue.clone();
        let barrier = barrier.clone();
        std::thread::spawn(move || {
          barrier.wait();
          run.complete(node, &queue);
        })
      })
      .collect();
    for t in threads {
      t.join().unwrap();
    }

    // Two entries plus exactly one dispatch of the dependent.
    assert_eq!(queue.len(), 3);
    assert_eq!(run.remaining(2), 0);
  }
}

#[test]
fn duplicate_edges_count_twice() {
  // A multimap edge set: node 1 needs both completions of the same edge.
  let queue = TaskQueue::new();
  let graph = Arc::new(WorkflowGraph::new(2, &[(0, 1), (0, 1)]).unwrap());
  let run = Arc::new(WorkflowRun::new(graph, noop_tasks(2), CompletionMode::Dispose).unwrap());
  run.start(&queue);
  assert_eq!(run.remaining(1), 2);

  run.complete(0, &queue);
  // Both decrements arrive from the single completion pass.
  assert_eq!(run.remaining(1), 0);
}
