//! Dependency-ordered workflow scheduling.
//!
//! A [`WorkflowGraph`] is the static topology: a DAG over task slots with
//! in-degree counts and an entry set. A [`WorkflowRun`] binds one set of
//! tasks to that topology and drives them through the queue:
//!
//! ```text
//! WAITING ──in-degree hits 0──► RUNNABLE ──take slot──► QUEUED
//!    ▲                                                    │
//!    │                                                    ▼
//!    └── predecessors still running          EXECUTING ──► DONE
//!                                                          │
//!                                          decrement every dependent's
//!                                          completion counter; dispatch
//!                                          those that reach zero
//! ```
//!
//! The completion counters are shared atomics: when two predecessors of the
//! same task finish on different threads at the same instant, only the
//! `fetch_sub` that observes 1 dispatches the dependent, so every task in
//! the DAG is enqueued exactly once per run. Cyclic graphs are rejected at
//! construction, never discovered at runtime.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

use crate::task_queue::{CompletionMode, QueuedTask, TaskQueue};
use crate::tasks::ChunkTask;

/// Workflow construction failures. All structural, all build-time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
  #[error("workflow graph contains a cycle")]
  Cycle,
  #[error("edge ({from}, {to}) out of range for {count} tasks")]
  EdgeOutOfRange {
    from: usize,
    to: usize,
    count: usize,
  },
  #[error("workflow run given {got} tasks for a graph of {expected}")]
  TaskCountMismatch { expected: usize, got: usize },
}

/// Static DAG topology over task slots `0..task_count`.
pub struct WorkflowGraph {
  task_count: usize,
  /// Dependents of each task. A multimap: duplicate edges are legal and
  /// count twice toward the in-degree.
  edges: Vec<SmallVec<[usize; 4]>>,
  into_counts: Vec<u32>,
  entries: Vec<usize>,
}

impl WorkflowGraph {
  /// Build a graph from `(from, to)` dependency edges: `to` runs only after
  /// `from` completes. Rejects out-of-range edges and cycles.
  pub fn new(task_count: usize, edge_list: &[(usize, usize)]) -> Result<Self, WorkflowError> {
    let mut edges: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); task_count];
    let mut into_counts = vec![0u32; task_count];

    for &(from, to) in edge_list {
      if from >= task_count || to >= task_count {
        return Err(WorkflowError::EdgeOutOfRange {
          from,
          to,
          count: task_count,
        });
      }
      edges[from].push(to);
      into_counts[to] += 1;
    }

    let entries: Vec<usize> = (0..task_count).filter(|&i| into_counts[i] == 0).collect();

    // Kahn's algorithm: if a topological order doesn't cover every task,
    // the leftover tasks sit on a cycle.
    let mut remaining = into_counts.clone();
    let mut ready: Vec<usize> = entries.clone();
    let mut visited = 0usize;
    while let Some(task) = ready.pop() {
      visited += 1;
      for &dep in &edges[task] {
        remaining[dep] -= 1;
        if remaining[dep] == 0 {
          ready.push(dep);
        }
      }
    }
    if visited != task_count {
      return Err(WorkflowError::Cycle);
    }

    Ok(Self {
      task_count,
      edges,
      into_counts,
      entries,
    })
  }

  pub fn task_count(&self) -> usize {
    self.task_count
  }

  /// Direct dependents of `task`.
  pub fn dependents(&self, task: usize) -> &[usize] {
    &self.edges[task]
  }

  /// Predecessor count of `task`.
  pub fn in_degree(&self, task: usize) -> u32 {
    self.into_counts[task]
  }

  /// Tasks with no predecessors; enqueued immediately by
  /// [`WorkflowRun::start`].
  pub fn entries(&self) -> &[usize] {
    &self.entries
  }
}

/// Handle carried by a [`QueuedTask`] linking it back to its workflow node.
pub struct WorkflowHook {
  pub run: Arc<WorkflowRun>,
  pub node: usize,
}

/// One execution of a [`WorkflowGraph`] over a concrete task set.
pub struct WorkflowRun {
  graph: Arc<WorkflowGraph>,
  /// Shared completion view: predecessors outstanding per task. A task is
  /// dispatched by whichever predecessor's decrement brings it to zero.
  remaining: Box<[AtomicU32]>,
  /// Task payloads, taken exactly once at dispatch.
  slots: Box<[Mutex<Option<ChunkTask>>]>,
  mode: CompletionMode,
}

impl WorkflowRun {
  pub fn new(
    graph: Arc<WorkflowGraph>,
    tasks: Vec<ChunkTask>,
    mode: CompletionMode,
  ) -> Result<Self, WorkflowError> {
    if tasks.len() != graph.task_count() {
      return Err(WorkflowError::TaskCountMismatch {
        expected: graph.task_count(),
        got: tasks.len(),
      });
    }
    let remaining = (0..graph.task_count())
      .map(|i| AtomicU32::new(graph.in_degree(i)))
      .collect();
    let slots = tasks
      .into_iter()
      .map(|t| Mutex::new(Some(t)))
      .collect();
    Ok(Self {
      graph,
      remaining,
      slots,
      mode,
    })
  }

  pub fn graph(&self) -> &Arc<WorkflowGraph> {
    &self.graph
  }

  /// Enqueue every entry task.
  pub fn start(self: &Arc<Self>, queue: &TaskQueue) {
    for &entry in self.graph.entries() {
      self.dispatch(entry, queue);
    }
  }

  /// Advance the DAG after `node` completed: decrement each dependent's
  /// counter and dispatch those reaching zero. Returns how many dependents
  /// were released.
  ///
  /// Called by the worker that finished the node's task; safe to race with
  /// completions of sibling predecessors.
  pub fn complete(self: &Arc<Self>, node: usize, queue: &TaskQueue) -> usize {
    let mut released = 0;
    for &dep in self.graph.dependents(node) {
      if self.remaining[dep].fetch_sub(1, Ordering::AcqRel) == 1 {
        self.dispatch(dep, queue);
        released += 1;
      }
    }
    trace!(node, released, "workflow node complete");
    released
  }

  /// Predecessors still outstanding for `node`.
  pub fn remaining(&self, node: usize) -> u32 {
    self.remaining[node].load(Ordering::Acquire)
  }

  fn dispatch(self: &Arc<Self>, node: usize, queue: &TaskQueue) {
    // The slot mutex makes dispatch idempotent; the counter logic should
    // already guarantee a single caller per node.
    if let Some(task) = self.slots[node].lock().take() {
      let hook = WorkflowHook {
        run: self.clone(),
        node,
      };
      queue.submit(QueuedTask::with_workflow(task, self.mode, hook));
    }
  }
}

#[cfg(test)]
#[path = "workflow_test.rs"]
mod workflow_test;
