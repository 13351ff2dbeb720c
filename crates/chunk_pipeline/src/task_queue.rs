//! Blocking MPMC task queue with timing feedback.
//!
//! Built on `crossbeam-channel`: every clone of the queue owns its own
//! sender/receiver endpoints, which play the role of per-thread
//! producer/consumer tokens - threads never share an endpoint, so the only
//! contention is inside the channel itself. Ordering is channel-FIFO per
//! producer; across concurrent producers no global order is guaranteed, only
//! that every enqueued task is eventually dequeued while the pool runs.
//!
//! Three channels travel together:
//! - the task channel itself,
//! - a timing-feedback channel ([`TaskTiming`]) workers report into,
//! - a completions channel for tasks enqueued with
//!   [`CompletionMode::Report`], whose finished payloads the external owner
//!   collects instead of the worker dropping them.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use web_time::Instant;

use crate::tasks::ChunkTask;
use crate::types::TaskKind;
use crate::workflow::WorkflowHook;

/// Who is responsible for a task after it completes.
///
/// The Rust rendition of an ownership flag: `Dispose` lets the worker drop
/// the finished task, `Report` sends it to the completions channel for the
/// enqueuing side to reclaim.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CompletionMode {
  Dispose,
  Report,
}

/// A task plus its queue bookkeeping.
pub struct QueuedTask {
  pub task: ChunkTask,
  pub mode: CompletionMode,
  /// Set when this task is a node in a workflow run; completion advances
  /// the DAG.
  pub workflow: Option<WorkflowHook>,
  enqueued_at: Instant,
}

impl QueuedTask {
  pub fn new(task: ChunkTask, mode: CompletionMode) -> Self {
    Self {
      task,
      mode,
      workflow: None,
      enqueued_at: Instant::now(),
    }
  }

  pub fn with_workflow(task: ChunkTask, mode: CompletionMode, hook: WorkflowHook) -> Self {
    Self {
      task,
      mode,
      workflow: Some(hook),
      enqueued_at: Instant::now(),
    }
  }

  /// Time spent waiting in the queue since the last (re-)enqueue.
  pub fn queued_for(&self) -> Duration {
    self.enqueued_at.elapsed()
  }
}

/// Execution timing for one dequeue→execute cycle of a task.
#[derive(Clone, Copy, Debug)]
pub struct TaskTiming {
  pub kind: TaskKind,
  /// Queue wait before this execution, in microseconds.
  pub queue_us: u64,
  /// Execution duration, in microseconds.
  pub exec_us: u64,
  /// `false` when the task yielded incomplete and was re-enqueued.
  pub completed: bool,
}

/// Cloneable handle to the shared task queue. See the module docs.
pub struct TaskQueue {
  tx: Sender<QueuedTask>,
  rx: Receiver<QueuedTask>,
  timing_tx: Sender<TaskTiming>,
  timing_rx: Receiver<TaskTiming>,
  done_tx: Sender<ChunkTask>,
  done_rx: Receiver<ChunkTask>,
}

impl TaskQueue {
  pub fn new() -> Self {
    let (tx, rx) = crossbeam_channel::unbounded();
    let (timing_tx, timing_rx) = crossbeam_channel::unbounded();
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    Self {
      tx,
      rx,
      timing_tx,
      timing_rx,
      done_tx,
      done_rx,
    }
  }

  /// Enqueue a task. Never blocks the producer.
  pub fn enqueue(&self, task: ChunkTask, mode: CompletionMode) {
    self.submit(QueuedTask::new(task, mode));
  }

  /// Enqueue a prepared [`QueuedTask`], refreshing its queue-wait clock.
  /// Also the re-enqueue path for tasks that returned incomplete.
  pub fn submit(&self, mut queued: QueuedTask) {
    queued.enqueued_at = Instant::now();
    if let Some(chunk) = queued.task.chunk() {
      chunk.set_pending_kind(queued.task.kind());
    }
    // Receivers only disconnect when every queue clone is gone; nothing to
    // deliver to in that case.
    let _ = self.tx.send(queued);
  }

  /// Block up to `timeout` for a task. `None` on timeout is not an error:
  /// it is the worker loop's chance to check its stop/suspend flags.
  pub fn dequeue(&self, timeout: Duration) -> Option<QueuedTask> {
    self.rx.recv_timeout(timeout).ok()
  }

  /// Tasks currently waiting in the queue.
  pub fn len(&self) -> usize {
    self.rx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rx.is_empty()
  }

  // ---------------------------------------------------------------------------
  // Timing feedback
  // ---------------------------------------------------------------------------

  pub fn record_timing(&self, timing: TaskTiming) {
    let _ = self.timing_tx.send(timing);
  }

  /// Drain all timing reports accumulated since the last call.
  pub fn drain_timings(&self) -> Vec<TaskTiming> {
    self.timing_rx.try_iter().collect()
  }

  // ---------------------------------------------------------------------------
  // Completion reports
  // ---------------------------------------------------------------------------

  pub(crate) fn report_completed(&self, task: ChunkTask) {
    let _ = self.done_tx.send(task);
  }

  /// Drain finished tasks that were enqueued with
  /// [`CompletionMode::Report`].
  pub fn drain_completed(&self) -> Vec<ChunkTask> {
    self.done_rx.try_iter().collect()
  }
}

impl Default for TaskQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for TaskQueue {
  fn clone(&self) -> Self {
    Self {
      tx: self.tx.clone(),
      rx: self.rx.clone(),
      timing_tx: self.timing_tx.clone(),
      timing_rx: self.timing_rx.clone(),
      done_tx: self.done_tx.clone(),
      done_rx: self.done_rx.clone(),
    }
  }
}

#[cfg(test)]
#[path = "task_queue_test.rs"]
mod task_queue_test;
