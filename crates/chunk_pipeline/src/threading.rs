//! Fixed worker pool draining the shared task queue.
//!
//! Each worker runs the same loop: a timed dequeue (so the stop and suspend
//! flags are observed at loop granularity even when the queue is idle),
//! execute, then either re-enqueue the task (incomplete), or advance its
//! workflow and dispose/report it (complete). Cancellation is cooperative -
//! an in-flight task always runs to its next yield or completion point, so
//! `stop` joins with a tail latency of at most the longest-running task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, trace};
use web_time::Instant;

use crate::constants::{DEQUEUE_WAIT, SUSPEND_POLL};
use crate::task_queue::{CompletionMode, TaskQueue, TaskTiming};

struct WorkerShared {
  queue: TaskQueue,
  stop: AtomicBool,
  suspended: AtomicBool,
}

/// A fixed set of named OS worker threads. See the module docs.
pub struct WorkerPool {
  shared: Arc<WorkerShared>,
  handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
  /// Spawn `num_threads` workers draining `queue`.
  pub fn new(queue: TaskQueue, num_threads: usize) -> Self {
    let shared = Arc::new(WorkerShared {
      queue,
      stop: AtomicBool::new(false),
      suspended: AtomicBool::new(false),
    });

    let handles = (0..num_threads.max(1))
      .map(|i| {
        let shared = shared.clone();
        std::thread::Builder::new()
          .name(format!("chunk-worker-{i}"))
          .spawn(move || worker_loop(&shared))
          .expect("failed to spawn chunk worker thread")
      })
      .collect();

    Self { shared, handles }
  }

  /// The queue this pool drains. Clone it for per-thread producer tokens.
  pub fn queue(&self) -> &TaskQueue {
    &self.shared.queue
  }

  pub fn num_threads(&self) -> usize {
    self.handles.len()
  }

  /// Pause task consumption. Workers sleep-poll without draining the queue
  /// until [`resume`](Self::resume).
  pub fn suspend(&self) {
    self.shared.suspended.store(true, Ordering::Release);
  }

  pub fn resume(&self) {
    self.shared.suspended.store(false, Ordering::Release);
  }

  pub fn is_suspended(&self) -> bool {
    self.shared.suspended.load(Ordering::Acquire)
  }

  /// Cooperative shutdown: flag every worker to stop and join them.
  ///
  /// Returns only after each worker's in-flight task has run to its next
  /// yield/completion point. Queued tasks that no worker picked up before
  /// the flag was set are left in the queue, unexecuted.
  pub fn stop(mut self) {
    self.shared.stop.store(true, Ordering::Release);
    for handle in self.handles.drain(..) {
      let _ = handle.join();
    }
    debug!("worker pool stopped");
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    // Workers notice at the next loop iteration; dropping without `stop`
    // does not wait for them.
    self.shared.stop.store(true, Ordering::Release);
  }
}

fn worker_loop(shared: &WorkerShared) {
  trace!("worker started");
  loop {
    if shared.stop.load(Ordering::Acquire) {
      break;
    }
    if shared.suspended.load(Ordering::Acquire) {
      std::thread::sleep(SUSPEND_POLL);
      continue;
    }

    // Timeout is the normal idle path, not an error.
    let Some(mut queued) = shared.queue.dequeue(DEQUEUE_WAIT) else {
      continue;
    };

    let queue_us = queued.queued_for().as_micros() as u64;
    let kind = queued.task.kind();
    let start = Instant::now();
    let done = queued.task.execute(&shared.queue);
    let exec_us = start.elapsed().as_micros() as u64;

    shared.queue.record_timing(TaskTiming {
      kind,
      queue_us,
      exec_us,
      completed: done,
    });

    if !done {
      // The task yielded (dependency not met yet); put it back in
      // circulation.
      shared.queue.submit(queued);
      continue;
    }

    if let Some(hook) = queued.workflow.take() {
      hook.run.complete(hook.node, &shared.queue);
    }

    match queued.mode {
      CompletionMode::Dispose => {}
      CompletionMode::Report => shared.queue.report_completed(queued.task),
    }
  }
  trace!("worker stopped");
}
