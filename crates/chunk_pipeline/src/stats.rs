//! Aggregation of the queue's timing feedback into per-kind tallies.

use std::collections::HashMap;

use crate::task_queue::{TaskQueue, TaskTiming};
use crate::types::TaskKind;

/// Accumulated timings for one task kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct KindStats {
  /// Completed executions.
  pub runs: u64,
  /// Executions that yielded incomplete and were re-queued.
  pub requeues: u64,
  pub total_exec_us: u64,
  pub max_exec_us: u64,
  pub total_queue_us: u64,
}

impl KindStats {
  pub fn avg_exec_us(&self) -> u64 {
    if self.runs == 0 {
      0
    } else {
      self.total_exec_us / self.runs
    }
  }

  pub fn avg_queue_us(&self) -> u64 {
    let samples = self.runs + self.requeues;
    if samples == 0 {
      0
    } else {
      self.total_queue_us / samples
    }
  }
}

/// Rolling per-kind timing aggregate, fed from the queue's feedback channel.
#[derive(Default)]
pub struct TimingStats {
  by_kind: HashMap<TaskKind, KindStats>,
}

impl TimingStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&mut self, timing: &TaskTiming) {
    let entry = self.by_kind.entry(timing.kind).or_default();
    if timing.completed {
      entry.runs += 1;
      entry.total_exec_us += timing.exec_us;
      entry.max_exec_us = entry.max_exec_us.max(timing.exec_us);
    } else {
      entry.requeues += 1;
    }
    entry.total_queue_us += timing.queue_us;
  }

  /// Drain everything pending on the queue's timing channel into the
  /// aggregate. Returns the number of samples consumed.
  pub fn drain_from(&mut self, queue: &TaskQueue) -> usize {
    let timings = queue.drain_timings();
    for timing in &timings {
      self.record(timing);
    }
    timings.len()
  }

  pub fn get(&self, kind: TaskKind) -> Option<&KindStats> {
    self.by_kind.get(&kind)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&TaskKind, &KindStats)> {
    self.by_kind.iter()
  }
}
