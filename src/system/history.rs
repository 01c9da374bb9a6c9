use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::clock::ClockTicks;
use super::stat::Jiffies;

/// The previous refresh's raw counters for one process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessSample {
    pub start_ticks: u64,
    pub active_jiffies: u64,
}

/// Raw jiffy samples carried from one refresh to the next.
///
/// Only the last sample is kept. Identifiers that disappear are dropped on
/// [`JiffyHistory::retain_alive`]; a reused identifier is recognised by its
/// changed start time and treated as a new process.
#[derive(Debug, Default)]
pub struct JiffyHistory {
    system: Option<(Jiffies, Instant)>,
    processes: HashMap<u32, ProcessSample>,
}

impl JiffyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the system sample, returning the previous one.
    pub fn record_system(&mut self, jiffies: Jiffies, at: Instant) -> Option<(Jiffies, Instant)> {
        self.system.replace((jiffies, at))
    }

    /// Records a process sample, returning the previous one if it belongs to
    /// the same process (same start time).
    pub fn record_process(&mut self, pid: u32, sample: ProcessSample) -> Option<ProcessSample> {
        self.processes
            .insert(pid, sample)
            .filter(|previous| previous.start_ticks == sample.start_ticks)
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessSample> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Remove samples for PIDs that are no longer alive.
    pub fn retain_alive(&mut self, alive_pids: &HashSet<u32>) {
        self.processes.retain(|pid, _| alive_pids.contains(pid));
    }

    /// `(Δactive / hz) / elapsed` as a fraction of one cpu.
    ///
    /// Returns `None` when there is no usable interval.
    pub fn process_utilization(
        previous: &ProcessSample,
        current: &ProcessSample,
        elapsed_secs: f64,
        clock: ClockTicks,
    ) -> Option<f64> {
        if previous.start_ticks != current.start_ticks || elapsed_secs <= 0.0 {
            return None;
        }
        let delta = current.active_jiffies.saturating_sub(previous.active_jiffies);
        Some(clock.to_seconds(delta) / elapsed_secs)
    }
}
