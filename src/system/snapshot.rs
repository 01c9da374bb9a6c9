use serde::Serialize;

use super::metrics::MemorySnapshot;
use super::process::ProcessSnapshot;

/// Everything one refresh produced, processes sorted by descending cpu.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub os_name: String,
    pub kernel: String,
    pub cpu_utilization: f64,
    pub memory: Option<MemorySnapshot>,
    pub memory_utilization: f64,
    pub uptime_seconds: u64,
    pub total_processes: u64,
    pub running_processes: u64,
    pub processes: Vec<ProcessSnapshot>,
}
