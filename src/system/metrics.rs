use std::path::PathBuf;

use serde::Serialize;

use super::procfs::{DEFAULT_PROC_ROOT, ProcfsError, ProcfsReader, Reading};
use super::stat::{CpuTimes, Jiffies};
use super::users::{DEFAULT_PASSWD_PATH, UidUserMap};

pub const DEFAULT_OS_RELEASE_PATH: &str = "/etc/os-release";

/// Where the system-wide sources live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourcePaths {
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
    pub passwd: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        SourcePaths {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            os_release: PathBuf::from(DEFAULT_OS_RELEASE_PATH),
            passwd: PathBuf::from(DEFAULT_PASSWD_PATH),
        }
    }
}

/// `/proc/meminfo` totals, in kB as reported by the kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total_kb: u64,
    pub available_kb: u64,
    pub slab_kb: u64,
}

impl MemorySnapshot {
    /// `1 - (available - slab) / (total - slab)`, unclamped.
    ///
    /// Returns 0 when `total <= slab`.
    pub fn utilization(&self) -> f64 {
        let total = self.total_kb as f64 - self.slab_kb as f64;
        if total <= 0.0 {
            return 0.0;
        }
        let available = self.available_kb as f64 - self.slab_kb as f64;
        1.0 - available / total
    }
}

/// System-wide aggregates read from procfs.
#[derive(Clone, Debug)]
pub struct SystemMetrics {
    reader: ProcfsReader,
    paths: SourcePaths,
}

impl SystemMetrics {
    pub fn new(paths: SourcePaths) -> Result<Self, ProcfsError> {
        let reader = ProcfsReader::new(&paths.proc_root)?;
        Ok(SystemMetrics { reader, paths })
    }

    pub fn reader(&self) -> &ProcfsReader {
        &self.reader
    }

    pub fn paths(&self) -> &SourcePaths {
        &self.paths
    }

    /// `PRETTY_NAME` from os-release, quotes removed and underscores turned
    /// back into spaces.
    pub fn operating_system_name(&self) -> String {
        let table = self.reader.read_key_value_table(&self.paths.os_release, '=');
        table
            .get("PRETTY_NAME")
            .map(|raw| raw.trim_matches(|c: char| c == '"' || c == '\'').replace('_', " "))
            .unwrap_or_default()
    }

    /// Third token of `/proc/version` ("Linux version <kernel> ...").
    pub fn kernel_version(&self) -> String {
        let mut fields = self.reader.read_whitespace_fields(self.reader.proc_path("version"));
        if fields.len() > 2 {
            fields.swap_remove(2)
        } else {
            String::new()
        }
    }

    pub fn memory(&self) -> Reading<MemorySnapshot> {
        let table = self.reader.read_key_value_table(self.reader.proc_path("meminfo"), ':');
        let total = table.parse_first::<u64>("MemTotal");
        let available = table.parse_first::<u64>("MemAvailable");
        match (total, available) {
            (Some(total_kb), Some(available_kb)) => Reading::Value(MemorySnapshot {
                total_kb,
                available_kb,
                slab_kb: table.parse_first("Slab").unwrap_or(0),
            }),
            _ => Reading::Absent,
        }
    }

    pub fn memory_utilization(&self) -> f64 {
        self.memory().map(|m| m.utilization()).unwrap_or(0.0)
    }

    /// Seconds since boot, truncated.
    pub fn uptime(&self) -> Reading<u64> {
        let fields = self.reader.read_whitespace_fields(self.reader.proc_path("uptime"));
        fields
            .first()
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| secs as u64)
            .into()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.uptime().unwrap_or(0)
    }

    pub fn cpu_times(&self) -> Reading<CpuTimes> {
        let fields = self.reader.read_whitespace_fields(self.reader.proc_path("stat"));
        let times = CpuTimes::from_fields(&fields);
        if times.is_none() && !fields.is_empty() {
            tracing::debug!(line = ?fields, "unexpected aggregate cpu line");
        }
        times.into()
    }

    pub fn system_jiffies(&self) -> Jiffies {
        self.cpu_times().map(|t| t.jiffies()).unwrap_or_default()
    }

    pub fn jiffies(&self) -> u64 {
        self.system_jiffies().total()
    }

    pub fn active_jiffies(&self) -> u64 {
        self.system_jiffies().active
    }

    pub fn idle_jiffies(&self) -> u64 {
        self.system_jiffies().idle
    }

    /// Single-sample `active / (active + idle)`, the average since boot.
    pub fn cpu_utilization(&self) -> f64 {
        self.system_jiffies().utilization()
    }

    pub fn total_processes(&self) -> u64 {
        self.stat_scalar("processes")
    }

    pub fn running_processes(&self) -> u64 {
        self.stat_scalar("procs_running")
    }

    fn stat_scalar(&self, key: &str) -> u64 {
        self.reader
            .read_key_value_table(self.reader.proc_path("stat"), ' ')
            .parse_first(key)
            .unwrap_or(0)
    }

    pub fn build_uid_user_map(&self) -> UidUserMap {
        UidUserMap::build(&self.reader, &self.paths.passwd)
    }

    pub fn pids(&self) -> Result<Vec<u32>, ProcfsError> {
        self.reader.pids()
    }
}
