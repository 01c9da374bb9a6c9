use std::collections::HashSet;
use std::time::Instant;

use super::clock::ClockTicks;
use super::history::{JiffyHistory, ProcessSample};
use super::metrics::{SourcePaths, SystemMetrics};
use super::process::{ProcessContext, ProcessSnapshot, sort_by_cpu};
use super::procfs::ProcfsError;
use super::snapshot::SystemSnapshot;

/// How cpu utilization is turned from counters into a rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuConvention {
    /// Single sample: average since boot (system) or since start (process).
    Cumulative,
    /// Difference between this refresh and the previous one.
    #[default]
    Interval,
}

impl CpuConvention {
    pub fn label(self) -> &'static str {
        match self {
            CpuConvention::Cumulative => "cumulative",
            CpuConvention::Interval => "interval",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cumulative" | "average" => CpuConvention::Cumulative,
            _ => CpuConvention::Interval,
        }
    }
}

/// Runs one refresh tick: system aggregates plus one snapshot per live pid.
pub struct Collector {
    metrics: SystemMetrics,
    clock: ClockTicks,
    convention: CpuConvention,
    history: JiffyHistory,
}

impl Collector {
    pub fn new(paths: SourcePaths, convention: CpuConvention) -> Result<Self, ProcfsError> {
        let metrics = SystemMetrics::new(paths)?;
        Ok(Self::with_clock(metrics, ClockTicks::from_system(), convention))
    }

    pub fn with_clock(metrics: SystemMetrics, clock: ClockTicks, convention: CpuConvention) -> Self {
        Collector {
            metrics,
            clock,
            convention,
            history: JiffyHistory::new(),
        }
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    pub fn convention(&self) -> CpuConvention {
        self.convention
    }

    pub fn history(&self) -> &JiffyHistory {
        &self.history
    }

    pub fn refresh(&mut self) -> Result<SystemSnapshot, ProcfsError> {
        self.refresh_at(Instant::now())
    }

    /// Like [`Collector::refresh`] with an explicit sampling instant.
    pub fn refresh_at(&mut self, now: Instant) -> Result<SystemSnapshot, ProcfsError> {
        let _refresh_span = tracing::debug_span!("collector.refresh").entered();

        let jiffies = self.metrics.system_jiffies();
        let previous = self.history.record_system(jiffies, now);
        let interval = match self.convention {
            CpuConvention::Interval => previous,
            CpuConvention::Cumulative => None,
        };
        let cpu_utilization = match interval {
            Some((before, _)) => jiffies.utilization_since(&before),
            None => jiffies.utilization(),
        };
        let elapsed_secs = interval.map(|(_, at)| now.saturating_duration_since(at).as_secs_f64());

        let pids = self.metrics.pids()?;
        let users = self.metrics.build_uid_user_map();
        let ctx = ProcessContext {
            reader: self.metrics.reader(),
            users: &users,
            clock: self.clock,
            system_uptime: self.metrics.uptime_seconds(),
        };

        let mut processes = Vec::with_capacity(pids.len());
        for &pid in &pids {
            let Some(mut process) = ProcessSnapshot::read(&ctx, pid).value() else {
                continue;
            };
            if self.convention == CpuConvention::Interval {
                let current = ProcessSample {
                    start_ticks: process.start_ticks(),
                    active_jiffies: process.active_jiffies(),
                };
                let previous = self.history.record_process(pid, current);
                if let (Some(previous), Some(elapsed)) = (previous, elapsed_secs)
                    && let Some(rate) =
                        JiffyHistory::process_utilization(&previous, &current, elapsed, self.clock)
                {
                    process.set_cpu_utilization(rate);
                }
            }
            processes.push(process);
        }

        let alive: HashSet<u32> = pids.iter().copied().collect();
        self.history.retain_alive(&alive);

        sort_by_cpu(&mut processes);
        tracing::debug!(
            enumerated = pids.len(),
            collected = processes.len(),
            "refresh complete"
        );

        let memory = self.metrics.memory().value();
        Ok(SystemSnapshot {
            os_name: self.metrics.operating_system_name(),
            kernel: self.metrics.kernel_version(),
            cpu_utilization,
            memory,
            memory_utilization: memory.map(|m| m.utilization()).unwrap_or(0.0),
            uptime_seconds: ctx.system_uptime,
            total_processes: self.metrics.total_processes(),
            running_processes: self.metrics.running_processes(),
            processes,
        })
    }
}
