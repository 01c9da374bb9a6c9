//! Jiffy counters from `/proc/stat` and `/proc/<pid>/stat`.
//!
//! see `proc_pid_stat(5)` and `proc_stat(5)` for the field layouts.

use serde::Serialize;
use thiserror::Error;

/// Aggregate cpu time from the first `cpu` line of `/proc/stat`, in jiffies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

/// Active and idle jiffies, the two halves of a cpu time sample.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Jiffies {
    pub active: u64,
    pub idle: u64,
}

/// Per-process cpu time: utime, stime, cutime, cstime.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ProcessJiffies {
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
}

// === impl CpuTimes ===

impl CpuTimes {
    /// Parses whitespace-split fields of the aggregate line, label included.
    ///
    /// Kernels older than 2.6.33 omit `guest_nice` (and older still `guest`
    /// and `steal`); missing trailing counters read as zero. Returns `None`
    /// for a line that is not the aggregate `cpu` line or holds a
    /// non-numeric counter.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<CpuTimes> {
        let (label, counters) = fields.split_first()?;
        if label.as_ref() != "cpu" || counters.len() < 4 {
            return None;
        }

        let mut values = [0u64; 10];
        for (slot, raw) in values.iter_mut().zip(counters) {
            *slot = raw.as_ref().parse().ok()?;
        }
        let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] = values;

        Some(CpuTimes {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
            guest,
            guest_nice,
        })
    }

    /// Splits the sample into active and idle jiffies.
    ///
    /// `guest` is counted as active even though the kernel already folds it
    /// into `user`; `guest_nice` is not counted.
    pub fn jiffies(&self) -> Jiffies {
        Jiffies {
            active: self.user
                + self.nice
                + self.system
                + self.irq
                + self.softirq
                + self.steal
                + self.guest,
            idle: self.idle + self.iowait,
        }
    }
}

// === impl Jiffies ===

impl Jiffies {
    pub fn total(&self) -> u64 {
        self.active + self.idle
    }

    /// `active / total` of this single sample: the average since boot.
    pub fn utilization(&self) -> f64 {
        ratio(self.active, self.total())
    }

    /// `Δactive / Δtotal` between `previous` and this sample.
    ///
    /// Counters that went backwards contribute zero.
    pub fn utilization_since(&self, previous: &Jiffies) -> f64 {
        let active = self.active.saturating_sub(previous.active);
        let idle = self.idle.saturating_sub(previous.idle);
        ratio(active, active + idle)
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// === impl ProcessJiffies ===

impl ProcessJiffies {
    pub fn active(&self) -> u64 {
        self.utime + self.stime + self.cutime + self.cstime
    }
}

/// Named fields of `/proc/<pid>/stat`, by 0-based index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatField {
    Utime,
    Stime,
    Cutime,
    Cstime,
    StartTime,
}

impl StatField {
    pub const fn index(self) -> usize {
        match self {
            StatField::Utime => 13,
            StatField::Stime => 14,
            StatField::Cutime => 15,
            StatField::Cstime => 16,
            StatField::StartTime => 21,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StatField::Utime => "utime",
            StatField::Stime => "stime",
            StatField::Cutime => "cutime",
            StatField::Cstime => "cstime",
            StatField::StartTime => "starttime",
        }
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StatParseError {
    #[error("stat line has {len} fields, `{field}` needs index {index}")]
    MissingField {
        field: &'static str,
        index: usize,
        len: usize,
    },
    #[error("stat field `{field}` is not a counter: {value:?}")]
    InvalidCounter { field: &'static str, value: String },
}

/// A `/proc/<pid>/stat` line with its fields accessible by name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PidStat {
    fields: Vec<String>,
}

impl PidStat {
    /// Builds from the space-split line.
    ///
    /// `comm` is wrapped in parentheses and may itself contain spaces; its
    /// pieces are joined back so that later indices match the kernel layout.
    pub fn from_fields(mut fields: Vec<String>) -> PidStat {
        let opens_comm = fields.get(1).is_some_and(|f| f.starts_with('('));
        let closes_at = fields.iter().rposition(|f| f.ends_with(')'));
        if let (true, Some(close)) = (opens_comm, closes_at)
            && close > 1
        {
            let comm = fields[1..=close].join(" ");
            let rest = fields.split_off(close + 1);
            fields.truncate(1);
            fields.push(comm);
            fields.extend(rest);
        }
        PidStat { fields }
    }

    /// Parses the full contents of `/proc/<pid>/stat`. Only the trailing
    /// newline is stripped, since `comm` may contain one of its own.
    pub fn parse(contents: &str) -> PidStat {
        PidStat::from_fields(
            contents
                .trim_end_matches('\n')
                .split(' ')
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The process name without its parentheses.
    pub fn comm(&self) -> Option<&str> {
        let raw = self.fields.get(1)?;
        let inner = raw.strip_prefix('(').unwrap_or(raw);
        Some(inner.strip_suffix(')').unwrap_or(inner))
    }

    pub fn get(&self, field: StatField) -> Result<u64, StatParseError> {
        let raw = self
            .fields
            .get(field.index())
            .ok_or(StatParseError::MissingField {
                field: field.name(),
                index: field.index(),
                len: self.fields.len(),
            })?;
        raw.parse().map_err(|_| StatParseError::InvalidCounter {
            field: field.name(),
            value: raw.clone(),
        })
    }

    pub fn jiffies(&self) -> Result<ProcessJiffies, StatParseError> {
        Ok(ProcessJiffies {
            utime: self.get(StatField::Utime)?,
            stime: self.get(StatField::Stime)?,
            cutime: self.get(StatField::Cutime)?,
            cstime: self.get(StatField::Cstime)?,
        })
    }

    /// Clock ticks after boot at which the process started.
    pub fn start_ticks(&self) -> Result<u64, StatParseError> {
        self.get(StatField::StartTime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STAT_LINE: &str = "4021 (Web Content) S 1 4021 4021 0 -1 4194560 8213 0 12 0 \
                             310 42 7 3 20 0 23 0 98765 2730000000 64000 18446744073709551615";

    #[test]
    fn parses_aggregate_cpu_line() {
        let fields: Vec<&str> = "cpu  10 1 5 100 4 2 3 0 6 1".split_whitespace().collect();
        let times = CpuTimes::from_fields(&fields).unwrap();
        assert_eq!(times.user, 10);
        assert_eq!(times.guest_nice, 1);
        let jiffies = times.jiffies();
        assert_eq!(jiffies.active, 10 + 1 + 5 + 2 + 3 + 6);
        assert_eq!(jiffies.idle, 104);
    }

    #[test]
    fn missing_trailing_counters_read_as_zero() {
        let times = CpuTimes::from_fields(&["cpu", "1", "2", "3", "4", "5", "6", "7"]).unwrap();
        assert_eq!(times.steal, 0);
        assert_eq!(times.guest, 0);
    }

    #[test]
    fn rejects_per_cpu_and_garbage_lines() {
        assert!(CpuTimes::from_fields(&["cpu0", "1", "2", "3", "4"]).is_none());
        assert!(CpuTimes::from_fields(&["cpu", "1", "x", "3", "4"]).is_none());
        assert!(CpuTimes::from_fields::<&str>(&[]).is_none());
    }

    #[test]
    fn all_zero_counters_do_not_divide_by_zero() {
        let jiffies = CpuTimes::default().jiffies();
        assert_eq!(jiffies.utilization(), 0.0);
        assert_eq!(jiffies.utilization_since(&jiffies), 0.0);
    }

    #[test]
    fn interval_utilization_uses_deltas() {
        let before = Jiffies { active: 100, idle: 900 };
        let after = Jiffies { active: 175, idle: 925 };
        assert!((after.utilization_since(&before) - 0.75).abs() < 1e-12);
        assert!((after.utilization() - 0.159_090_909).abs() < 1e-6);
    }

    #[test]
    fn counter_reset_is_treated_as_no_progress() {
        let before = Jiffies { active: 500, idle: 500 };
        let after = Jiffies { active: 10, idle: 10 };
        assert_eq!(after.utilization_since(&before), 0.0);
    }

    #[test]
    fn pid_stat_rejoins_comm_with_spaces() {
        let stat = PidStat::parse(STAT_LINE);
        assert_eq!(stat.comm(), Some("Web Content"));
        assert_eq!(
            stat.jiffies().unwrap(),
            ProcessJiffies { utime: 310, stime: 42, cutime: 7, cstime: 3 }
        );
        assert_eq!(stat.jiffies().unwrap().active(), 362);
        assert_eq!(stat.start_ticks().unwrap(), 98765);
    }

    #[test]
    fn truncated_stat_line_is_a_defined_error() {
        let stat = PidStat::parse("4021 (bash) S 1 4021");
        assert_eq!(stat.len(), 5);
        assert_eq!(
            stat.start_ticks(),
            Err(StatParseError::MissingField { field: "starttime", index: 21, len: 5 })
        );
        assert_eq!(
            stat.jiffies(),
            Err(StatParseError::MissingField { field: "utime", index: 13, len: 5 })
        );
    }

    #[test]
    fn non_numeric_field_is_a_defined_error() {
        let line = STAT_LINE.replace(" 310 ", " abc ");
        let stat = PidStat::parse(&line);
        assert_eq!(
            stat.get(StatField::Utime),
            Err(StatParseError::InvalidCounter { field: "utime", value: "abc".to_string() })
        );
    }

    proptest! {
        #[test]
        fn active_plus_idle_is_total(counters in proptest::array::uniform10(0u64..1_000_000_000)) {
            let fields: Vec<String> = std::iter::once("cpu".to_string())
                .chain(counters.iter().map(u64::to_string))
                .collect();
            let jiffies = CpuTimes::from_fields(&fields).unwrap().jiffies();
            let expected: u64 = counters.iter().sum::<u64>() - counters[9];
            prop_assert_eq!(jiffies.active + jiffies.idle, jiffies.total());
            prop_assert_eq!(jiffies.total(), expected);
            let utilization = jiffies.utilization();
            prop_assert!((0.0..=1.0).contains(&utilization));
        }
    }
}
