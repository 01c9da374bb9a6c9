use std::cmp::Ordering;

use serde::Serialize;

use super::clock::ClockTicks;
use super::procfs::{KeyValueTable, ProcfsReader, Reading};
use super::stat::{PidStat, ProcessJiffies};
use super::users::UidUserMap;

/// Everything one refresh shares across its process snapshots.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext<'a> {
    pub reader: &'a ProcfsReader,
    pub users: &'a UidUserMap,
    pub clock: ClockTicks,
    /// System uptime in whole seconds at the start of the refresh.
    pub system_uptime: u64,
}

/// One process at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pid: u32,
    user: String,
    uid: Option<String>,
    command: String,
    ram_kb: Option<u64>,
    start_ticks: u64,
    uptime_seconds: u64,
    jiffies: ProcessJiffies,
    cpu_utilization: f64,
}

impl ProcessSnapshot {
    /// Reads `/proc/<pid>/{stat,status,cmdline}`.
    ///
    /// `Absent` when the process is gone (stat or status missing) or its stat
    /// line cannot be parsed; a stale snapshot is never produced. The cpu utilization starts out
    /// as the cumulative value, see [`ProcessSnapshot::cumulative_cpu`].
    pub fn read(ctx: &ProcessContext<'_>, pid: u32) -> Reading<ProcessSnapshot> {
        let reader = ctx.reader;

        let Reading::Value(fields) = reader
            .read_delimited_fields(reader.pid_path(pid, "stat"), ' ')
            .map(PidStat::from_fields)
        else {
            return Reading::Absent;
        };
        let (jiffies, start_ticks) = match (fields.jiffies(), fields.start_ticks()) {
            (Ok(jiffies), Ok(start)) => (jiffies, start),
            (Err(err), _) | (_, Err(err)) => {
                tracing::debug!(pid, error = %err, "skipping process with malformed stat");
                return Reading::Absent;
            }
        };

        // Every process has a status file, kernel threads included.
        let Reading::Value(status) = reader
            .read_to_string(reader.pid_path(pid, "status"))
            .map(|contents| KeyValueTable::parse(&contents, ':'))
        else {
            tracing::debug!(pid, "process exited between stat and status");
            return Reading::Absent;
        };
        let uid = status.first_token("Uid").map(str::to_string);
        let ram_kb = status.parse_first::<u64>("VmRSS");
        let user = match uid.as_deref() {
            Some(uid) => lookup_user(ctx.users, pid, uid),
            None => String::new(),
        };

        let command = reader
            .read_to_string(reader.pid_path(pid, "cmdline"))
            .map(|raw| first_token(&raw).to_string())
            .unwrap_or_default();

        let uptime_seconds = ctx
            .system_uptime
            .saturating_sub(ctx.clock.whole_seconds(start_ticks));

        let mut snapshot = ProcessSnapshot {
            pid,
            user,
            uid,
            command,
            ram_kb,
            start_ticks,
            uptime_seconds,
            jiffies,
            cpu_utilization: 0.0,
        };
        snapshot.cpu_utilization = snapshot.cumulative_cpu(ctx.clock);
        Reading::Value(snapshot)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// First token of the command line; empty if it could not be read.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Resident memory in whole megabytes (`kB / 1000`), empty if unknown.
    pub fn ram(&self) -> String {
        self.ram_kb.map(kb_to_mb_string).unwrap_or_default()
    }

    pub fn ram_kb(&self) -> Option<u64> {
        self.ram_kb
    }

    /// Owning user name, empty if the uid has no passwd entry.
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub fn start_ticks(&self) -> u64 {
        self.start_ticks
    }

    /// System uptime minus the process start time, in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds
    }

    pub fn jiffies(&self) -> ProcessJiffies {
        self.jiffies
    }

    pub fn active_jiffies(&self) -> u64 {
        self.jiffies.active()
    }

    /// Utilization as a fraction of one cpu.
    pub fn cpu_utilization(&self) -> f64 {
        self.cpu_utilization
    }

    pub fn set_cpu_utilization(&mut self, utilization: f64) {
        self.cpu_utilization = utilization;
    }

    /// Cpu seconds consumed over process uptime: the average since start.
    pub fn cumulative_cpu(&self, clock: ClockTicks) -> f64 {
        if self.uptime_seconds == 0 {
            return 0.0;
        }
        clock.to_seconds(self.active_jiffies()) / self.uptime_seconds as f64
    }
}

fn lookup_user(users: &UidUserMap, pid: u32, uid: &str) -> String {
    match users.get(uid) {
        Some(name) => name.to_string(),
        None => {
            tracing::warn!(pid, uid, "uid has no entry in the user database");
            String::new()
        }
    }
}

/// `/proc/<pid>/cmdline` separates arguments with NULs.
fn first_token(raw: &str) -> &str {
    raw.split(|c: char| c == '\0' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or("")
}

/// Kilobytes to whole megabytes, dividing by 1000.
pub fn kb_to_mb(kb: u64) -> u64 {
    kb / 1000
}

pub fn kb_to_mb_string(kb: u64) -> String {
    kb_to_mb(kb).to_string()
}

/// Descending cpu utilization.
pub fn cmp_by_cpu(a: &ProcessSnapshot, b: &ProcessSnapshot) -> Ordering {
    b.cpu_utilization.total_cmp(&a.cpu_utilization)
}

/// Sorts by descending cpu utilization; ties keep their current order.
pub fn sort_by_cpu(processes: &mut [ProcessSnapshot]) {
    processes.sort_by(cmp_by_cpu);
}

#[cfg(test)]
pub(crate) fn snapshot_for_test(pid: u32, cpu_utilization: f64) -> ProcessSnapshot {
    ProcessSnapshot {
        pid,
        user: "tester".to_string(),
        uid: Some("1000".to_string()),
        command: format!("/usr/bin/proc{pid}"),
        ram_kb: Some(2048),
        start_ticks: 0,
        uptime_seconds: 10,
        jiffies: ProcessJiffies::default(),
        cpu_utilization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fixture::FakeProc;

    fn users() -> UidUserMap {
        [("0", "root"), ("1000", "alice")].into_iter().collect()
    }

    #[test]
    fn reads_process_files() {
        let fake = FakeProc::new("process_read");
        fake.add_process(42, 1000, 52_340, [300, 100, 50, 50], 1_000);
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 60,
        };

        let process = ProcessSnapshot::read(&ctx, 42).value().unwrap();
        assert_eq!(process.pid(), 42);
        assert_eq!(process.user(), "alice");
        assert_eq!(process.uid(), Some("1000"));
        assert_eq!(process.command(), "/usr/bin/proc42");
        assert_eq!(process.ram(), "52");
        assert_eq!(process.start_ticks(), 1_000);
        // 60 - 1000 / 100
        assert_eq!(process.uptime_seconds(), 50);
        assert_eq!(process.active_jiffies(), 500);
        // 5 cpu seconds over 50 seconds of uptime
        assert!((process.cpu_utilization() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn vanished_process_is_absent() {
        let fake = FakeProc::new("process_vanished");
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 60,
        };
        assert!(ProcessSnapshot::read(&ctx, 4242).is_absent());
    }

    #[test]
    fn truncated_stat_is_absent() {
        let fake = FakeProc::new("process_truncated");
        fake.write("7/stat", "7 (short) S 1 7\n");
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 60,
        };
        assert!(ProcessSnapshot::read(&ctx, 7).is_absent());
    }

    #[test]
    fn unknown_uid_yields_empty_user() {
        let fake = FakeProc::new("process_unknown_uid");
        fake.add_process(9, 4242, 1_000, [0, 0, 0, 0], 0);
        fake.write("9/cmdline", "");
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 0,
        };

        let process = ProcessSnapshot::read(&ctx, 9).value().unwrap();
        assert_eq!(process.user(), "");
        assert_eq!(process.uid(), Some("4242"));
        assert_eq!(process.command(), "");
        assert_eq!(process.uptime_seconds(), 0);
        assert_eq!(process.cpu_utilization(), 0.0);
    }

    #[test]
    fn status_vanishing_after_stat_drops_the_process() {
        let fake = FakeProc::new("process_no_status");
        fake.add_process(11, 0, 1_000, [1, 1, 1, 1], 0);
        std::fs::remove_file(fake.root().join("11/status")).unwrap();
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 5,
        };

        assert!(ProcessSnapshot::read(&ctx, 11).is_absent());
    }

    #[test]
    fn status_without_vmrss_has_blank_ram() {
        let fake = FakeProc::new("process_kernel_thread");
        fake.add_process(2, 0, 0, [0, 0, 0, 0], 0);
        fake.write("2/status", "Name:\tkthreadd\nUid:\t0\t0\t0\t0\n");
        fake.write("2/cmdline", "");
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 5,
        };

        let process = ProcessSnapshot::read(&ctx, 2).value().unwrap();
        assert_eq!(process.user(), "root");
        assert_eq!(process.ram(), "");
        assert_eq!(process.ram_kb(), None);
        assert_eq!(process.command(), "");
    }

    #[test]
    fn non_utf8_name_and_arguments_keep_the_process() {
        let fake = FakeProc::new("process_non_utf8");
        fake.add_process(50, 0, 1_000, [10, 10, 0, 0], 0);
        fake.write(
            "50/stat",
            b"50 (proc\xffX) S 1 50 50 0 -1 4194560 100 0 0 0 10 10 0 0 20 0 1 0 0 10000000 300\n",
        );
        fake.write("50/cmdline", b"/usr/bin/cat\0caf\xe9.txt\0");
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 5,
        };

        let process = ProcessSnapshot::read(&ctx, 50).value().unwrap();
        assert_eq!(process.command(), "/usr/bin/cat");
        assert_eq!(process.active_jiffies(), 20);
    }

    #[test]
    fn newline_in_name_keeps_field_alignment() {
        let fake = FakeProc::new("process_newline_comm");
        fake.add_process(51, 0, 1_000, [0, 0, 0, 0], 0);
        fake.write(
            "51/stat",
            "51 (evil\n) S 1 51 51 0 -1 4194560 100 0 0 0 30 20 0 0 20 0 1 0 100 10000000 300\n",
        );
        let reader = fake.reader();
        let users = users();
        let ctx = ProcessContext {
            reader: &reader,
            users: &users,
            clock: ClockTicks::new(100),
            system_uptime: 5,
        };

        let process = ProcessSnapshot::read(&ctx, 51).value().unwrap();
        assert_eq!(process.active_jiffies(), 50);
        assert_eq!(process.start_ticks(), 100);
        assert_eq!(process.uptime_seconds(), 4);
    }

    #[test]
    fn ram_divides_by_one_thousand() {
        assert_eq!(kb_to_mb_string(1024), "1");
        assert_eq!(kb_to_mb_string(2048), "2");
        assert_eq!(kb_to_mb_string(999), "0");
        // 1024 would give 1 here, 1000 gives 2.
        assert_eq!(kb_to_mb_string(2000), "2");
        assert_eq!(kb_to_mb_string(2047), "2");
    }

    #[test]
    fn cmdline_first_token_handles_nul_and_spaces() {
        assert_eq!(first_token("/bin/sh\0-c\0true\0"), "/bin/sh");
        assert_eq!(first_token("nginx: master process"), "nginx:");
        assert_eq!(first_token(""), "");
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut processes = vec![
            snapshot_for_test(1, 0.1),
            snapshot_for_test(2, 0.9),
            snapshot_for_test(3, 0.1),
            snapshot_for_test(4, 0.5),
        ];
        sort_by_cpu(&mut processes);

        let order: Vec<(u32, f64)> = processes
            .iter()
            .map(|p| (p.pid(), p.cpu_utilization()))
            .collect();
        assert_eq!(order, vec![(2, 0.9), (4, 0.5), (1, 0.1), (3, 0.1)]);
    }
}
