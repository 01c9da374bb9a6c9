//! Synthetic procfs trees for unit and integration tests.
//!
//! Helpers panic on any I/O failure; they only ever run under the test
//! harness.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::metrics::SourcePaths;
use super::procfs::ProcfsReader;

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A throwaway procfs-shaped directory under the temp dir, removed on drop.
pub struct FakeProc {
    root: PathBuf,
}

impl FakeProc {
    pub fn new(name: &str) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "proctop_fake_{name}_{}_{id}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).expect("create fake procfs root");
        FakeProc { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reader(&self) -> ProcfsReader {
        ProcfsReader::new(&self.root).expect("fake procfs root is a directory")
    }

    /// Sources rooted in the fake tree, with os-release and passwd under `etc/`.
    pub fn paths(&self) -> SourcePaths {
        SourcePaths {
            proc_root: self.root.clone(),
            os_release: self.root.join("etc/os-release"),
            passwd: self.root.join("etc/passwd"),
        }
    }

    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.root.join(relative)).expect("create fake directory");
    }

    /// Writes raw bytes, so contents need not be valid UTF-8.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fake parent directory");
        }
        fs::write(&path, contents).expect("write fake procfs file");
        path
    }

    /// System-wide files: os-release, passwd, version, meminfo, uptime, stat.
    pub fn write_system(&self) {
        self.write("etc/os-release", "NAME=\"Ubuntu\"\nPRETTY_NAME=\"Ubuntu_22.04\"\n");
        self.write(
            "etc/passwd",
            "root:x:0:0:root:/root:/bin/bash\nalice:x:1000:1000::/home/alice:/bin/zsh\n",
        );
        self.write(
            "version",
            "Linux version 6.5.0-21-generic (buildd@lcy02) (gcc 12.3.0) #21-Ubuntu SMP\n",
        );
        self.write(
            "meminfo",
            "MemTotal:        2000000 kB\nMemFree:          500000 kB\n\
             MemAvailable:    1100000 kB\nSlab:             200000 kB\n",
        );
        self.write("uptime", "200.75 700.00\n");
        self.write(
            "stat",
            "cpu  300 0 100 1500 100 0 0 0 0 0\ncpu0 300 0 100 1500 100 0 0 0 0 0\n\
             ctxt 1990473\nprocesses 512\nprocs_running 4\nprocs_blocked 0\n",
        );
    }

    /// Writes `stat`, `status` and `cmdline` for one process. Stat fields 13-16
    /// carry the jiffies and 21 the start ticks.
    pub fn add_process(&self, pid: u32, uid: u32, rss_kb: u64, jiffies: [u64; 4], start: u64) {
        let [utime, stime, cutime, cstime] = jiffies;
        self.write(
            &format!("{pid}/stat"),
            format!(
                "{pid} (proc {pid}) S 1 {pid} {pid} 0 -1 4194560 100 0 0 0 \
                 {utime} {stime} {cutime} {cstime} 20 0 1 0 {start} 10000000 300 \
                 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0\n"
            ),
        );
        self.write(
            &format!("{pid}/status"),
            format!(
                "Name:\tproc\nState:\tS (sleeping)\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\n\
                 VmRSS:\t    {rss_kb} kB\n"
            ),
        );
        self.write(&format!("{pid}/cmdline"), format!("/usr/bin/proc{pid}\0--flag\0"));
    }
}

impl Drop for FakeProc {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
