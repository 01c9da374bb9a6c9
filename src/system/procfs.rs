//! Line-oriented readers for procfs pseudo-files.
//!
//! Every read opens, buffers and closes one file. A file that cannot be read
//! (the process exited between enumeration and read, permission denied) is a
//! [`Reading::Absent`], never an error. Only the procfs root itself being
//! unusable is reported through [`ProcfsError`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_PROC_ROOT: &str = "/proc";

#[derive(Debug, Error)]
pub enum ProcfsError {
    #[error("procfs root {} is unavailable: {source}", path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("procfs root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to list {}: {source}", path.display())]
    ListFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The outcome of reading one value out of procfs.
///
/// `Absent` means the backing file vanished or held nothing usable, which is
/// different from a legitimate zero reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reading<T> {
    Value(T),
    Absent,
}

impl<T> Reading<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Reading::Absent)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Absent => None,
        }
    }

    pub fn as_ref(&self) -> Reading<&T> {
        match self {
            Reading::Value(v) => Reading::Value(v),
            Reading::Absent => Reading::Absent,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Value(v) => Reading::Value(f(v)),
            Reading::Absent => Reading::Absent,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Reading<U>) -> Reading<U> {
        match self {
            Reading::Value(v) => f(v),
            Reading::Absent => Reading::Absent,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Reading::Value(v) => v,
            Reading::Absent => default,
        }
    }
}

impl<T: Default> Reading<T> {
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or(T::default())
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Reading::Value(v),
            None => Reading::Absent,
        }
    }
}

/// Parsed `KEY<sep> VALUE [UNIT]` lines, keyed by the trimmed key.
///
/// Values are stored with surrounding whitespace removed but otherwise raw,
/// so `/proc/<pid>/status` `Uid:` keeps all four ids and `/proc/meminfo`
/// keeps its `kB` unit. Use [`KeyValueTable::first_token`] for the scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyValueTable {
    entries: HashMap<String, String>,
}

impl KeyValueTable {
    pub fn parse(contents: &str, separator: char) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let Some((key, value)) = line.split_once(separator) else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                tracing::trace!(line, "skipping malformed key/value line");
                continue;
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }
        KeyValueTable { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// First whitespace-delimited token of the value (drops units and
    /// trailing columns).
    pub fn first_token(&self, key: &str) -> Option<&str> {
        self.get(key)?.split_whitespace().next()
    }

    pub fn parse_first<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.first_token(key)?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads typed values out of a procfs tree rooted at `root`.
///
/// The root is configurable so tests can point it at a synthetic tree.
#[derive(Clone, Debug)]
pub struct ProcfsReader {
    root: PathBuf,
}

impl ProcfsReader {
    /// Opens a reader, failing only if `root` is missing or not a directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProcfsError> {
        let root = root.into();
        let metadata = fs::metadata(&root).map_err(|source| ProcfsError::RootUnavailable {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ProcfsError::NotADirectory(root));
        }
        Ok(ProcfsReader { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file below the procfs root, e.g. `proc_path("meminfo")`.
    pub fn proc_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Path of a file inside one process directory, e.g. `/proc/42/stat`.
    pub fn pid_path(&self, pid: u32, file: &str) -> PathBuf {
        self.root.join(pid.to_string()).join(file)
    }

    /// The whole file as text. Bytes that are not valid UTF-8 (a process
    /// name or argument may hold any byte) become U+FFFD instead of making
    /// the file unreadable.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Reading<String> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => Reading::Value(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "procfs entry unavailable");
                Reading::Absent
            }
        }
    }

    pub fn read_first_line(&self, path: impl AsRef<Path>) -> Reading<String> {
        self.read_to_string(path).and_then(|contents| {
            contents
                .lines()
                .next()
                .map(str::to_string)
                .into()
        })
    }

    /// `KEY: VALUE [UNIT]` lines (or `KEY=VALUE` with
    /// `separator = '='`). An unreadable file is an empty table.
    pub fn read_key_value_table(&self, path: impl AsRef<Path>, separator: char) -> KeyValueTable {
        self.read_to_string(path)
            .map(|contents| KeyValueTable::parse(&contents, separator))
            .unwrap_or_default()
    }

    /// The first line split on runs of whitespace.
    pub fn read_whitespace_fields(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.read_first_line(path)
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// A single-record file split on `delimiter`, such as
    /// `/proc/<pid>/stat`. Empty fields are kept so positional indices stay
    /// aligned.
    ///
    /// The record is the whole file minus its trailing newline, not just the
    /// first line: a process name may itself contain `\n`.
    pub fn read_delimited_fields(
        &self,
        path: impl AsRef<Path>,
        delimiter: char,
    ) -> Reading<Vec<String>> {
        self.read_to_string(path)
            .map(|contents| split_delimited(contents.trim_end_matches('\n'), delimiter))
    }

    /// Every non-empty line split on `delimiter`, for multi-record tables such
    /// as the passwd database.
    pub fn read_delimited_records(
        &self,
        path: impl AsRef<Path>,
        delimiter: char,
    ) -> Vec<Vec<String>> {
        self.read_to_string(path)
            .map(|contents| {
                contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| split_delimited(line, delimiter))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Immediate subdirectories whose name
    /// is entirely decimal digits, in directory order.
    pub fn enumerate_numeric_directory_entries(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<u32>, ProcfsError> {
        let path = path.as_ref();
        let entries = fs::read_dir(path).map_err(|source| ProcfsError::ListFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            // The entry may vanish between readdir and stat; skip it then.
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Ok(id) = name.parse::<u32>() {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Live process identifiers under the procfs root.
    pub fn pids(&self) -> Result<Vec<u32>, ProcfsError> {
        self.enumerate_numeric_directory_entries(&self.root)
    }
}

fn split_delimited(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(str::to_string).collect()
}
