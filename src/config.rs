use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::system::collector::CpuConvention;
use crate::system::metrics::{DEFAULT_OS_RELEASE_PATH, SourcePaths};
use crate::system::procfs::DEFAULT_PROC_ROOT;
use crate::system::users::DEFAULT_PASSWD_PATH;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub refresh_rate_ms: u64,
    pub cpu_convention: String,
    /// Rows shown in the process table; 0 shows every process.
    pub max_processes: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            refresh_rate_ms: 1000,
            cpu_convention: "interval".to_string(),
            max_processes: 0,
        }
    }
}

impl GeneralConfig {
    pub fn cpu_convention(&self) -> CpuConvention {
        CpuConvention::from_str_config(&self.cpu_convention)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub proc_root: PathBuf,
    pub os_release: PathBuf,
    pub passwd: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            os_release: PathBuf::from(DEFAULT_OS_RELEASE_PATH),
            passwd: PathBuf::from(DEFAULT_PASSWD_PATH),
        }
    }
}

impl SourcesConfig {
    pub fn paths(&self) -> SourcePaths {
        SourcePaths {
            proc_root: self.proc_root.clone(),
            os_release: self.os_release.clone(),
            passwd: self.passwd.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty disables logging; the terminal belongs to the UI.
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: String::new(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("proctop").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
        Err(_) => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.general.refresh_rate_ms, 1000);
        assert_eq!(config.general.cpu_convention(), CpuConvention::Interval);
        assert_eq!(config.general.max_processes, 0);
        assert_eq!(config.sources.proc_root, PathBuf::from("/proc"));
        assert_eq!(config.sources.passwd, PathBuf::from("/etc/passwd"));
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_empty());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[general]
refresh_rate_ms = 500
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.refresh_rate_ms, 500);
        // Other fields should be defaults
        assert_eq!(config.general.cpu_convention, "interval");
        assert_eq!(config.sources.os_release, PathBuf::from("/etc/os-release"));
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
refresh_rate_ms = 2000
cpu_convention = "cumulative"
max_processes = 10

[sources]
proc_root = "/host/proc"
os_release = "/host/etc/os-release"
passwd = "/host/etc/passwd"

[logging]
level = "debug"
file = "/tmp/proctop.log"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.refresh_rate_ms, 2000);
        assert_eq!(config.general.cpu_convention(), CpuConvention::Cumulative);
        assert_eq!(config.general.max_processes, 10);
        let paths = config.sources.paths();
        assert_eq!(paths.proc_root, PathBuf::from("/host/proc"));
        assert_eq!(paths.passwd, PathBuf::from("/host/etc/passwd"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "/tmp/proctop.log");
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.general.refresh_rate_ms, 1000);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("proctop_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.general.refresh_rate_ms, 1000);
        let _ = std::fs::remove_file(&temp);
    }
}
