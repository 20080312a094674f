use std::path::PathBuf;

use serde::Deserialize;

/// Daemon mode configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Directory holding the log and PID files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name inside `log_dir`
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// PID file name inside `log_dir`
    #[serde(default = "default_pid_file")]
    pub pid_file: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            pid_file: default_pid_file(),
        }
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file() -> String {
    "image_service.log".to_string()
}

fn default_pid_file() -> String {
    "image_service.pid".to_string()
}
