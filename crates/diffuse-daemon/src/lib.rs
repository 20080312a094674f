//! Detach the image service from its terminal
//!
//! A classic double fork: the first child becomes a session leader, the
//! second child can never reacquire a controlling terminal. Everything runs
//! before any runtime or thread exists, since `fork` only carries the calling
//! thread into the child.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use diffuse_config::DaemonConfig;

/// Absolute locations of the daemon's log and PID files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonPaths {
    pub log_file: PathBuf,
    pub pid_file: PathBuf,
}

impl DaemonPaths {
    /// Resolve the configured files against the current directory and create
    /// the log directory
    ///
    /// Must run before [`daemonize`], which changes directory to `/`.
    pub fn resolve(config: &DaemonConfig) -> anyhow::Result<Self> {
        let log_dir = std::path::absolute(&config.log_dir)
            .with_context(|| format!("failed to resolve log directory {}", config.log_dir.display()))?;

        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        Ok(Self {
            log_file: log_dir.join(&config.log_file),
            pid_file: log_dir.join(&config.pid_file),
        })
    }
}

/// Removes the PID file when dropped
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write the current process id to `path`
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        std::fs::write(path, std::process::id().to_string())
            .with_context(|| format!("failed to write PID file {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove PID file");
        }
    }
}

/// Detach from the terminal and continue as a daemon
///
/// The calling process and the intermediate child exit; only the grandchild
/// returns. On return the working directory is `/`, stdin reads from
/// `/dev/null`, stdout and stderr append to the log file and the PID file
/// holds the daemon's pid.
#[cfg(unix)]
#[allow(unsafe_code)]
pub fn daemonize(paths: &DaemonPaths) -> anyhow::Result<PidFile> {
    use std::os::fd::AsRawFd as _;

    // Opened up front so failures still reach the terminal
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)
        .with_context(|| format!("failed to open log file {}", paths.log_file.display()))?;
    let dev_null = OpenOptions::new()
        .read(true)
        .open("/dev/null")
        .context("failed to open /dev/null")?;

    fork_and_exit_parent().context("fork #1 failed")?;

    std::env::set_current_dir("/").context("failed to change directory to /")?;

    // SAFETY: setsid and umask have no memory-safety preconditions
    if unsafe { libc::setsid() } == -1 {
        return Err(std::io::Error::last_os_error()).context("setsid failed");
    }
    unsafe { libc::umask(0) };

    fork_and_exit_parent().context("fork #2 failed")?;

    redirect(dev_null.as_raw_fd(), libc::STDIN_FILENO).context("failed to redirect stdin")?;
    redirect(log.as_raw_fd(), libc::STDOUT_FILENO).context("failed to redirect stdout")?;
    redirect(log.as_raw_fd(), libc::STDERR_FILENO).context("failed to redirect stderr")?;

    PidFile::create(&paths.pid_file)
}

/// Daemon mode is POSIX-only
#[cfg(not(unix))]
pub fn daemonize(_paths: &DaemonPaths) -> anyhow::Result<PidFile> {
    anyhow::bail!("daemon mode is only supported on Unix; run the image service under a service manager instead")
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn fork_and_exit_parent() -> std::io::Result<()> {
    // SAFETY: called before any other thread is spawned, so the child
    // inherits a consistent address space
    match unsafe { libc::fork() } {
        -1 => Err(std::io::Error::last_os_error()),
        0 => Ok(()),
        _ => std::process::exit(0),
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn redirect(from: std::os::fd::RawFd, to: std::os::fd::RawFd) -> std::io::Result<()> {
    // SAFETY: both descriptors are open for the duration of the call
    if unsafe { libc::dup2(from, to) } == -1 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
