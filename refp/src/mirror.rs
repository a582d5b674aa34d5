//! Directory mirroring using external synchronization tool (robocopy by default).

use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use itertools::Itertools;

use crate::paths;

pub const ROBOCOPY: &str = "robocopy";
pub const DEFAULT_RETRIES: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const FALLBACK_RETRIES: u32 = 10;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%I-%M-%S-%p";

const OKCOPY: u8 = 0x01;
const XTRA: u8 = 0x02;
const MISMATCHES: u8 = 0x04;
const FAIL: u8 = 0x08;
const FATAL: u8 = 0x10;

/// Mirrors one directory into another
pub trait DirectoryMirror {
    fn mirror(&self, source: &Path, dest: &Path, options: &MirrorOptions) -> MirrorResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Retries on failed copies. Zero means default tool retries number (10)
    pub retries: u32,
    /// Directory to write mirroring log into
    pub log_dir: Option<PathBuf>,
    /// How long to wait the tool to finish
    pub timeout: Duration,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            log_dir: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Mirroring tool exit code meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Combination of `OKCOPY`, `XTRA`, `MISMATCHES` and `FAIL` bits (0 means no change)
    Flags(u8),
    Fatal,
    Unknown(i32),
}

impl Classification {
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match u8::try_from(code) {
            Ok(c) if c < FATAL => Self::Flags(c),
            Ok(FATAL) => Self::Fatal,
            _ => Self::Unknown(code),
        }
    }

    /// Any code below 8 means that everything copied or nothing to copy
    #[must_use]
    pub fn succeeded(self) -> bool {
        matches!(self, Self::Flags(c) if (c & FAIL) == 0)
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags(0) => write!(f, "No Change"),
            Self::Flags(c) => {
                let flags = [
                    (OKCOPY, "OKCOPY"),
                    (FAIL, "FAIL"),
                    (MISMATCHES, "MISMATCHES"),
                    (XTRA, "XTRA"),
                ]
                .into_iter()
                .filter(|(bit, _)| (c & bit) != 0)
                .map(|(_, name)| name)
                .join(" + ");
                write!(f, "{flags}")
            }
            Self::Fatal => write!(f, "Fatal Error"),
            Self::Unknown(c) => write!(f, "Unknown exit code {c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Tool finished with exit code
    Completed(Classification),
    /// Tool hasn't finished in time and was killed
    Orphaned,
    /// Tool cannot be started
    NotStarted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorResult {
    pub outcome: MirrorOutcome,
    /// Directory files were mirrored into
    pub destination: PathBuf,
}

impl MirrorResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, MirrorOutcome::Completed(c) if c.succeeded())
    }
}

/// Creates destination directory. Robocopy doesn't copy the last segment of source path
/// so if the last segments of source and destination differ, source's last segment appended
/// to the destination and created too.
///
/// Failures are only logged. Returns actual destination.
pub fn prepare_destination(source: &Path, dest: &Path) -> PathBuf {
    create_dir(dest);

    let source_full = paths::absolute(source);
    let Some(source_name) = source_full.file_name() else {
        return dest.to_path_buf();
    };
    let source_key = paths::normalize(&source.to_string_lossy());
    let dest_key = paths::normalize(&dest.to_string_lossy());
    if paths::file_name(&source_key) == paths::file_name(&dest_key) {
        return dest.to_path_buf();
    }

    let destination = dest.join(source_name);
    create_dir(&destination);
    destination
}

fn create_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("Failed to create directory {}: {e}", dir.display());
    }
}

/// Robocopy (or compatible) tool runner
#[derive(Debug, Clone)]
pub struct Robocopy {
    program: String,
    leading_args: Vec<String>,
}

impl Default for Robocopy {
    fn default() -> Self {
        Self::new()
    }
}

impl Robocopy {
    #[must_use]
    pub fn new() -> Self {
        Self::custom(ROBOCOPY, vec![])
    }

    /// Tool with other executable. `leading_args` passed before robocopy arguments
    #[must_use]
    pub fn custom(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    /// Robocopy arguments to mirror `source` into `dest`
    #[must_use]
    pub fn arguments(
        &self,
        source: &Path,
        dest: &Path,
        options: &MirrorOptions,
        now: DateTime<Local>,
    ) -> Vec<String> {
        let retries = if options.retries == 0 {
            FALLBACK_RETRIES
        } else {
            options.retries
        };
        let mut args = vec![
            source.to_string_lossy().into_owned(),
            dest.to_string_lossy().into_owned(),
            "/MIR".to_owned(),
            "/W:5".to_owned(),
            format!("/R:{retries}"),
            "/MT:4".to_owned(),
            "/FFT".to_owned(),
            "/IPG:0".to_owned(),
        ];

        if let Some(log_dir) = &options.log_dir {
            let log = log_dir.join(log_file_name(dest, now));
            args.push(format!("/LOG:{}", log.to_string_lossy()));
            args.extend(["/TS", "/NP", "/TEE"].map(ToOwned::to_owned));
        }
        args
    }
}

impl DirectoryMirror for Robocopy {
    fn mirror(&self, source: &Path, dest: &Path, options: &MirrorOptions) -> MirrorResult {
        let destination = prepare_destination(source, dest);
        let args = self.arguments(source, &destination, options, Local::now());
        tracing::debug!("Running: {} {}", self.program, args.iter().join(" "));

        let spawned = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("Failed to start {}: {e}", self.program);
                return MirrorResult {
                    outcome: MirrorOutcome::NotStarted(e.to_string()),
                    destination,
                };
            }
        };

        let outcome = match wait_timeout(&mut child, options.timeout) {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(-1);
                MirrorOutcome::Completed(Classification::from_code(code))
            }
            Ok(None) => {
                tracing::error!(
                    "{} process has failed to exit, source: {} dest: {}",
                    self.program,
                    source.display(),
                    destination.display()
                );
                kill(&mut child);
                MirrorOutcome::Orphaned
            }
            Err(e) => {
                tracing::error!("Failed to wait {}: {e}", self.program);
                kill(&mut child);
                MirrorOutcome::Orphaned
            }
        };
        MirrorResult {
            outcome,
            destination,
        }
    }
}

/// Log file name: destination with separators replaced by underscore plus timestamp
fn log_file_name(dest: &Path, now: DateTime<Local>) -> String {
    let prefix = dest.to_string_lossy().replace(['\\', '/', ':'], "_");
    format!("{prefix}-text-{}.log", now.format(LOG_TIMESTAMP_FORMAT))
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
    }
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to kill process {}: {e}", child.id());
    }
    // reap
    if let Err(e) = child.wait() {
        tracing::warn!("Failed to wait process {}: {e}", child.id());
    }
}
