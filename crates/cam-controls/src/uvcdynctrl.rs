use crate::{classify_line, Config, ControlTool, ControlValue, Error, Line, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Where the utility lives on a stock install.
pub const DEFAULT_UTILITY: &str = "/usr/bin/uvcdynctrl";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Backend that shells out to `uvcdynctrl`.
#[derive(Debug, Clone)]
pub struct UvcDynCtrl {
    utility: PathBuf,
    timeout: Duration,
}

struct Output {
    stdout: String,
    stderr: String,
    status: std::process::ExitStatus,
}

impl UvcDynCtrl {
    /// Probe the utility and build a backend for it.
    ///
    /// Fails with [`Error::MissingUtility`] when the path is not an executable file; nothing is
    /// run in that case.
    pub fn open(utility: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let utility = utility.into();
        if !is_executable(&utility) {
            return Err(Error::MissingUtility(utility));
        }
        Ok(Self { utility, timeout })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.utility, config.timeout())
    }

    pub fn utility(&self) -> &Path {
        &self.utility
    }

    fn run(&self, args: &[String], shown: &str) -> Result<Output> {
        debug!(command = shown, "running");
        let mut child = Command::new(&self.utility)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Spawn {
                program: self.utility.display().to_string(),
                reason: e.to_string(),
            })?;

        // Drain both pipes off-thread so a chatty child cannot stall on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = wait_with_timeout(&mut child, self.timeout);
        if !matches!(waited, Ok(Some(_))) {
            // Timed out or lost track of the child: kill and reap it so the pipes close.
            let _ = child.kill();
            let _ = child.wait();
        }
        let stdout = join_drain(stdout);
        let stderr = join_drain(stderr);

        match waited? {
            Some(status) => Ok(Output {
                stdout: stdout?,
                stderr: stderr?,
                status,
            }),
            None => Err(Error::Timeout {
                command: shown.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

impl ControlTool for UvcDynCtrl {
    fn describe_set(&self, name: &str, value: &ControlValue) -> String {
        render_command(&self.utility, name, value)
    }

    fn list_controls(&mut self) -> Result<String> {
        let args = ["-c".to_string(), "-v".to_string()];
        let shown = format!("{} -c -v", self.utility.display());
        let out = self.run(&args, &shown)?;
        if !out.status.success() {
            let has_header = out
                .stdout
                .lines()
                .any(|l| matches!(classify_line(l), Line::DeviceHeader(_)));
            if !has_header {
                error!(command = %shown, status = ?out.status.code(), "listing failed");
                return Err(Error::CommandFailed {
                    command: shown,
                    status: out.status.code(),
                    stderr: out.stderr.trim().to_string(),
                });
            }
            // uvcdynctrl exits non-zero on partial errors; what it did list is still usable.
            warn!(
                status = ?out.status.code(),
                stderr = %out.stderr.trim(),
                "listing exited non-zero"
            );
        } else if !out.stderr.trim().is_empty() {
            debug!(stderr = %out.stderr.trim(), "listing stderr");
        }
        Ok(out.stdout)
    }

    fn set_control(&mut self, name: &str, value: &ControlValue) -> Result<()> {
        let args = [
            "-s".to_string(),
            name.to_string(),
            "--".to_string(),
            value.to_string(),
        ];
        let shown = self.describe_set(name, value);
        let out = self.run(&args, &shown)?;
        if !out.status.success() {
            error!(command = %shown, status = ?out.status.code(), "set command failed");
            return Err(Error::CommandFailed {
                command: shown,
                status: out.status.code(),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Render a set command the way a shell would need it, with the control name quoted.
pub fn render_command(utility: &Path, name: &str, value: &ControlValue) -> String {
    format!(
        "{} -s {} -- {}",
        utility.display(),
        shell_quote(name),
        value
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

type Drain = Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Drain {
    pipe.map(|mut p| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            p.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

/// Collect a drained pipe. Control names are not guaranteed to be UTF-8, so invalid bytes
/// become U+FFFD instead of failing the whole listing.
fn join_drain(handle: Drain) -> Result<String> {
    match handle {
        None => Ok(String::new()),
        Some(h) => {
            let bytes = h
                .join()
                .map_err(|_| Error::Io("output reader panicked".into()))?
                .map_err(|e| Error::Io(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() >= deadline => return Ok(None),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(Error::Io(e.to_string())),
        }
    }
}
