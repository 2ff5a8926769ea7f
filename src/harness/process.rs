//! Child processes with a wall-clock deadline.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Longest pause between two exit polls.
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Placeholder replaced by the source path in a [`BuildCommand`].
pub const SRC_PLACEHOLDER: &str = "{src}";

/// Placeholder replaced by the output binary path in a [`BuildCommand`].
pub const OUT_PLACEHOLDER: &str = "{out}";

/// Compiler invocation as an argument vector with `{src}` and `{out}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildCommand {
    args: Vec<String>,
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self::rustc()
    }
}

impl BuildCommand {
    /// Optimized `rustc` build for the host CPU.
    pub fn rustc() -> Self {
        Self::new([
            "rustc",
            "--edition=2021",
            "-C",
            "opt-level=3",
            "-C",
            "target-cpu=native",
            SRC_PLACEHOLDER,
            "-o",
            OUT_PLACEHOLDER,
        ])
    }

    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a command line on whitespace. Returns `None` if it is blank.
    pub fn parse(line: &str) -> Option<Self> {
        let cmd = Self::new(line.split_whitespace());
        if cmd.args.is_empty() {
            None
        } else {
            Some(cmd)
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments with placeholders substituted.
    pub fn render(&self, src: &Path, out: &Path) -> Vec<OsString> {
        let (src, out) = (src.to_string_lossy(), out.to_string_lossy());
        self.args
            .iter()
            .map(|arg| {
                arg.replace(SRC_PLACEHOLDER, &src)
                    .replace(OUT_PLACEHOLDER, &out)
                    .into()
            })
            .collect()
    }
}

impl core::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

/// Captured result of a finished child.
#[derive(Debug)]
pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `cmd` to completion, or kill it once `timeout` has elapsed.
///
/// Returns `Ok(None)` on timeout. Both output pipes are drained on their own
/// threads so a child that writes more than a pipe buffer cannot stall
/// against the poll loop. The deadline also covers collecting the output: a
/// background process that inherited the pipes and outlives the child counts
/// as a timeout.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> io::Result<Option<RunOutput>> {
    let deadline = Instant::now() + timeout;
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let Some(status) = wait_deadline(&mut child, deadline)? else {
        // Readers are left detached: a grandchild may still hold the pipes.
        child.kill()?;
        child.wait()?;
        return Ok(None);
    };

    let Some(stdout) = collect(&stdout, deadline) else {
        return Ok(None);
    };
    let Some(stderr) = collect(&stderr, deadline) else {
        return Ok(None);
    };
    Ok(Some(RunOutput {
        status,
        stdout,
        stderr,
    }))
}

fn wait_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    let mut interval = Duration::from_micros(100);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(interval.min(deadline - now));
        interval = (interval * 2).min(MAX_POLL_INTERVAL);
    }
}

/// Read `pipe` to its end on a new thread; the buffer arrives on the channel.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }
        None => {
            let _ = tx.send(Vec::new());
        }
    }
    rx
}

/// Output of a reader, or `None` if the pipe is still open at `deadline`.
fn collect(reader: &Receiver<Vec<u8>>, deadline: Instant) -> Option<String> {
    let wait = deadline.saturating_duration_since(Instant::now());
    match reader.recv_timeout(wait) {
        Ok(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

/// A path `Command::new` will not look up on `PATH`.
pub fn runnable(path: &Path) -> PathBuf {
    if path.is_relative() && path.parent().map_or(true, |p| p.as_os_str().is_empty()) {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_render() {
        let cmd = BuildCommand::parse("cc -O2 {src} -o {out}").unwrap();
        let args = cmd.render(Path::new("a.c"), Path::new("bin/a"));
        assert_eq!(args, ["cc", "-O2", "a.c", "-o", "bin/a"]);
        assert_eq!(cmd.to_string(), "cc -O2 {src} -o {out}");
    }

    #[test]
    fn test_build_command_embedded_placeholder() {
        let cmd = BuildCommand::new(["tool", "--out={out}"]);
        assert_eq!(
            cmd.render(Path::new("s"), Path::new("o")),
            [OsString::from("tool"), OsString::from("--out=o")]
        );
    }

    #[test]
    fn test_build_command_blank() {
        assert_eq!(BuildCommand::parse("   "), None);
    }

    #[test]
    fn test_default_is_rustc() {
        let cmd = BuildCommand::default();
        assert_eq!(cmd.args()[0], "rustc");
        assert!(cmd.args().iter().any(|a| a == SRC_PLACEHOLDER));
        assert!(cmd.args().iter().any(|a| a == OUT_PLACEHOLDER));
    }

    #[test]
    fn test_runnable() {
        assert_eq!(runnable(Path::new("sim")), PathBuf::from("./sim"));
        assert_eq!(runnable(Path::new("out/sim")), PathBuf::from("out/sim"));
        assert_eq!(runnable(Path::new("/tmp/sim")), PathBuf::from("/tmp/sim"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output() {
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]),
            Duration::from_secs(10),
        )
        .unwrap()
        .unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.status.code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_times_out() {
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "exec sleep 30"]),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(out.is_none());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_times_out_on_inherited_pipe() {
        // The shell exits at once, but `sleep` keeps stdout open.
        let start = Instant::now();
        let out = run_with_timeout(
            Command::new("sh").args(["-c", "sleep 5 & echo done"]),
            Duration::from_millis(300),
        )
        .unwrap();
        assert!(out.is_none());
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
