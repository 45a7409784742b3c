use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use wait_timeout::ChildExt;

/// What came back from one solver run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Completed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
    TimedOut,
}

/// Something that decides a CNF file. The harness only ever looks at the
/// text it returns, so tests can substitute a fake.
pub trait Oracle {
    fn invoke(&self, input: &Path, timeout: Duration) -> io::Result<Invocation>;
}

/// An external solver binary run as `solver <input.cnf>`.
#[derive(Clone, Debug)]
pub struct ProcessSolver {
    path: PathBuf,
}

impl ProcessSolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forwards everything read from `pipe` to `tx` chunk by chunk, so output
/// already produced survives a reader that never sees EOF.
fn drain(mut pipe: impl Read + Send + 'static, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Time allowed for the pipes to drain after a solver exits right at its
/// deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Collects output until both readers hit EOF or `deadline` passes. A
/// background child of the solver can hold the pipes open indefinitely.
fn collect(rx: Receiver<(Stream, Vec<u8>)>, deadline: Instant) -> (String, String) {
    let mut stdout = vec![];
    let mut stderr = vec![];
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok((Stream::Stdout, chunk)) => stdout.extend(chunk),
            Ok((Stream::Stderr, chunk)) => stderr.extend(chunk),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("solver output still open at the deadline; keeping what was read");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    )
}

/// Spawns `command`, retrying briefly while the binary is still open for
/// writing elsewhere (a solver written moments ago).
fn spawn(command: &mut Command) -> io::Result<Child> {
    let mut attempts = 0;
    loop {
        match command.spawn() {
            Err(e) if e.kind() == io::ErrorKind::ExecutableFileBusy && attempts < 5 => {
                attempts += 1;
                thread::sleep(Duration::from_millis(20 * attempts));
            }
            result => return result,
        }
    }
}

impl Oracle for ProcessSolver {
    fn invoke(&self, input: &Path, timeout: Duration) -> io::Result<Invocation> {
        let mut command = Command::new(&self.path);
        command
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::debug!("Running command: {:?}", command);

        let start = Instant::now();
        let mut child = spawn(&mut command)?;

        // read both pipes concurrently so a chatty solver cannot block on a full pipe
        let (tx, rx) = mpsc::channel();
        if let Some(pipe) = child.stdout.take() {
            drain(pipe, Stream::Stdout, tx.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            drain(pipe, Stream::Stderr, tx);
        }

        match child.wait_timeout(timeout)? {
            Some(status) => {
                log::debug!(
                    "{} exited with {} after {:?}",
                    self.path.display(),
                    status,
                    start.elapsed()
                );
                let deadline = (start + timeout).max(Instant::now() + DRAIN_GRACE);
                let (stdout, stderr) = collect(rx, deadline);
                Ok(Invocation::Completed {
                    stdout,
                    stderr,
                    exit_code: status.code(),
                })
            }
            None => {
                log::warn!(
                    "{} exceeded {:?} on {}; killing it",
                    self.path.display(),
                    timeout,
                    input.display()
                );
                let _ = child.kill();
                let _ = child.wait();
                // readers are left detached; a grandchild may still hold the pipes
                drop(rx);
                Ok(Invocation::TimedOut)
            }
        }
    }
}
