use crate::collectors::{Target, TextSource};
use crate::error::CaptureError;
use log::{debug, warn};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captures text by running the target's command as a subprocess
///
/// Output pipes are drained on helper threads while the child is polled, so a
/// chatty tool cannot block on a full pipe before the deadline expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a program and return its standard output
    ///
    /// Anything written to stderr is logged at debug level and dropped.
    ///
    /// # Arguments
    ///
    /// * `program` - Executable name or path
    /// * `args` - Arguments passed verbatim
    /// * `timeout` - Deadline after which the child is killed
    ///
    /// # Errors
    ///
    /// * `CaptureError::NotFound` - the executable does not exist
    /// * `CaptureError::Spawn` - the process could not be started otherwise
    /// * `CaptureError::Timeout` - the deadline passed before the process exited
    /// * `CaptureError::NonZeroExit` - the process failed; carries its output
    pub fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<String, CaptureError> {
        self.execute(program, args, timeout, false)
    }

    /// Run a program and return its standard output followed by its stderr
    ///
    /// Used for tools that report diagnostics such as a missing privilege on
    /// stderr while the parser still needs to see them.
    pub fn run_combined(&self, program: &str, args: &[String], timeout: Duration) -> Result<String, CaptureError> {
        self.execute(program, args, timeout, true)
    }

    fn execute(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
        combined: bool,
    ) -> Result<String, CaptureError> {
        debug!("Running {} {:?} (timeout {:?})", program, args, timeout);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => CaptureError::NotFound(program.to_string()),
                _ => CaptureError::Spawn(format!("{}: {}", program, e)),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_with_deadline(&mut child, timeout)? {
            Some(status) => status,
            None => {
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {} after timeout: {}", program, e);
                }
                let _ = child.wait();
                return Err(CaptureError::Timeout(timeout));
            }
        };

        let out = join(stdout)?;
        let err = join(stderr)?;
        if !status.success() {
            let mut output = out;
            output.push_str(&err);
            return Err(CaptureError::NonZeroExit {
                status: status.to_string(),
                output: output.trim().to_string(),
            });
        }
        if combined {
            let mut output = out;
            output.push_str(&err);
            return Ok(output);
        }
        if !err.trim().is_empty() {
            debug!("{} wrote to stderr: {}", program, err.trim());
        }
        Ok(out)
    }
}

impl TextSource for SystemRunner {
    fn capture(&self, target: &Target) -> Result<String, CaptureError> {
        if target.combined_output {
            self.run_combined(&target.program, &target.args, target.timeout)
        } else {
            self.run(&target.program, &target.args, target.timeout)
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<String>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(String::from_utf8_lossy(&buf).into_owned())
        })
    })
}

fn join(handle: Option<JoinHandle<io::Result<String>>>) -> Result<String, CaptureError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| CaptureError::Spawn("output reader thread panicked".to_string()))?
            .map_err(CaptureError::from),
        None => Ok(String::new()),
    }
}

/// Poll the child until it exits or the deadline passes (`None`)
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>, CaptureError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
