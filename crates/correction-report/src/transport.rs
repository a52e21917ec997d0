//! Transports that carry a [`CheckRequest`] to a correction service.
//!
//! A transport is blocking: [`ReportClient`](crate::ReportClient) runs it on a worker thread.
//! Implementations must poll the [`CancelToken`] and give up once it is cancelled or the
//! timeout elapses.

use crate::request::CheckRequest;
use correction_core::CancelToken;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O failure talking to the service.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// The request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The checker process exited unsuccessfully.
    #[error("checker exited with {code:?}: {stderr}")]
    Status {
        /// Exit code, if any.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// The request did not finish in time.
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),
    /// The worker went away before answering.
    #[error("report worker disconnected")]
    Disconnected,
}

/// Carries one request to the service and returns the raw response body.
pub trait CorrectionTransport: Send + Sync {
    /// Submit `request`, blocking until a body arrives, `cancel` fires, or `timeout` elapses.
    fn submit(
        &self,
        request: &CheckRequest,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<String, TransportError>;
}

impl<F> CorrectionTransport for F
where
    F: Fn(&CheckRequest, &CancelToken, Duration) -> Result<String, TransportError> + Send + Sync,
{
    fn submit(
        &self,
        request: &CheckRequest,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        self(request, cancel, timeout)
    }
}

/// Runs a checker command: request JSON on stdin, response body on stdout.
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    program: String,
    args: Vec<String>,
}

impl ProcessTransport {
    /// Use `program` as the checker.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl CorrectionTransport for ProcessTransport {
    fn submit(
        &self,
        request: &CheckRequest,
        cancel: &CancelToken,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let body = request.to_json()?;
        let mut child = ProcessCommand::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("Failed to open checker stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("Failed to open checker stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("Failed to open checker stderr"))?;

        let writer = thread::spawn(move || -> io::Result<()> {
            stdin.write_all(body.as_bytes())?;
            stdin.flush()
        });
        let out_reader = thread::spawn(move || read_all(stdout));
        let err_reader = thread::spawn(move || read_all(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!(program = %self.program, "checker killed on cancel");
                return Err(TransportError::Cancelled);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(program = %self.program, ?timeout, "checker timed out");
                return Err(TransportError::TimedOut(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        if let Ok(Err(err)) = writer.join() {
            // A checker that exits without reading its input closes the pipe early.
            tracing::debug!(%err, "checker stdin closed early");
        }
        let stdout = join_output(out_reader)?;
        let stderr = join_output(err_reader).unwrap_or_default();

        if !status.success() {
            return Err(TransportError::Status {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

fn read_all<R: Read>(mut reader: R) -> io::Result<String> {
    let mut out = String::new();
    reader.read_to_string(&mut out)?;
    Ok(out)
}

fn join_output(handle: thread::JoinHandle<io::Result<String>>) -> Result<String, TransportError> {
    handle
        .join()
        .map_err(|_| TransportError::Disconnected)?
        .map_err(TransportError::from)
}

/// Returns a canned response body read from a file.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
}

impl FileTransport {
    /// Serve the contents of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorrectionTransport for FileTransport {
    fn submit(
        &self,
        _request: &CheckRequest,
        cancel: &CancelToken,
        _timeout: Duration,
    ) -> Result<String, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        Ok(std::fs::read_to_string(&self.path)?)
    }
}
