//! Threaded report client.
//!
//! Each submission runs its transport on a dedicated worker thread; results come back over an
//! `mpsc` channel that the host polls from its event loop with
//! [`ReportClient::try_recv`]. No async runtime is required.

use crate::report::{CheckResponse, ReportParseError, parse_response};
use crate::request::CheckRequest;
use crate::stream::{is_event_stream, parse_stream};
use crate::transport::{CorrectionTransport, TransportError};
use correction_core::{
    CheckSubmission, CheckerConfig, CheckerSession, OffsetEncoding, ReportOutcome, ReportTicket,
};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Why a check produced no report.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The response body was unusable.
    #[error(transparent)]
    Parse(#[from] ReportParseError),
}

/// Result of one submission, delivered over the client's channel.
#[derive(Debug)]
pub enum ReportInbound {
    /// A report arrived and parsed.
    Completed {
        /// Ticket of the submission.
        ticket: ReportTicket,
        /// Parsed report, offsets in characters of the submitted text.
        response: CheckResponse,
    },
    /// The submission failed.
    Failed {
        /// Ticket of the submission.
        ticket: ReportTicket,
        /// Failure reason.
        error: ClientError,
    },
}

impl ReportInbound {
    /// Ticket this result belongs to.
    pub fn ticket(&self) -> &ReportTicket {
        match self {
            Self::Completed { ticket, .. } | Self::Failed { ticket, .. } => ticket,
        }
    }

    /// Hand the result to `session`.
    ///
    /// Returns the report outcome for completed requests, `None` for failures.
    pub fn deliver(self, session: &mut CheckerSession) -> Option<ReportOutcome> {
        match self {
            Self::Completed { ticket, response } => {
                Some(session.receive_report(&ticket, &response.errors))
            }
            Self::Failed { ticket, error } => {
                session.fail_report(&ticket, &error.to_string());
                None
            }
        }
    }
}

/// Runs check submissions in the background.
pub struct ReportClient {
    transport: Arc<dyn CorrectionTransport>,
    tx: mpsc::Sender<ReportInbound>,
    rx: mpsc::Receiver<ReportInbound>,
    encoding: OffsetEncoding,
    timeout: Duration,
    template: CheckRequest,
}

impl ReportClient {
    /// Create a client over `transport`, taking encoding and timeout from `config`.
    pub fn new(transport: impl CorrectionTransport + 'static, config: &CheckerConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            transport: Arc::new(transport),
            tx,
            rx,
            encoding: config.offset_encoding,
            timeout: config.request_timeout(),
            template: CheckRequest::default(),
        }
    }

    /// Fields (project, tag, language) copied into every request; `text` is ignored.
    pub fn with_request_template(mut self, template: CheckRequest) -> Self {
        self.template = template;
        self
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start fetching a report for `submission` on a worker thread.
    pub fn submit(&self, submission: CheckSubmission) {
        let CheckSubmission { ticket, text } = submission;
        let request = CheckRequest {
            text,
            ..self.template.clone()
        };
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let encoding = self.encoding;
        let timeout = self.timeout;

        thread::spawn(move || {
            let result = fetch(transport.as_ref(), &request, &ticket, encoding, timeout);
            let inbound = match result {
                Ok(response) => {
                    tracing::debug!(
                        generation = ticket.generation(),
                        errors = response.errors.len(),
                        "report received"
                    );
                    ReportInbound::Completed { ticket, response }
                }
                Err(error) => {
                    if matches!(error, ClientError::Transport(TransportError::TimedOut(_))) {
                        ticket.token().cancel();
                    }
                    tracing::warn!(generation = ticket.generation(), %error, "check request failed");
                    ReportInbound::Failed { ticket, error }
                }
            };
            let _ = tx.send(inbound);
        });
    }

    /// Poll for a finished submission without blocking.
    pub fn try_recv(&self) -> Option<ReportInbound> {
        self.rx.try_recv().ok()
    }

    /// Block until a submission finishes or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ReportInbound, TransportError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            mpsc::RecvTimeoutError::Timeout => TransportError::TimedOut(timeout),
            mpsc::RecvTimeoutError::Disconnected => TransportError::Disconnected,
        })
    }
}

impl std::fmt::Debug for ReportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportClient")
            .field("encoding", &self.encoding)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn fetch(
    transport: &dyn CorrectionTransport,
    request: &CheckRequest,
    ticket: &ReportTicket,
    encoding: OffsetEncoding,
    timeout: Duration,
) -> Result<CheckResponse, ClientError> {
    let body = transport.submit(request, ticket.token(), timeout)?;
    if ticket.is_cancelled() {
        return Err(TransportError::Cancelled.into());
    }
    if is_event_stream(&body) {
        return Ok(parse_stream(&body, &request.text, encoding));
    }
    Ok(parse_response(&body, &request.text, encoding)?)
}
