//! Checker session: the document, the active error set and the focus, driven by host events.
//!
//! [`CheckerSession`] is the single owner of all correction state for one text box. The host
//! forwards user edits, clicks and popover actions to it, submits checks with
//! [`begin_check`](CheckerSession::begin_check), and feeds reports back with
//! [`receive_report`](CheckerSession::receive_report).
//!
//! # Request lifecycle
//!
//! Each submission gets a [`ReportTicket`] carrying a generation number and a cooperative
//! [`CancelToken`]. Starting a new check, clearing, or emptying the document cancels the
//! in-flight ticket. A report is only applied if its ticket is the current one and has not been
//! cancelled, so a slow response can never overwrite fresher state.
//!
//! # Notifications
//!
//! The session keeps a version number and notifies subscribers with a [`SessionEvent`] after
//! each observable change.
//!
//! ```rust
//! use correction_core::{CheckerConfig, CheckerSession, ErrorKind, SessionEventKind, TextError};
//! use std::sync::{Arc, Mutex};
//!
//! let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
//! let resolved = Arc::new(Mutex::new(0));
//! let counter = Arc::clone(&resolved);
//! session.subscribe(move |event| {
//!     if event.kind == SessionEventKind::AllResolved {
//!         *counter.lock().unwrap() += 1;
//!     }
//! });
//!
//! let submission = session.begin_check().unwrap();
//! let report = vec![
//!     TextError::new("pra", 8, 11, ErrorKind::Spelling, "ai").with_suggestions(["para"]),
//! ];
//! session.receive_report(&submission.ticket, &report);
//!
//! session.click(correction_core::AnchorId(1), 9);
//! session.commit_frame();
//! session.choose_suggestion(0).unwrap();
//!
//! assert_eq!(session.document().text(), "Ele foi para escola");
//! assert_eq!(*resolved.lock().unwrap(), 1);
//! ```

use crate::annotations::{ErrorMark, TextRange};
use crate::applier::{AcceptAllOutcome, AcceptOutcome, AnnotationApplier};
use crate::config::{AcceptMode, CheckerConfig};
use crate::coordinator::{ActiveErrorFocus, AnchorId, FocusEvent, FocusPhase, InteractionCoordinator};
use crate::delta::TextDelta;
use crate::document::{Document, DocumentSnapshot};
use crate::error::{AnnotationError, CheckError};
use crate::error_set::NormalizedErrorSet;
use crate::normalize::Normalizer;
use crate::text_error::{ErrorKind, TextError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag shared between the session and a report fetch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identifies one check submission.
#[derive(Debug, Clone)]
pub struct ReportTicket {
    generation: u64,
    token: CancelToken,
}

impl ReportTicket {
    /// Monotonic submission number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancellation token for the fetch.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Whether the submission was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A check ready to be sent to the correction service.
#[derive(Debug, Clone)]
pub struct CheckSubmission {
    /// Ticket to hand back with the report.
    pub ticket: ReportTicket,
    /// Text to check.
    pub text: String,
}

/// What happened to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The report replaced the active error set; `errors` marks were applied.
    Applied {
        /// Number of errors marked.
        errors: usize,
    },
    /// A newer submission exists; the report was discarded.
    Stale,
    /// The submission was cancelled; the report was discarded.
    Cancelled,
}

/// Session change type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// Text changed.
    DocumentEdited,
    /// A report replaced the error set.
    ReportApplied,
    /// A report (or a failed request) was discarded.
    ReportDiscarded,
    /// The in-flight request was cancelled.
    RequestCancelled,
    /// Error or correction marks changed without a new report.
    AnnotationsChanged,
    /// The focused error changed.
    FocusChanged,
    /// No error marks remain after the user resolved them.
    AllResolved,
    /// The session was cleared.
    Cleared,
}

/// Session change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    /// Change type.
    pub kind: SessionEventKind,
    /// Version before the change.
    pub old_version: u64,
    /// Version after the change.
    pub new_version: u64,
}

/// Session change callback function type.
pub type SessionCallback = Box<dyn FnMut(&SessionEvent) + Send>;

/// Snapshot of session state for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Session version.
    pub version: u64,
    /// Document version.
    pub document_version: u64,
    /// Document length in characters.
    pub char_count: usize,
    /// Pending spelling errors.
    pub spelling_count: usize,
    /// Pending grammar errors.
    pub grammar_count: usize,
    /// Review-mode corrections awaiting commit.
    pub corrected_count: usize,
    /// Shown focus, if any.
    pub focus: Option<ActiveErrorFocus>,
    /// Generation of the in-flight check, if any.
    pub in_flight: Option<u64>,
}

type FocusKey = (FocusPhase, Option<AnchorId>, Option<TextRange>);

/// Owner of the document, the normalized error set and the focus for one text box.
pub struct CheckerSession {
    config: CheckerConfig,
    document: Document,
    errors: NormalizedErrorSet,
    normalizer: Normalizer,
    applier: AnnotationApplier,
    coordinator: InteractionCoordinator,
    generation: u64,
    in_flight: Option<ReportTicket>,
    resolved_signalled: bool,
    state_version: u64,
    callbacks: Vec<SessionCallback>,
}

impl CheckerSession {
    /// Create a session over `text`.
    pub fn new(text: &str, config: CheckerConfig) -> Self {
        Self {
            normalizer: Normalizer::from_config(&config),
            applier: AnnotationApplier::new(config.accept_mode),
            config,
            document: Document::new(text),
            errors: NormalizedErrorSet::default(),
            coordinator: InteractionCoordinator::new(),
            generation: 0,
            in_flight: None,
            resolved_signalled: true,
            state_version: 0,
            callbacks: Vec::new(),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// The live document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Immutable view for rendering.
    pub fn snapshot(&self) -> Arc<DocumentSnapshot> {
        self.document.snapshot()
    }

    /// Active normalized errors.
    pub fn errors(&self) -> &NormalizedErrorSet {
        &self.errors
    }

    /// Shown focus, if any.
    pub fn focus(&self) -> Option<&ActiveErrorFocus> {
        self.coordinator.active()
    }

    /// Focus waiting for the next frame, if any.
    pub fn pending_focus(&self) -> Option<&ActiveErrorFocus> {
        self.coordinator.pending()
    }

    /// Session version.
    pub fn version(&self) -> u64 {
        self.state_version
    }

    /// Check if state has changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.state_version > version
    }

    /// Subscribe to session change notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Current state snapshot.
    pub fn get_state(&self) -> SessionState {
        SessionState {
            version: self.state_version,
            document_version: self.document.version(),
            char_count: self.document.char_count(),
            spelling_count: self.errors.count(ErrorKind::Spelling),
            grammar_count: self.errors.count(ErrorKind::Grammar),
            corrected_count: self.errors.len() - self.errors.pending_count(),
            focus: self.coordinator.active().cloned(),
            in_flight: self.in_flight.as_ref().map(ReportTicket::generation),
        }
    }

    // ---- text ----

    /// Replace `range` with `text` (a user edit).
    pub fn edit(&mut self, range: TextRange, text: &str) -> Result<TextDelta, AnnotationError> {
        let focus_before = self.focus_key();
        let delta = self.document.replace(range, text).inspect_err(|err| {
            tracing::warn!(%err, "rejected edit");
        })?;
        if delta.is_empty() {
            return Ok(delta);
        }

        self.track_delta(&delta);
        if self.document.is_empty() {
            self.cancel_in_flight();
        }
        self.notify(SessionEventKind::DocumentEdited);
        self.notify_focus_if_changed(focus_before);
        Ok(delta)
    }

    /// Replace the whole text. All marks, errors and focus are dropped.
    pub fn set_text(&mut self, text: &str) -> TextDelta {
        let focus_before = self.focus_key();
        self.coordinator.close();
        let delta = self.document.set_text(text);
        self.errors.clear();
        if self.document.is_empty() {
            self.cancel_in_flight();
        }
        self.notify(SessionEventKind::DocumentEdited);
        self.notify_focus_if_changed(focus_before);
        delta
    }

    // ---- report lifecycle ----

    /// Start a check of the current text, cancelling any in-flight one.
    pub fn begin_check(&mut self) -> Result<CheckSubmission, CheckError> {
        let text = self.document.text();
        if text.trim().is_empty() {
            return Err(CheckError::EmptyDocument);
        }
        let char_count = self.document.char_count();
        if char_count > self.config.max_chars {
            return Err(CheckError::TooLong {
                char_count,
                max_chars: self.config.max_chars,
            });
        }

        self.cancel_in_flight();
        self.generation += 1;
        let ticket = ReportTicket {
            generation: self.generation,
            token: CancelToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        tracing::info!(generation = self.generation, char_count, "submitting check");

        Ok(CheckSubmission { ticket, text })
    }

    /// Cancel the in-flight check, if any. Returns `true` if one was cancelled.
    pub fn cancel_in_flight(&mut self) -> bool {
        let Some(ticket) = self.in_flight.take() else {
            return false;
        };
        ticket.token.cancel();
        tracing::info!(generation = ticket.generation, "cancelled check");
        self.notify(SessionEventKind::RequestCancelled);
        true
    }

    /// Apply a report for `ticket`.
    ///
    /// The report is normalized against the *current* text and fully replaces the pending
    /// error marks. Review-mode corrections awaiting commit are kept, and new errors are
    /// relocated away from them.
    pub fn receive_report(&mut self, ticket: &ReportTicket, raw: &[TextError]) -> ReportOutcome {
        if ticket.is_cancelled() {
            tracing::info!(generation = ticket.generation, "discarding cancelled report");
            self.notify(SessionEventKind::ReportDiscarded);
            return ReportOutcome::Cancelled;
        }
        if !self.is_current(ticket) {
            tracing::info!(generation = ticket.generation, "discarding stale report");
            self.notify(SessionEventKind::ReportDiscarded);
            return ReportOutcome::Stale;
        }
        self.in_flight = None;

        let focus_before = self.focus_key();
        let mut active: Vec<TextError> = self.errors.iter().filter(|e| e.corrected).cloned().collect();
        let corrected_ranges: Vec<TextRange> = active.iter().map(TextError::range).collect();
        let text = self.document.text();
        let normalized = self
            .normalizer
            .normalize_with_claimed(raw, &text, &corrected_ranges);

        self.document.remove_annotations(|a| a.kind.is_pending_error());

        let mut applied = 0;
        for error in normalized {
            match self.applier.apply(&mut self.document, &error) {
                Ok(_) => {
                    applied += 1;
                    active.push(error);
                }
                Err(err) => tracing::warn!(%err, word = %error.word, "failed to mark error"),
            }
        }

        self.errors = NormalizedErrorSet::new(active);
        self.coordinator.retain_if_present(&self.document);
        self.resolved_signalled = !self.document.has_pending_errors();

        tracing::info!(
            generation = ticket.generation,
            reported = raw.len(),
            applied,
            "applied report"
        );
        self.notify(SessionEventKind::ReportApplied);
        self.notify_focus_if_changed(focus_before);
        ReportOutcome::Applied { errors: applied }
    }

    /// Record a failed fetch for `ticket`. Returns `true` if it was the in-flight check.
    pub fn fail_report(&mut self, ticket: &ReportTicket, reason: &str) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        tracing::warn!(generation = ticket.generation, reason, "check failed");
        self.notify(SessionEventKind::ReportDiscarded);
        true
    }

    fn is_current(&self, ticket: &ReportTicket) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|t| t.generation == ticket.generation)
    }

    // ---- focus ----

    /// A click at `offset` on host element `anchor`. Returns `true` if an error mark was hit.
    pub fn click(&mut self, anchor: AnchorId, offset: usize) -> bool {
        let focus_before = self.focus_key();
        let hit = self.coordinator.focus(anchor, &self.document, offset);
        self.notify_focus_if_changed(focus_before);
        hit
    }

    /// Host frame boundary: show the pending focus, if any.
    pub fn commit_frame(&mut self) -> Option<&ActiveErrorFocus> {
        if self.coordinator.pending().is_none() {
            return None;
        }
        self.coordinator.commit_frame();
        self.notify(SessionEventKind::FocusChanged);
        self.coordinator.active()
    }

    /// Close the popover without changing anything.
    pub fn close_focus(&mut self) -> bool {
        let closed = self.coordinator.close();
        if closed {
            self.notify(SessionEventKind::FocusChanged);
        }
        closed
    }

    /// Take queued popover events.
    pub fn drain_focus_events(&mut self) -> Vec<FocusEvent> {
        self.coordinator.drain_events()
    }

    // ---- resolution ----

    /// Accept suggestion `index` of the focused error.
    pub fn choose_suggestion(&mut self, index: usize) -> Result<AcceptOutcome, AnnotationError> {
        let focus = self
            .coordinator
            .active()
            .ok_or(AnnotationError::NoActiveFocus)?;
        let suggestion = focus.suggestions.get(index).cloned().ok_or(
            AnnotationError::SuggestionOutOfRange {
                index,
                available: focus.suggestions.len(),
            },
        )?;
        let range = focus.range;
        self.accept_suggestion_at(range, &suggestion)
    }

    /// Accept `suggestion` for the error marked at `range`.
    pub fn accept_suggestion_at(
        &mut self,
        range: TextRange,
        suggestion: &str,
    ) -> Result<AcceptOutcome, AnnotationError> {
        let focus_before = self.focus_key();
        let outcome = self
            .applier
            .accept_suggestion(&mut self.document, range, suggestion)
            .inspect_err(|err| tracing::warn!(%err, "rejected accept"))?;

        if self.coordinator.active().is_some_and(|f| f.range == range) {
            self.coordinator.take_active();
        }
        match self.applier.mode() {
            AcceptMode::Replace => {
                self.errors.remove_at(range);
            }
            AcceptMode::Review => {
                self.errors.mark_corrected(range, true);
            }
        }
        for delta in &outcome.deltas {
            self.track_delta(delta);
        }

        self.notify(SessionEventKind::DocumentEdited);
        self.notify(SessionEventKind::AnnotationsChanged);
        self.notify_focus_if_changed(focus_before);
        self.signal_if_resolved();
        Ok(outcome)
    }

    /// Ignore the focused error.
    pub fn ignore_focused(&mut self) -> Result<ErrorMark, AnnotationError> {
        let range = self
            .coordinator
            .active()
            .map(|f| f.range)
            .ok_or(AnnotationError::NoActiveFocus)?;
        self.ignore_at(range)
    }

    /// Remove the error mark at `range` without changing the text.
    pub fn ignore_at(&mut self, range: TextRange) -> Result<ErrorMark, AnnotationError> {
        let focus_before = self.focus_key();
        let mark = self
            .applier
            .ignore(&mut self.document, range)
            .inspect_err(|err| tracing::warn!(%err, "rejected ignore"))?;
        self.errors.remove_at(range);
        self.coordinator.retain_if_present(&self.document);

        self.notify(SessionEventKind::AnnotationsChanged);
        self.notify_focus_if_changed(focus_before);
        self.signal_if_resolved();
        Ok(mark)
    }

    /// Apply the default suggestion of every pending error and drop all error marks.
    ///
    /// Always ends with an [`AllResolved`](SessionEventKind::AllResolved) notification.
    pub fn accept_all(&mut self) -> AcceptAllOutcome {
        let focus_before = self.focus_key();
        self.coordinator.close();
        let outcome = self.applier.accept_all(&mut self.document);
        self.errors.clear();

        tracing::info!(
            accepted = outcome.accepted,
            committed = outcome.committed,
            "accepted all corrections"
        );
        if !outcome.deltas.is_empty() {
            self.notify(SessionEventKind::DocumentEdited);
        }
        self.notify(SessionEventKind::AnnotationsChanged);
        self.notify_focus_if_changed(focus_before);
        self.resolved_signalled = true;
        self.notify(SessionEventKind::AllResolved);
        outcome
    }

    /// Remove the original text of every review-mode correction.
    pub fn commit_corrections(&mut self) -> Vec<TextDelta> {
        let focus_before = self.focus_key();
        self.errors.remove_corrected();
        let deltas = self.applier.commit_corrections(&mut self.document);
        for delta in &deltas {
            self.track_delta(delta);
        }
        if !deltas.is_empty() {
            self.notify(SessionEventKind::DocumentEdited);
            self.notify(SessionEventKind::AnnotationsChanged);
            self.notify_focus_if_changed(focus_before);
        }
        deltas
    }

    /// Clear the text, all marks and the focus, cancelling any in-flight check.
    pub fn clear(&mut self) {
        self.cancel_in_flight();
        let focus_before = self.focus_key();
        self.coordinator.close();
        self.document.set_text("");
        self.errors.clear();
        self.resolved_signalled = true;
        self.notify(SessionEventKind::Cleared);
        self.notify_focus_if_changed(focus_before);
    }

    // ---- internals ----

    fn track_delta(&mut self, delta: &TextDelta) {
        self.errors.apply_delta(delta);
        self.coordinator.apply_delta(delta);
        self.coordinator.retain_if_present(&self.document);
    }

    fn signal_if_resolved(&mut self) {
        if self.resolved_signalled || self.document.has_pending_errors() {
            return;
        }
        self.resolved_signalled = true;
        tracing::info!("all errors resolved");
        self.notify(SessionEventKind::AllResolved);
    }

    fn focus_key(&self) -> FocusKey {
        let shown = self.coordinator.active().or(self.coordinator.pending());
        (
            self.coordinator.phase(),
            shown.map(|f| f.anchor),
            shown.map(|f| f.range),
        )
    }

    fn notify_focus_if_changed(&mut self, before: FocusKey) {
        if self.focus_key() != before {
            self.notify(SessionEventKind::FocusChanged);
        }
    }

    fn notify(&mut self, kind: SessionEventKind) {
        let old_version = self.state_version;
        self.state_version += 1;
        let event = SessionEvent {
            kind,
            old_version,
            new_version: self.state_version,
        };
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for CheckerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerSession")
            .field("document_version", &self.document.version())
            .field("errors", &self.errors.len())
            .field("generation", &self.generation)
            .field("state_version", &self.state_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Vec<TextError> {
        vec![TextError::new("pra", 8, 11, ErrorKind::Spelling, "ai").with_suggestions(["para"])]
    }

    #[test]
    fn test_begin_check_guards() {
        let mut session = CheckerSession::new("  ", CheckerConfig::default());
        assert_eq!(session.begin_check().unwrap_err(), CheckError::EmptyDocument);

        let config = CheckerConfig {
            max_chars: 3,
            ..CheckerConfig::default()
        };
        let mut session = CheckerSession::new("abcd", config);
        assert_eq!(
            session.begin_check().unwrap_err(),
            CheckError::TooLong {
                char_count: 4,
                max_chars: 3
            }
        );
    }

    #[test]
    fn test_new_check_supersedes_old_ticket() {
        let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
        let first = session.begin_check().unwrap();
        let second = session.begin_check().unwrap();
        assert!(first.ticket.is_cancelled());

        assert_eq!(
            session.receive_report(&first.ticket, &report()),
            ReportOutcome::Cancelled
        );
        assert_eq!(
            session.receive_report(&second.ticket, &report()),
            ReportOutcome::Applied { errors: 1 }
        );
        // Delivered twice: the ticket is no longer in flight.
        assert_eq!(
            session.receive_report(&second.ticket, &report()),
            ReportOutcome::Stale
        );
    }

    #[test]
    fn test_emptying_document_cancels() {
        let mut session = CheckerSession::new("abc", CheckerConfig::default());
        let submission = session.begin_check().unwrap();
        session.edit(TextRange::new(0, 3), "").unwrap();
        assert!(submission.ticket.is_cancelled());
        assert_eq!(session.get_state().in_flight, None);
    }

    #[test]
    fn test_choose_suggestion_requires_focus() {
        let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
        assert_eq!(
            session.choose_suggestion(0).unwrap_err(),
            AnnotationError::NoActiveFocus
        );

        let submission = session.begin_check().unwrap();
        session.receive_report(&submission.ticket, &report());
        session.click(AnchorId(1), 8);
        session.commit_frame();
        assert_eq!(
            session.choose_suggestion(3).unwrap_err(),
            AnnotationError::SuggestionOutOfRange {
                index: 3,
                available: 1
            }
        );
    }

    #[test]
    fn test_state_counts() {
        let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
        let submission = session.begin_check().unwrap();
        let mut raw = report();
        raw.push(TextError::new("escola", 12, 18, ErrorKind::Grammar, "lt"));
        session.receive_report(&submission.ticket, &raw);

        let state = session.get_state();
        assert_eq!(state.spelling_count, 1);
        assert_eq!(state.grammar_count, 1);
        assert!(session.has_changed_since(0));
    }
}
