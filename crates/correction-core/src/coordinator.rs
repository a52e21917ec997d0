//! Focused-error tracking (the suggestion popover).
//!
//! At most one error is focused at a time. Focus changes are two-phase:
//!
//! 1. [`InteractionCoordinator::focus`] tears down the current focus right away (emitting
//!    [`FocusEvent::Deactivated`]) and parks the new focus as *pending*;
//! 2. the host calls [`InteractionCoordinator::commit_frame`] on its next frame, which promotes
//!    the pending focus (emitting [`FocusEvent::Activated`]).
//!
//! A second click before the frame simply replaces the pending focus, so the host never shows
//! two popovers.

use crate::annotations::TextRange;
use crate::delta::TextDelta;
use crate::document::Document;
use crate::text_error::ErrorKind;

/// Opaque host handle identifying the clicked element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

/// The focused error and the data its popover shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveErrorFocus {
    /// Host anchor the popover is attached to.
    pub anchor: AnchorId,
    /// Range of the focused error mark.
    pub range: TextRange,
    /// Spelling or grammar.
    pub kind: ErrorKind,
    /// Detector that reported the error.
    pub source: String,
    /// Candidate replacements.
    pub suggestions: Vec<String>,
    /// Optional explanation.
    pub explanation: Option<String>,
    /// Whether the mark is a review-mode correction awaiting commit.
    pub corrected: bool,
}

/// Notification for the host's popover layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusEvent {
    /// Remove the active marker / popover from this anchor.
    Deactivated(AnchorId),
    /// Show a popover for this focus.
    Activated(ActiveErrorFocus),
}

/// Where the coordinator is in the focus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPhase {
    /// No focus.
    Idle,
    /// A focus waits for the next frame.
    Pending,
    /// A popover is shown.
    Focused,
}

/// Tracks the focused error mark.
#[derive(Debug, Default)]
pub struct InteractionCoordinator {
    active: Option<ActiveErrorFocus>,
    pending: Option<ActiveErrorFocus>,
    events: Vec<FocusEvent>,
}

impl InteractionCoordinator {
    /// Create an idle coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> FocusPhase {
        if self.pending.is_some() {
            FocusPhase::Pending
        } else if self.active.is_some() {
            FocusPhase::Focused
        } else {
            FocusPhase::Idle
        }
    }

    /// The shown focus, if any.
    pub fn active(&self) -> Option<&ActiveErrorFocus> {
        self.active.as_ref()
    }

    /// The focus waiting for the next frame, if any.
    pub fn pending(&self) -> Option<&ActiveErrorFocus> {
        self.pending.as_ref()
    }

    /// Handle a click at character `offset` on host element `anchor`.
    ///
    /// If an error mark covers the offset, the current focus is torn down and the new one is
    /// parked until [`commit_frame`](Self::commit_frame). Otherwise the click counts as an
    /// outside click and closes any focus. Returns `true` when an error mark was hit.
    pub fn focus(&mut self, anchor: AnchorId, doc: &Document, offset: usize) -> bool {
        let Some((range, mark)) = doc.annotations().error_covering(offset) else {
            self.close();
            return false;
        };

        let focus = ActiveErrorFocus {
            anchor,
            range,
            kind: mark.kind,
            source: mark.source.clone(),
            suggestions: mark.suggestions.clone(),
            explanation: mark.explanation.clone(),
            corrected: mark.corrected,
        };

        if let Some(previous) = self.active.take() {
            self.events.push(FocusEvent::Deactivated(previous.anchor));
        }
        self.pending = Some(focus);
        true
    }

    /// Promote the pending focus. Returns the newly shown focus.
    pub fn commit_frame(&mut self) -> Option<&ActiveErrorFocus> {
        let focus = self.pending.take()?;
        self.events.push(FocusEvent::Activated(focus.clone()));
        self.active = Some(focus);
        self.active.as_ref()
    }

    /// Remove and return the shown focus (the user picked an action in the popover).
    pub fn take_active(&mut self) -> Option<ActiveErrorFocus> {
        let focus = self.active.take()?;
        self.events.push(FocusEvent::Deactivated(focus.anchor));
        Some(focus)
    }

    /// Close any focus without touching the document. Returns `true` if something was closed.
    pub fn close(&mut self) -> bool {
        let had_pending = self.pending.take().is_some();
        let had_active = self.take_active().is_some();
        had_pending || had_active
    }

    /// Shift focused ranges through a text change; a focus whose text was deleted is closed.
    pub fn apply_delta(&mut self, delta: &TextDelta) {
        if delta.is_empty() {
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            match delta.map_range(pending.range) {
                Some(range) => pending.range = range,
                None => self.pending = None,
            }
        }
        if let Some(active) = self.active.as_mut() {
            match delta.map_range(active.range) {
                Some(range) => active.range = range,
                None => {
                    self.take_active();
                }
            }
        }
    }

    /// Close any focus whose error mark no longer exists in `doc`.
    pub fn retain_if_present(&mut self, doc: &Document) {
        let present = |focus: &ActiveErrorFocus| doc.annotations().error_at(focus.range).is_some();
        if self.pending.as_ref().is_some_and(|f| !present(f)) {
            self.pending = None;
        }
        if self.active.as_ref().is_some_and(|f| !present(f)) {
            self.take_active();
        }
    }

    /// Take queued focus events, oldest first.
    pub fn drain_events(&mut self) -> Vec<FocusEvent> {
        std::mem::take(&mut self.events)
    }
}
