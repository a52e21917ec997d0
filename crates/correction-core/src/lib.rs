#![warn(missing_docs)]
//! Correction Core - Headless Spell/Grammar Annotation Engine
//!
//! # Overview
//!
//! `correction-core` reconciles error reports from an external correction service with a live,
//! user-editable text. It keeps the reported errors consistent with the text (relocating stale
//! offsets, resolving overlaps between detectors), marks them as inline annotations, and applies
//! the user's decisions (accept a suggestion, ignore, accept all).
//!
//! It does not talk to the network and does not render anything: hosts feed it text edits,
//! clicks and reports, and read back snapshots and events.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Checker Session (tickets, events, state)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Interaction Coordinator (focus/popover)    │  ← User Actions
//! ├─────────────────────────────────────────────┤
//! │  Annotation Applier (accept/ignore/all)     │  ← Text Mutations
//! ├─────────────────────────────────────────────┤
//! │  Error Normalizer + Span Locator            │  ← Report Reconciliation
//! ├─────────────────────────────────────────────┤
//! │  Document (rope + sorted annotations)       │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use correction_core::{AnchorId, CheckerConfig, CheckerSession, ErrorKind, ReportOutcome, TextError};
//!
//! let mut session = CheckerSession::new("o qe disse qe sim", CheckerConfig::default());
//! let submission = session.begin_check().unwrap();
//!
//! // The user keeps typing while the check runs.
//! session.edit(correction_core::TextRange::new(0, 0), "xx").unwrap();
//!
//! let report = vec![
//!     TextError::new("qe", 2, 4, ErrorKind::Spelling, "ai").with_suggestions(["que"]),
//!     TextError::new("qe", 11, 13, ErrorKind::Spelling, "ai").with_suggestions(["que"]),
//! ];
//! assert_eq!(
//!     session.receive_report(&submission.ticket, &report),
//!     ReportOutcome::Applied { errors: 2 }
//! );
//!
//! session.accept_all();
//! assert_eq!(session.document().text(), "xxo que disse que sim");
//! ```
//!
//! # Offsets
//!
//! All offsets in this crate are character offsets (Unicode scalar values) into the plain
//! text. Conversion to block-structured editor positions lives in [`offsets`]; conversion from
//! wire encodings (UTF-16) is the transport layer's job.
//!
//! # Module Description
//!
//! - [`locate`] - Span locator (forward word search)
//! - [`normalize`] - Error normalizer
//! - [`document`] - Versioned text + annotation model and render segments
//! - [`applier`] - Annotation applier
//! - [`coordinator`] - Focus tracking
//! - [`session`] - Session state, report tickets and notifications
//! - [`offsets`] - Plain text ↔ editor position mapping

pub mod annotations;
pub mod applier;
pub mod config;
pub mod coordinator;
pub mod delta;
pub mod document;
mod error;
pub mod error_set;
pub mod locate;
pub mod normalize;
pub mod offsets;
pub mod session;
pub mod text_error;

pub use annotations::{Annotation, AnnotationKind, AnnotationSet, ErrorMark, TextRange};
pub use applier::{AcceptAllOutcome, AcceptOutcome, AnnotationApplier};
pub use config::{AcceptMode, CheckerConfig, ConfigError, OffsetEncoding};
pub use coordinator::{ActiveErrorFocus, AnchorId, FocusEvent, FocusPhase, InteractionCoordinator};
pub use delta::{TextDelta, TextDeltaEdit};
pub use document::{Document, DocumentSnapshot, Segment};
pub use error::{AnnotationError, CheckError};
pub use error_set::NormalizedErrorSet;
pub use locate::{LocateOptions, SpanLocator};
pub use normalize::{Normalizer, normalize};
pub use offsets::{EditorCoordinates, EditorMarkOp, EditorRange, editor_mark_ops, to_editor_offset};
pub use session::{
    CancelToken, CheckSubmission, CheckerSession, ReportOutcome, ReportTicket, SessionCallback,
    SessionEvent, SessionEventKind, SessionState,
};
pub use text_error::{ErrorKind, TextError};
