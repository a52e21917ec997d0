use correction_core::{
    AcceptMode, AnchorId, AnnotationKind, CheckerConfig, CheckerSession, ErrorKind, FocusEvent,
    ReportOutcome, SessionEventKind, TextError, TextRange,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

fn record(session: &mut CheckerSession) -> Arc<Mutex<Vec<SessionEventKind>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.subscribe(move |event| {
        sink.lock().unwrap().push(event.kind);
    });
    events
}

fn count(events: &Arc<Mutex<Vec<SessionEventKind>>>, kind: SessionEventKind) -> usize {
    events.lock().unwrap().iter().filter(|k| **k == kind).count()
}

fn pra() -> TextError {
    TextError::new("pra", 8, 11, ErrorKind::Spelling, "ai").with_suggestions(["para"])
}

fn checked(text: &str, config: CheckerConfig, report: &[TextError]) -> CheckerSession {
    let mut session = CheckerSession::new(text, config);
    let submission = session.begin_check().unwrap();
    session.receive_report(&submission.ticket, report);
    session
}

#[test]
fn test_accept_single_error_resolves_once() {
    let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
    let events = record(&mut session);

    let submission = session.begin_check().unwrap();
    assert_eq!(submission.text, "Ele foi pra escola");
    assert_eq!(
        session.receive_report(&submission.ticket, &[pra()]),
        ReportOutcome::Applied { errors: 1 }
    );

    assert!(session.click(AnchorId(7), 9));
    let focus = session.commit_frame().cloned().unwrap();
    assert_eq!(focus.range, TextRange::new(8, 11));
    assert_eq!(focus.suggestions, vec!["para".to_string()]);

    let outcome = session.choose_suggestion(0).unwrap();
    assert!(outcome.all_resolved);
    assert_eq!(session.document().text(), "Ele foi para escola");
    assert_eq!(session.document().annotations().pending_error_count(), 0);
    assert!(session.focus().is_none());
    assert_eq!(count(&events, SessionEventKind::AllResolved), 1);

    let focus_events = session.drain_focus_events();
    assert_eq!(focus_events.last(), Some(&FocusEvent::Deactivated(AnchorId(7))));
}

#[test]
fn test_correction_mark_tags_replacement() {
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &[pra()]);
    session.accept_suggestion_at(TextRange::new(8, 11), "para").unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.annotations.len(), 1);
    assert_eq!(snapshot.annotations[0].range, TextRange::new(8, 12));
    assert_eq!(snapshot.annotations[0].kind, AnnotationKind::Correction);
}

#[test]
fn test_report_after_edits_is_relocated() {
    let mut session = CheckerSession::new("o qe disse qe sim", CheckerConfig::default());
    let submission = session.begin_check().unwrap();
    session.edit(TextRange::new(0, 0), "xx").unwrap();

    let report = vec![
        TextError::new("qe", 2, 4, ErrorKind::Spelling, "ai").with_suggestions(["que"]),
        TextError::new("qe", 11, 13, ErrorKind::Spelling, "ai").with_suggestions(["que"]),
    ];
    session.receive_report(&submission.ticket, &report);

    let ranges: Vec<TextRange> = session.errors().iter().map(TextError::range).collect();
    assert_eq!(ranges, vec![TextRange::new(4, 6), TextRange::new(13, 15)]);
}

#[test]
fn test_errors_follow_edits() {
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &[pra()]);
    session.click(AnchorId(1), 8);
    session.commit_frame();

    session.edit(TextRange::new(0, 3), "Ela").unwrap();
    session.edit(TextRange::new(0, 0), "Hoje ").unwrap();

    assert_eq!(session.errors().as_slice()[0].range(), TextRange::new(13, 16));
    assert_eq!(session.focus().map(|f| f.range), Some(TextRange::new(13, 16)));

    // Deleting the marked word drops the error and closes its popover.
    session.edit(TextRange::new(13, 16), "").unwrap();
    assert!(session.errors().is_empty());
    assert!(session.focus().is_none());
}

#[test]
fn test_ignore_then_new_report_treats_error_as_fresh() {
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &[pra()]);
    let events = record(&mut session);

    session.click(AnchorId(1), 10);
    session.commit_frame();
    session.ignore_focused().unwrap();
    assert_eq!(session.document().text(), "Ele foi pra escola");
    assert!(session.errors().is_empty());
    assert_eq!(count(&events, SessionEventKind::AllResolved), 1);

    let submission = session.begin_check().unwrap();
    session.receive_report(&submission.ticket, &[pra()]);
    assert_eq!(session.errors().len(), 1);
    assert!(session.document().has_pending_errors());
}

#[test]
fn test_stale_report_does_not_overwrite() {
    let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
    let events = record(&mut session);

    let old = session.begin_check().unwrap();
    let new = session.begin_check().unwrap();
    session.receive_report(&new.ticket, &[]);

    assert_eq!(
        session.receive_report(&old.ticket, &[pra()]),
        ReportOutcome::Cancelled
    );
    assert!(session.errors().is_empty());
    assert_eq!(count(&events, SessionEventKind::RequestCancelled), 1);
    assert_eq!(count(&events, SessionEventKind::ReportDiscarded), 1);
}

#[test]
fn test_failed_request_clears_in_flight() {
    let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
    let submission = session.begin_check().unwrap();
    assert!(session.fail_report(&submission.ticket, "connection refused"));
    assert_eq!(session.get_state().in_flight, None);
    assert!(!session.fail_report(&submission.ticket, "again"));
}

#[test]
fn test_clear_cancels_and_resets() {
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &[pra()]);
    let events = record(&mut session);
    let submission = session.begin_check().unwrap();

    session.clear();
    assert!(submission.ticket.is_cancelled());
    assert_eq!(session.document().text(), "");
    assert!(session.errors().is_empty());
    assert!(session.document().annotations().is_empty());
    assert_eq!(count(&events, SessionEventKind::Cleared), 1);
}

#[test]
fn test_accept_all_signals_even_without_suggestions() {
    let report = vec![TextError::new("escola", 12, 18, ErrorKind::Grammar, "lt")];
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &report);
    let events = record(&mut session);

    let outcome = session.accept_all();
    assert_eq!(outcome.accepted, 0);
    assert_eq!(session.document().text(), "Ele foi pra escola");
    assert!(session.document().annotations().is_empty());
    assert_eq!(count(&events, SessionEventKind::AllResolved), 1);
}

#[test]
fn test_review_mode_flow() {
    let config = CheckerConfig {
        accept_mode: AcceptMode::Review,
        ..CheckerConfig::default()
    };
    let mut session = checked("Ele foi pra escola", config, &[pra()]);
    let events = record(&mut session);

    session.click(AnchorId(1), 8);
    session.commit_frame();
    session.choose_suggestion(0).unwrap();
    assert_eq!(session.document().text(), "Ele foi prapara escola");
    assert_eq!(session.get_state().corrected_count, 1);
    assert_eq!(session.get_state().spelling_count, 0);
    assert_eq!(count(&events, SessionEventKind::AllResolved), 1);

    // A new report keeps the correction awaiting commit.
    let submission = session.begin_check().unwrap();
    session.receive_report(&submission.ticket, &[pra()]);
    assert_eq!(session.get_state().corrected_count, 1);
    assert_eq!(session.get_state().spelling_count, 0);

    session.commit_corrections();
    assert_eq!(session.document().text(), "Ele foi para escola");
    assert!(session.errors().is_empty());
}

#[test]
fn test_review_mode_report_relocates_past_pending_correction() {
    let config = CheckerConfig {
        accept_mode: AcceptMode::Review,
        ..CheckerConfig::default()
    };
    let mut session = checked("Ele foi pra escola pra", config, &[pra()]);
    session.click(AnchorId(1), 8);
    session.commit_frame();
    session.choose_suggestion(0).unwrap();
    assert_eq!(session.document().text(), "Ele foi prapara escola pra");

    // Offsets of the trailing "pra" before the correction was inserted.
    let stale = TextError::new("pra", 19, 22, ErrorKind::Spelling, "ai").with_suggestions(["para"]);
    let submission = session.begin_check().unwrap();
    assert_eq!(
        session.receive_report(&submission.ticket, &[stale]),
        ReportOutcome::Applied { errors: 1 }
    );

    let pending: Vec<TextRange> = session
        .errors()
        .iter()
        .filter(|e| !e.corrected)
        .map(TextError::range)
        .collect();
    assert_eq!(pending, vec![TextRange::new(23, 26)]);
    assert_eq!(session.get_state().corrected_count, 1);
    assert!(session.document().has_pending_errors());
}

#[test]
fn test_focus_waits_for_frame_and_carries_explanation() {
    let report = [pra().with_explanation("Informal contraction of \"para\".")];
    let mut session = checked("Ele foi pra escola", CheckerConfig::default(), &report);

    session.click(AnchorId(3), 10);
    assert!(session.focus().is_none());
    assert_eq!(
        session.pending_focus().map(|f| f.range),
        Some(TextRange::new(8, 11))
    );

    let focus = session.commit_frame().cloned().unwrap();
    assert!(session.pending_focus().is_none());
    assert_eq!(
        focus.explanation.as_deref(),
        Some("Informal contraction of \"para\".")
    );
}

#[test]
fn test_versions_and_event_order() {
    let mut session = CheckerSession::new("Ele foi pra escola", CheckerConfig::default());
    let version = session.version();
    let events = record(&mut session);

    session.edit(TextRange::new(18, 18), "!").unwrap();
    assert!(session.has_changed_since(version));
    assert_eq!(
        *events.lock().unwrap(),
        vec![SessionEventKind::DocumentEdited]
    );
}
