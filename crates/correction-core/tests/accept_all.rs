use correction_core::{
    AnnotationKind, CheckerConfig, CheckerSession, ErrorKind, SessionEventKind, TextError,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};

/// Build a text of `n` distinct tokens plus one error per token.
fn fixture(n: usize) -> (String, Vec<TextError>, Vec<String>) {
    let mut text = String::new();
    let mut errors = Vec::new();
    let mut fixed = Vec::new();
    for i in 0..n {
        let word = format!("erro{i}");
        let start = text.chars().count();
        text.push_str(&word);
        text.push(' ');
        let suggestion = format!("certo{i}");
        errors.push(
            TextError::new(word.as_str(), start, start + word.chars().count(), ErrorKind::Spelling, "ai")
                .with_suggestions([suggestion.as_str(), "outro"]),
        );
        fixed.push(suggestion);
    }
    (text, errors, fixed)
}

#[test]
fn test_accept_all_is_order_independent() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..50 {
        let n = rng.gen_range(1..20);
        let (text, mut errors, fixed) = fixture(n);
        errors.shuffle(&mut rng);

        let mut session = CheckerSession::new(&text, CheckerConfig::default());
        let resolved = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&resolved);
        session.subscribe(move |event| {
            if event.kind == SessionEventKind::AllResolved {
                *counter.lock().unwrap() += 1;
            }
        });

        let submission = session.begin_check().unwrap();
        session.receive_report(&submission.ticket, &errors);
        let outcome = session.accept_all();

        let expected: String = fixed.iter().map(|w| format!("{w} ")).collect();
        assert_eq!(session.document().text(), expected, "round {round}");
        assert_eq!(outcome.accepted, n);
        assert!(
            session
                .document()
                .annotations()
                .iter()
                .all(|a| a.kind == AnnotationKind::Correction)
        );
        assert_eq!(session.document().annotations().len(), n);
        assert_eq!(*resolved.lock().unwrap(), 1);
    }
}

#[test]
fn test_accept_all_after_partial_resolution() {
    let (text, errors, _) = fixture(3);
    let mut session = CheckerSession::new(&text, CheckerConfig::default());
    let submission = session.begin_check().unwrap();
    session.receive_report(&submission.ticket, &errors);

    session.accept_suggestion_at(errors[1].range(), "outro").unwrap();
    session.ignore_at(errors[0].range()).unwrap();
    session.accept_all();

    assert_eq!(session.document().text(), "erro0 outro certo2 ");
    assert!(!session.document().has_pending_errors());
}
