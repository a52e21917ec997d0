use correction_core::{
    CancelToken, CheckerConfig, CheckerSession, OffsetEncoding, ReportOutcome, TextRange,
};
use correction_report::{
    CheckRequest, ClientError, FileTransport, ReportClient, ReportInbound, TransportError,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

const PRA_REPORT: &str = r#"{"errors":[{"word":"pra","start":8,"end":11,"type":"spelling","source":"ai","suggestions":["para"]}],"logId":"log-1"}"#;

fn config() -> CheckerConfig {
    CheckerConfig {
        request_timeout_ms: 2_000,
        ..CheckerConfig::default()
    }
}

#[test]
fn test_completed_report_is_applied() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let transport = move |request: &CheckRequest, _: &CancelToken, _: Duration| {
        sink.lock().unwrap().push(request.clone());
        Ok::<_, TransportError>(PRA_REPORT.to_string())
    };

    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(transport, session.config())
        .with_request_template(CheckRequest::new("").with_tag("development"));

    client.submit(session.begin_check().unwrap());
    let inbound = client.recv_timeout(WAIT).unwrap();
    match &inbound {
        ReportInbound::Completed { response, .. } => {
            assert_eq!(response.log_id.as_deref(), Some("log-1"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(inbound.deliver(&mut session), Some(ReportOutcome::Applied { errors: 1 }));

    let requests = seen.lock().unwrap();
    assert_eq!(requests[0].text, "Ele foi pra escola");
    assert_eq!(requests[0].tag.as_deref(), Some("development"));
}

#[test]
fn test_superseded_request_is_discarded() {
    let transport = |_: &CheckRequest, cancel: &CancelToken, _: Duration| {
        let started = Instant::now();
        while !cancel.is_cancelled() && started.elapsed() < Duration::from_millis(200) {
            thread::sleep(Duration::from_millis(5));
        }
        Ok::<_, TransportError>(PRA_REPORT.to_string())
    };

    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(transport, session.config());

    client.submit(session.begin_check().unwrap());
    client.submit(session.begin_check().unwrap());

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let inbound = client.recv_timeout(WAIT).unwrap();
        outcomes.push((inbound.ticket().generation(), inbound.deliver(&mut session)));
    }
    outcomes.sort_by_key(|(generation, _)| *generation);

    // The first ticket was cancelled: its transport sees the token and the client reports it.
    assert_eq!(outcomes[0], (1, None));
    assert_eq!(outcomes[1], (2, Some(ReportOutcome::Applied { errors: 1 })));
}

#[test]
fn test_timeout_comes_from_config() {
    let transport =
        |_: &CheckRequest, _: &CancelToken, _: Duration| Ok::<_, TransportError>(PRA_REPORT.to_string());
    let client = ReportClient::new(transport, &config());
    assert_eq!(client.timeout(), Duration::from_millis(2_000));
}

#[test]
fn test_timeout_cancels_ticket() {
    let transport = |_: &CheckRequest, _: &CancelToken, timeout: Duration| {
        Err::<String, _>(TransportError::TimedOut(timeout))
    };
    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(transport, session.config());

    let submission = session.begin_check().unwrap();
    let ticket = submission.ticket.clone();
    client.submit(submission);

    let inbound = client.recv_timeout(WAIT).unwrap();
    assert!(matches!(
        &inbound,
        ReportInbound::Failed {
            error: ClientError::Transport(TransportError::TimedOut(_)),
            ..
        }
    ));
    assert!(ticket.is_cancelled());
    assert_eq!(inbound.deliver(&mut session), None);
    assert_eq!(session.get_state().in_flight, None);
}

#[test]
fn test_parse_failure_is_reported() {
    let transport =
        |_: &CheckRequest, _: &CancelToken, _: Duration| Ok::<_, TransportError>("oops".to_string());
    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(transport, session.config());
    client.submit(session.begin_check().unwrap());

    let inbound = client.recv_timeout(WAIT).unwrap();
    assert!(matches!(
        inbound,
        ReportInbound::Failed {
            error: ClientError::Parse(_),
            ..
        }
    ));
}

#[test]
fn test_utf16_offsets_from_stream() {
    let body = "data: {\"errors\":[{\"word\":\"qe\",\"start\":3,\"end\":5,\"type\":\"spelling\",\"source\":\"ai\",\"suggestions\":[\"que\"]}]}\ndata: [DONE]\n";
    let transport =
        move |_: &CheckRequest, _: &CancelToken, _: Duration| Ok::<_, TransportError>(body.to_string());

    let config = CheckerConfig {
        offset_encoding: OffsetEncoding::Utf16,
        ..config()
    };
    let mut session = CheckerSession::new("😀 qe", config);
    let client = ReportClient::new(transport, session.config());
    client.submit(session.begin_check().unwrap());
    client.recv_timeout(WAIT).unwrap().deliver(&mut session);

    assert_eq!(session.errors().as_slice()[0].range(), TextRange::new(2, 4));
}

#[test]
fn test_file_transport() {
    let path = std::env::temp_dir().join(format!("correction-report-{}.json", std::process::id()));
    std::fs::write(&path, PRA_REPORT).unwrap();

    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(FileTransport::new(&path), session.config());
    client.submit(session.begin_check().unwrap());
    let outcome = client.recv_timeout(WAIT).unwrap().deliver(&mut session);
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome, Some(ReportOutcome::Applied { errors: 1 }));
}

#[test]
fn test_try_recv_is_non_blocking() {
    let transport = |_: &CheckRequest, _: &CancelToken, _: Duration| {
        thread::sleep(Duration::from_millis(100));
        Ok::<_, TransportError>(PRA_REPORT.to_string())
    };
    let mut session = CheckerSession::new("Ele foi pra escola", config());
    let client = ReportClient::new(transport, session.config());
    client.submit(session.begin_check().unwrap());
    assert!(client.try_recv().is_none());

    let deadline = Instant::now() + WAIT;
    let inbound = loop {
        if let Some(inbound) = client.try_recv() {
            break inbound;
        }
        assert!(Instant::now() < deadline, "no report");
        thread::sleep(Duration::from_millis(5));
    };
    assert!(matches!(inbound, ReportInbound::Completed { .. }));
}
