#![warn(missing_docs)]
//! `correction-report` - correction service wire contract for `correction-core`.
//!
//! This crate contains everything between a [`correction_core::CheckerSession`] and a remote
//! checker: the request body, response and `data:` stream parsing, UTF-16 offset conversion,
//! blocking transports, and a threaded client that delivers reports back to the session.
//!
//! ```rust
//! use correction_core::{CancelToken, CheckerConfig, CheckerSession};
//! use correction_report::{CheckRequest, ReportClient, TransportError};
//! use std::time::Duration;
//!
//! let canned = |_: &CheckRequest, _: &CancelToken, _: Duration| -> Result<String, TransportError> {
//!     Ok(r#"{"errors":[{"word":"pra","start":8,"end":11,"type":"spelling","source":"ai","suggestions":["para"]}]}"#.to_string())
//! };
//!
//! let config = CheckerConfig::default();
//! let mut session = CheckerSession::new("Ele foi pra escola", config.clone());
//! let client = ReportClient::new(canned, &config);
//!
//! client.submit(session.begin_check().unwrap());
//! let inbound = client.recv_timeout(Duration::from_secs(5)).unwrap();
//! inbound.deliver(&mut session);
//!
//! assert_eq!(session.errors().len(), 1);
//! ```

pub mod client;
pub mod encoding;
pub mod report;
pub mod request;
pub mod stream;
pub mod transport;

pub use client::{ClientError, ReportClient, ReportInbound};
pub use encoding::{Utf16Index, char_to_utf16_offset, convert_offsets, utf16_to_char_offset};
pub use report::{CheckResponse, ReportParseError, parse_entries, parse_response};
pub use request::CheckRequest;
pub use stream::{StreamAccumulator, StreamDecoder, StreamEvent, is_event_stream, parse_stream};
pub use transport::{CorrectionTransport, FileTransport, ProcessTransport, TransportError};
