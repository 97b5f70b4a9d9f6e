//! Request dispatch.
//!
//! [`RequestDispatcher`] is the only component that talks to the
//! transport. It builds each request, attaches the session cookie once one
//! is known, parses the response envelope and writes an audit line for
//! every request, successful or not.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;

use super::envelope::{ResponseEnvelope, ResponseStatus};
use super::method::Method;
use crate::error::Result;
use crate::transport::{ExchangeRequest, SessionCookie, Transport};

/// File addressed by a request, with an optional part index.
///
/// The part index is client-side bookkeeping: the server receives the bare
/// name and appends consecutive uploads of it in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTarget {
    /// Bare file name
    pub name: String,
    /// 1-based part index for chunked uploads
    pub part: Option<u32>,
}

impl FileTarget {
    /// Whole file, no part index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            part: None,
        }
    }

    /// One part of a chunked upload
    pub fn part(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            part: Some(index),
        }
    }
}

impl fmt::Display for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.part {
            Some(part) => write!(f, "{}:{}", self.name, part),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for FileTarget {
    type Err = String;

    /// Parse `name` or `name:<part>`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.rsplit_once(':') {
            Some((name, part)) if !name.is_empty() => {
                let index = part
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid part index in {s:?}"))?;
                if index == 0 {
                    return Err(format!("Part indices start at 1: {s:?}"));
                }
                Ok(Self::part(name, index))
            },
            _ => Ok(Self::new(s)),
        }
    }
}

/// One line of the request audit trail
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Time since the dispatcher was created
    pub elapsed: Duration,
    /// Request method
    pub method: Method,
    /// Addressed file, if any
    pub target: Option<FileTarget>,
    /// Payload size in bytes
    pub bytes: usize,
    /// Response status (`Unknown` when the transport failed)
    pub status: ResponseStatus,
    /// Server log, or the transport error
    pub log: Vec<String>,
}

/// Audit entries kept per session; older entries are dropped
pub const AUDIT_CAPACITY: usize = 256;

/// Sends protocol requests and keeps the per-session request state
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    cookie: Option<SessionCookie>,
    started: Instant,
    requests: usize,
    audit: VecDeque<AuditEntry>,
}

impl RequestDispatcher {
    /// Create a dispatcher over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cookie: None,
            started: Instant::now(),
            requests: 0,
            audit: VecDeque::with_capacity(AUDIT_CAPACITY),
        }
    }

    /// Send one request and parse its response.
    ///
    /// Takes `&mut self`, so a session never has two requests in flight.
    pub async fn send(
        &mut self,
        method: Method,
        target: Option<&FileTarget>,
        payload: Bytes,
    ) -> Result<ResponseEnvelope> {
        let bytes = payload.len();
        let request = ExchangeRequest {
            method,
            filename: target.map(|t| t.name.clone()),
            body: payload,
            cookie: self.cookie.clone(),
        };

        let result = self.transport.post(request).await;

        let (envelope, outcome) = match result {
            Ok(body) => {
                let envelope = ResponseEnvelope::parse(&body);
                (envelope.clone(), Ok(envelope))
            },
            Err(err) => (
                ResponseEnvelope {
                    status: ResponseStatus::Unknown,
                    log: vec![err.to_string()],
                },
                Err(err),
            ),
        };

        self.record(AuditEntry {
            elapsed: self.started.elapsed(),
            method,
            target: target.cloned(),
            bytes,
            status: envelope.status,
            log: envelope.log,
        });

        outcome
    }

    /// Register the cookie attached to every later request
    pub fn set_cookie(&mut self, cookie: SessionCookie) {
        tracing::debug!("Session cookie {}", cookie.name);
        self.cookie = Some(cookie);
    }

    /// Current session cookie
    pub fn cookie(&self) -> Option<&SessionCookie> {
        self.cookie.as_ref()
    }

    /// Most recent requests, oldest first, at most [`AUDIT_CAPACITY`]
    pub fn audit(&self) -> &VecDeque<AuditEntry> {
        &self.audit
    }

    /// Server log of the most recent request
    pub fn last_log(&self) -> &[String] {
        self.audit.back().map(|e| e.log.as_slice()).unwrap_or_default()
    }

    /// Number of requests sent
    pub fn request_count(&self) -> usize {
        self.requests
    }

    /// Time since the dispatcher was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Transport name
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    fn record(&mut self, entry: AuditEntry) {
        let target = entry
            .target
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        tracing::info!(
            elapsed = %format_elapsed(entry.elapsed),
            method = %entry.method,
            filename = %target,
            part = ?entry.target.as_ref().and_then(|t| t.part),
            bytes = entry.bytes,
            status = %entry.status,
            "{} {}",
            entry.method,
            target
        );
        for line in entry.log.iter().filter(|l| !l.is_empty()) {
            tracing::info!("  {line}");
        }

        if self.audit.len() == AUDIT_CAPACITY {
            self.audit.pop_front();
        }
        self.audit.push_back(entry);
        self.requests += 1;
    }
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("transport", &self.transport.name())
            .field("cookie", &self.cookie)
            .field("requests", &self.requests)
            .finish()
    }
}

/// Format a duration as `mm:ss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
