//! Exchange session.
//!
//! Owns the dispatcher (and with it the cookie) for one run, performs the
//! `checkauth`/`init` negotiation and holds the capabilities the server
//! declared.

use std::sync::Arc;

use bytes::Bytes;

use super::capabilities::ServerCapabilities;
use super::dispatcher::{FileTarget, RequestDispatcher};
use super::envelope::{ResponseEnvelope, ResponseStatus};
use super::method::Method;
use crate::error::{ExchangeError, Result};
use crate::transport::{SessionCookie, Transport};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing sent yet
    Initial,
    /// `checkauth` succeeded
    Authenticated,
    /// `init` succeeded, capabilities known
    Ready,
}

/// One authenticated conversation with the exchange endpoint
#[derive(Debug)]
pub struct ExchangeSession {
    dispatcher: RequestDispatcher,
    state: SessionState,
    capabilities: Option<ServerCapabilities>,
}

impl ExchangeSession {
    /// Create a session over `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher: RequestDispatcher::new(transport),
            state: SessionState::Initial,
            capabilities: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Send `catalog.checkauth`.
    ///
    /// When the response carries at least two lines after the status, they
    /// are the cookie name and value; the cookie is attached to every later
    /// request of this session.
    pub async fn check_auth(&mut self) -> Result<Option<SessionCookie>> {
        let envelope = self.dispatcher.send(Method::CheckAuth, None, Bytes::new()).await?;

        match envelope.status {
            ResponseStatus::Fail => {
                return Err(ExchangeError::Auth {
                    message: "server rejected the credentials".to_string(),
                    log: envelope.log,
                })
            },
            ResponseStatus::Unknown => {
                return Err(ExchangeError::Auth {
                    message: "unparsable checkauth response".to_string(),
                    log: envelope.log,
                })
            },
            ResponseStatus::Success | ResponseStatus::Progress => {},
        }

        let cookie = match envelope.log.as_slice() {
            [name, value, ..] if !name.is_empty() => {
                let cookie = SessionCookie::new(name.as_str(), value.as_str());
                self.dispatcher.set_cookie(cookie.clone());
                Some(cookie)
            },
            _ => None,
        };

        self.state = SessionState::Authenticated;
        Ok(cookie)
    }

    /// Send `catalog.init` and record the server capabilities.
    ///
    /// Capabilities are negotiated once per session.
    pub async fn init(&mut self) -> Result<ServerCapabilities> {
        match self.state {
            SessionState::Initial => {
                return Err(ExchangeError::Negotiation(
                    "init requires a successful checkauth".to_string(),
                ))
            },
            SessionState::Ready => {
                return Err(ExchangeError::Negotiation(
                    "capabilities already negotiated for this session".to_string(),
                ))
            },
            SessionState::Authenticated => {},
        }

        let envelope = self.dispatcher.send(Method::Init, None, Bytes::new()).await?;
        if envelope.is_fail() {
            return Err(ExchangeError::Negotiation(format!(
                "init failed: {}",
                envelope.log.join(" | ")
            )));
        }

        let capabilities = ServerCapabilities::from_init_log(&envelope.log)?;
        tracing::info!(
            "Server capabilities: zip={}, file_limit={}",
            capabilities.supports_zip,
            capabilities.max_part_bytes
        );

        self.capabilities = Some(capabilities);
        self.state = SessionState::Ready;
        Ok(capabilities)
    }

    /// Negotiated capabilities.
    ///
    /// Fails with [`ExchangeError::CapabilitiesMissing`] before `init`.
    pub fn capabilities(&self) -> Result<ServerCapabilities> {
        self.capabilities.ok_or(ExchangeError::CapabilitiesMissing)
    }

    /// Send a request within this session
    pub async fn send(
        &mut self,
        method: Method,
        target: Option<&FileTarget>,
        payload: Bytes,
    ) -> Result<ResponseEnvelope> {
        self.dispatcher.send(method, target, payload).await
    }

    /// Request dispatcher
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    fn open(bodies: &[&str]) -> (ExchangeSession, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::from_bodies(bodies.to_vec()));
        (ExchangeSession::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_handshake() {
        let (mut session, transport) =
            open(&["success\nPHPSESSID\nf00d", "zip=yes\nfile_limit=500000"]);
        assert_eq!(session.state(), SessionState::Initial);

        let cookie = session.check_auth().await.unwrap();
        assert_eq!(cookie, Some(SessionCookie::new("PHPSESSID", "f00d")));
        assert_eq!(session.state(), SessionState::Authenticated);

        let caps = session.init().await.unwrap();
        assert_eq!(caps, ServerCapabilities::new(true, 500000));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.capabilities().unwrap(), caps);

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::CheckAuth);
        assert!(sent[0].body.is_empty());
        assert_eq!(sent[1].cookie, Some(SessionCookie::new("PHPSESSID", "f00d")));
    }

    #[tokio::test]
    async fn test_checkauth_without_cookie() {
        let (mut session, transport) = open(&["success", "zip=no\nfile_limit=10"]);

        assert_eq!(session.check_auth().await.unwrap(), None);
        session.init().await.unwrap();
        assert!(transport.requests()[1].cookie.is_none());
    }

    #[tokio::test]
    async fn test_checkauth_fail() {
        let (mut session, _) = open(&["failure\nAccess denied"]);
        let err = session.check_auth().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Auth { .. }));

        let (mut session, _) = open(&["fail\nAccess denied"]);
        match session.check_auth().await.unwrap_err() {
            ExchangeError::Auth { log, .. } => assert_eq!(log, vec!["Access denied"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.state(), SessionState::Initial);
    }

    #[tokio::test]
    async fn test_capabilities_missing_before_init() {
        let (session, _) = open(&[]);
        assert!(matches!(
            session.capabilities(),
            Err(ExchangeError::CapabilitiesMissing)
        ));
    }

    #[tokio::test]
    async fn test_init_requires_auth() {
        let (mut session, transport) = open(&["zip=yes\nfile_limit=1"]);
        assert!(session.init().await.is_err());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_init_once() {
        let (mut session, transport) =
            open(&["success", "zip=yes\nfile_limit=1", "zip=no\nfile_limit=2"]);
        session.check_auth().await.unwrap();
        session.init().await.unwrap();
        assert!(session.init().await.is_err());
        assert_eq!(transport.request_count(), 2);
        assert!(session.capabilities().unwrap().supports_zip);
    }

    #[tokio::test]
    async fn test_init_malformed() {
        let (mut session, _) = open(&["success", "zip=yes"]);
        session.check_auth().await.unwrap();
        assert!(matches!(
            session.init().await,
            Err(ExchangeError::Negotiation(_))
        ));
        assert!(session.capabilities().is_err());
    }

    #[tokio::test]
    async fn test_init_fail_status() {
        let (mut session, _) = open(&["success", "fail\nexchange disabled"]);
        session.check_auth().await.unwrap();
        let err = session.init().await.unwrap_err();
        assert!(err.to_string().contains("exchange disabled"));
    }
}
