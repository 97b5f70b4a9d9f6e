//! In-memory transport.
//!
//! Answers requests from a responder closure instead of the network and
//! records everything it was sent, so callers can check request order,
//! cookies and reassembled payloads.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use super::{ExchangeRequest, Transport};
use crate::error::{ExchangeError, Result};

type Responder = Box<dyn Fn(&ExchangeRequest) -> Result<String> + Send + Sync>;

/// Scripted transport for tests and offline runs
pub struct ScriptedTransport {
    responder: Responder,
    sent: Mutex<Vec<ExchangeRequest>>,
}

impl ScriptedTransport {
    /// Answer every request with `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ExchangeRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests with `bodies` in order; requests beyond the script fail
    pub fn from_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(bodies.into_iter().map(Into::into).collect());

        Self::new(move |request| {
            queue
                .lock()
                .map_err(|_| ExchangeError::Transfer("response script poisoned".to_string()))?
                .pop_front()
                .ok_or_else(|| {
                    ExchangeError::Transfer(format!("No scripted response for {}", request.method))
                })
        })
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<ExchangeRequest> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    fn post(
        &self,
        request: ExchangeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let response = (self.responder)(&request);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request);
        }
        Box::pin(async move { response })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Method;
    use bytes::Bytes;

    fn request(method: Method) -> ExchangeRequest {
        ExchangeRequest {
            method,
            filename: None,
            body: Bytes::new(),
            cookie: None,
        }
    }

    #[tokio::test]
    async fn test_bodies_in_order() {
        let transport = ScriptedTransport::from_bodies(["success", "zip=no\nfile_limit=10"]);

        assert_eq!(transport.post(request(Method::CheckAuth)).await.unwrap(), "success");
        assert!(transport.post(request(Method::Init)).await.unwrap().contains("zip"));
        assert!(transport.post(request(Method::File)).await.is_err());
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let transport = ScriptedTransport::new(|r| Ok(format!("success\n{}", r.method)));

        let body = transport.post(request(Method::Complete)).await.unwrap();
        assert_eq!(body, "success\ncatalog.complete");
        assert_eq!(transport.requests()[0].method, Method::Complete);
    }
}
