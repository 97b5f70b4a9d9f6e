//! Transport layer for exchange requests.
//!
//! The protocol engine talks to the server through the [`Transport`] trait,
//! so the same dispatcher drives a real HTTP endpoint or an in-memory script.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           RequestDispatcher             │
//! │        (envelope, cookie, audit)        │
//! └──────────────────┬──────────────────────┘
//!                    │ ExchangeRequest
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌──────────────────┐
//! │  HttpTransport  │ │ScriptedTransport │
//! │   (reqwest)     │ │   (in memory)    │
//! └─────────────────┘ └──────────────────┘
//! ```

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::ScriptedTransport;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::Method;

/// Cookie handed out by `catalog.checkauth`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

impl SessionCookie {
    /// Create a cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Value for a `Cookie` request header
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// One outgoing exchange request, as handed to a transport
#[derive(Debug, Clone)]
pub struct ExchangeRequest {
    /// Requested method
    pub method: Method,
    /// Bare file name for the `filename` parameter
    pub filename: Option<String>,
    /// Raw request body
    pub body: Bytes,
    /// Session cookie to attach
    pub cookie: Option<SessionCookie>,
}

impl ExchangeRequest {
    /// Query parameters in wire order: `type`, `mode`, then `filename`
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("type", self.method.exchange_type().to_string()),
            ("mode", self.method.mode().to_string()),
        ];
        if let Some(filename) = &self.filename {
            params.push(("filename", filename.clone()));
        }
        params
    }
}

/// Transport trait for pluggable exchange backends.
///
/// Implementations deliver one request and return the raw response body.
/// Anything other than a successful HTTP exchange (connection failure,
/// timeout, non-2xx status) is an [`ExchangeError::Transfer`](crate::ExchangeError::Transfer).
pub trait Transport: Send + Sync {
    /// Send a request and return the response body.
    fn post(
        &self,
        request: ExchangeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}
