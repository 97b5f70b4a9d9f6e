//! HTTP transport for the exchange endpoint.
//!
//! Every request is a POST to the endpoint URL with Basic auth and the raw
//! payload as body. The timeout is fixed per client and a timed-out request
//! is not retried. Cookies set by the endpoint through `Set-Cookie` are kept
//! in the client's jar and sent back on later requests; a cookie announced in
//! the `checkauth` body goes out as an explicit `Cookie` header instead.
//! Response bodies are decoded using the charset of their `Content-Type`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{header, Client, Url};

use super::{ExchangeRequest, Transport};
use crate::config::{ExchangeEndpoint, ExchangeSettings};
use crate::error::{ExchangeError, Result};

/// reqwest-backed transport.
///
/// hyper never sends `Expect: 100-continue`, so bodies go out immediately
/// without waiting for an interim response.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
    user: String,
    pass: String,
}

impl HttpTransport {
    /// Create a transport for `endpoint`.
    pub fn new(endpoint: &ExchangeEndpoint, settings: &ExchangeSettings) -> Result<Self> {
        if endpoint.url.trim().is_empty() {
            return Err(ExchangeError::Config(
                "Exchange URL is not set (run `cml serv --url ...`)".to_string(),
            ));
        }

        let url = Url::parse(endpoint.url.trim())
            .map_err(|e| ExchangeError::Config(format!("Invalid exchange URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .cookie_store(true)
            .build()
            .map_err(|e| ExchangeError::Transfer(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            user: endpoint.user.clone(),
            pass: endpoint.pass.clone(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        request: ExchangeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .post(self.url.clone())
                .query(&request.query())
                .basic_auth(&self.user, Some(&self.pass))
                .body(request.body);

            if let Some(cookie) = &request.cookie {
                builder = builder.header(header::COOKIE, cookie.header_value());
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ExchangeError::Transfer(format!(
                    "{} returned HTTP {}",
                    request.method, status
                )));
            }

            Ok(response.text().await?)
        })
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
