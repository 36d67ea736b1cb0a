//! HTTP transport: one request in, one response (or transport failure) out

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::error::{HarnessError, Result, TransportError};
use crate::request::{Body, FormPart, Request, Response};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport shared by every resource wrapper of a run
///
/// Cloning is cheap; clones share the connection pool. The transport never
/// retries: retrying is the poller's job.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    timeout: Duration,
}

impl Transport {
    /// Create a transport with the default timeouts
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, HashMap::new())
    }

    /// Create a transport with custom timeouts and headers sent on every request
    pub fn with_config(
        timeout: Duration,
        connect_timeout: Duration,
        default_headers: HashMap<String, String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HarnessError::Config(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarnessError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| HarnessError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// Default timeout applied when a request does not set its own
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform exactly one HTTP exchange
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: Request) -> std::result::Result<Response, TransportError> {
        let Request {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;
        let timeout = timeout.unwrap_or(self.timeout);
        let started = Instant::now();

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .timeout(timeout);

        let has_content_type = headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match body {
            Body::Empty => builder,
            Body::Text(text) => {
                if !has_content_type {
                    builder = builder.header(CONTENT_TYPE, "text/plain; charset=utf-8");
                }
                builder.body(text)
            }
            Body::Json(value) => builder.json(&value),
            Body::Multipart(parts) => builder.multipart(into_form(parts)),
        };

        let fail = |source: reqwest::Error| {
            let err = TransportError::classify(method.clone(), url.as_str(), timeout, source);
            warn!(error = %err, "Transport failure");
            err
        };

        let response = builder.send().await.map_err(fail)?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let text = response.text().await.map_err(fail)?;

        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        Ok(Response {
            status,
            body: text,
            headers: response_headers,
            method,
            url,
        })
    }
}

fn into_form(parts: Vec<FormPart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => form.text(name, value),
        FormPart::File {
            name,
            file_name,
            bytes,
        } => form.part(name, Part::bytes(bytes).file_name(file_name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = Transport::new();
        assert!(transport.is_ok());
        assert_eq!(transport.unwrap().timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_invalid_default_header() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let result = Transport::with_config(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, headers);
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }
}
