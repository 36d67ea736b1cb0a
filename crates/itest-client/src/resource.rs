//! Resource-collection wrapper over the transport
//!
//! A [`ResourceClient`] fixes one collection path (`/rules`, `/devices`, ...)
//! and exposes list/get/post/put/delete on it. Status codes are never
//! interpreted here; callers decide what success means.

use std::fmt;

use tracing::instrument;
use url::Url;

use crate::error::{HarnessError, Result, TransportError};
use crate::request::{Body, Request, Response};
use crate::transport::Transport;

/// Immutable (base address, resource path) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
    path: String,
    url: Url,
}

impl Endpoint {
    /// Bind a collection path to a service base address
    ///
    /// The path is appended to the base path, so a base of
    /// `http://host:9004/v1` and path `/rules` gives `http://host:9004/v1/rules`.
    pub fn new(base: &Url, path: &str) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(HarnessError::InvalidEndpoint(format!(
                "{} cannot carry resource paths",
                base
            )));
        }
        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = Url::parse(&joined)?;

        Ok(Self {
            base: base.clone(),
            path: path.to_string(),
            url,
        })
    }

    /// Parse a base address and bind a path
    pub fn parse(base: &str, path: &str) -> Result<Self> {
        Self::new(&Url::parse(base)?, path)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Collection URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL of one item, with an optional trailing segment
    ///
    /// Ids are percent-encoded as single path segments.
    pub fn item_url(&self, id: &str, suffix: Option<&str>) -> Url {
        let mut url = self.url.clone();
        // Hierarchical URLs always yield segments; checked in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
            if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
                segments.push(suffix.trim_matches('/'));
            }
        }
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Typed facade binding the transport to one resource collection
#[derive(Debug, Clone)]
pub struct ResourceClient {
    transport: Transport,
    endpoint: Endpoint,
}

impl ResourceClient {
    pub fn new(transport: Transport, endpoint: Endpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// GET the collection
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn list(&self) -> std::result::Result<Response, TransportError> {
        self.send(Request::get(self.endpoint.url().clone())).await
    }

    /// GET one item, optionally a sub-resource of it
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get(
        &self,
        id: &str,
        suffix: Option<&str>,
    ) -> std::result::Result<Response, TransportError> {
        self.send(Request::get(self.endpoint.item_url(id, suffix)))
            .await
    }

    /// POST a new item to the collection
    #[instrument(skip(self, body), fields(endpoint = %self.endpoint))]
    pub async fn post(&self, body: impl Into<Body>) -> std::result::Result<Response, TransportError> {
        self.send(Request::post(self.endpoint.url().clone()).body(body))
            .await
    }

    /// PUT an item by id
    #[instrument(skip(self, body), fields(endpoint = %self.endpoint))]
    pub async fn put(
        &self,
        id: &str,
        body: impl Into<Body>,
    ) -> std::result::Result<Response, TransportError> {
        self.send(Request::put(self.endpoint.item_url(id, None)).body(body))
            .await
    }

    /// DELETE an item by id
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn delete(&self, id: &str) -> std::result::Result<Response, TransportError> {
        self.send(Request::delete(self.endpoint.item_url(id, None)))
            .await
    }

    /// Send a custom request (extra headers, timeout) through this wrapper
    pub async fn send(&self, request: Request) -> std::result::Result<Response, TransportError> {
        self.transport.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let endpoint = Endpoint::parse("http://localhost:9004/v1", "/rules").unwrap();
        assert_eq!(endpoint.url().as_str(), "http://localhost:9004/v1/rules");

        let endpoint = Endpoint::parse("http://localhost:9004/v1/", "rules").unwrap();
        assert_eq!(endpoint.url().as_str(), "http://localhost:9004/v1/rules");
    }

    #[test]
    fn test_item_url() {
        let endpoint = Endpoint::parse("http://127.0.0.1:9002/v1", "/deployments").unwrap();
        assert_eq!(
            endpoint.item_url("g1--p1", None).as_str(),
            "http://127.0.0.1:9002/v1/deployments/g1--p1"
        );
        assert_eq!(
            endpoint.item_url("dev 1", Some("twin")).as_str(),
            "http://127.0.0.1:9002/v1/deployments/dev%201/twin"
        );
        assert_eq!(
            endpoint.item_url("a/b", Some("")).as_str(),
            "http://127.0.0.1:9002/v1/deployments/a%2Fb"
        );
    }

    #[test]
    fn test_rejects_non_hierarchical_base() {
        let result = Endpoint::parse("mailto:ops@example.com", "/rules");
        assert!(matches!(result, Err(HarnessError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_invalid_url() {
        assert!(Endpoint::parse("not a url", "/rules").is_err());
    }
}
