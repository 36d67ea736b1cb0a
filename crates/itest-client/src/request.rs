//! Request and response values exchanged with the transport

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{HarnessError, ParseError};

/// One named part of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Plain text field
    Text { name: String, value: String },
    /// File field
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Field name of this part
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// Request body
///
/// Multipart forms are kept as plain parts and only turned into a
/// `reqwest::multipart::Form` at send time, so a request stays cloneable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

impl Body {
    /// Serialize a model into a JSON body
    pub fn json<T: serde::Serialize>(value: &T) -> crate::Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(HarnessError::Serialize)
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<FormPart>> for Body {
    fn from(parts: Vec<FormPart>) -> Self {
        Self::Multipart(parts)
    }
}

/// A fully formed HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Body,
    /// Overrides the transport's default timeout when set
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: Body::Empty,
            timeout: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A response as received. Non-2xx statuses are ordinary responses.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
    pub headers: HeaderMap,
    pub method: Method,
    pub url: Url,
}

impl Response {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Header value as text, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the body into a model
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ParseError> {
        serde_json::from_str(&self.body).map_err(|e| ParseError {
            resource: short_type_name::<T>(),
            url: self.url.to_string(),
            status: self.status.as_u16(),
            message: e.to_string(),
        })
    }

    /// Fail with [`HarnessError::UnexpectedStatus`] unless the status matches
    pub fn expect_status(&self, expected: StatusCode) -> crate::Result<&Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(HarnessError::UnexpectedStatus {
                expected: expected.as_u16(),
                actual: self.status.as_u16(),
                method: self.method.clone(),
                url: self.url.to_string(),
                body: truncate(&self.body, 512),
            })
        }
    }

    /// Expect 200 and parse the body
    pub fn expect_ok_json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(self.expect_status(StatusCode::OK)?.json()?)
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Thing {
        #[serde(rename = "Id")]
        id: String,
    }

    fn response(status: StatusCode, body: &str) -> Response {
        Response {
            status,
            body: body.to_string(),
            headers: HeaderMap::new(),
            method: Method::GET,
            url: Url::parse("http://localhost:9004/v1/things/1").unwrap(),
        }
    }

    #[test]
    fn test_request_builder() {
        let url = Url::parse("http://localhost/v1/rules").unwrap();
        let request = Request::post(url)
            .header("X-Foo", "Bar")
            .body(serde_json::json!({"Name": "r"}))
            .timeout(Duration::from_secs(1));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers.get("X-Foo").map(String::as_str), Some("Bar"));
        assert!(matches!(request.body, Body::Json(_)));
        assert_eq!(request.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_parse_error_names_model() {
        let err = response(StatusCode::OK, "not json").json::<Thing>().unwrap_err();
        assert_eq!(err.resource, "Thing");
        assert_eq!(err.status, 200);
    }

    #[test]
    fn test_expect_status() {
        let ok = response(StatusCode::OK, r#"{"Id":"a"}"#);
        assert!(ok.expect_status(StatusCode::OK).is_ok());

        let missing = response(StatusCode::NOT_FOUND, "");
        let err = missing.expect_status(StatusCode::OK).unwrap_err();
        assert_eq!(err.kind(), "status");
    }

    #[test]
    fn test_unserializable_body_kind() {
        let mut map = std::collections::BTreeMap::new();
        map.insert((1u8, 2u8), "tuple keys have no JSON form");

        let err = Body::json(&map).unwrap_err();
        assert!(matches!(err, HarnessError::Serialize(_)));
        assert_eq!(err.kind(), "serialize");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate(&text, 5);
        assert!(cut.ends_with("..."));
    }
}
