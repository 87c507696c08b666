use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use http::StatusCode;
use serde::de::DeserializeOwned;

use super::body::FormData;
use crate::core::is_ok;
use crate::error::TransportError;

/// Streamed response body as produced by a transport.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Response produced by a [`Fetch`](crate::Fetch) transport.
///
/// Every body reader consumes the response, so the body can be read only
/// once.
pub struct Response {
    status: StatusCode,
    url: String,
    headers: Vec<(String, String)>,
    body: BodyStream,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &"{ ... }")
            .finish()
    }
}

impl Response {
    /// Create a response with an empty body.
    pub fn new(status: StatusCode, url: impl Into<String>) -> Self {
        Self {
            status,
            url: url.into(),
            headers: Vec::new(),
            body: stream::empty().boxed(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let chunk: Result<Bytes, TransportError> = Ok(body.into());
        self.body = stream::once(futures_util::future::ready(chunk)).boxed();
        self
    }

    #[must_use]
    pub fn stream(mut self, body: BodyStream) -> Self {
        self.body = body;
        self
    }

    pub fn ok(&self) -> bool {
        is_ok(self.status)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header_list(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub async fn bytes(self) -> Result<Bytes, TransportError> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            TransportError::fetch("response body is not valid UTF-8").with_source(e)
        })
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, TransportError> {
        let url = self.url.clone();
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            TransportError::fetch(format!("invalid json response body at {url}: {e}")).with_source(e)
        })
    }

    pub async fn blob(self) -> Result<Blob, TransportError> {
        let content_type = self.get_header("content-type").map(str::to_owned);
        let bytes = self.bytes().await?;
        Ok(Blob {
            bytes,
            content_type,
        })
    }

    pub async fn array_buffer(self) -> Result<Bytes, TransportError> {
        self.bytes().await
    }

    /// Decode a url-encoded form body. Multipart response bodies are
    /// rejected.
    pub async fn form_data(self) -> Result<FormData, TransportError> {
        let content_type = self.get_header("content-type").unwrap_or_default();
        if !content_type.starts_with("application/x-www-form-urlencoded") {
            return Err(TransportError::fetch(format!(
                "cannot decode form data from content type '{content_type}'"
            )));
        }
        let bytes = self.bytes().await?;
        Ok(FormData::parse_urlencoded(&bytes))
    }
}

/// Binary body together with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
