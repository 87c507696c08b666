use http::Method;
use serde_json::{Map, Value};

use super::abort::AbortSignal;
use super::body::Body;

/// Fully merged options handed to the transport for one request.
#[derive(Debug, Clone)]
pub struct RequestInit {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub signal: Option<AbortSignal>,
    /// Remaining transport options (credentials, mode, cache, ...), with
    /// `headers` and `method` already lifted out.
    pub options: Map<String, Value>,
}

impl RequestInit {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
            signal: None,
            options: Map::new(),
        }
    }

    /// Last value set for a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
