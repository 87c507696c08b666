//! In-process transport standing in for the HTTP test server.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream;
use http::{Method, StatusCode};
use serde_json::{Map, Value, json};
use wretch::{
    AbortController, Body, BodyStream, Config, Fetch, FormData, Polyfills, RequestInit, Response,
    TransportError, UrlSearchParams, abortable_body,
};

pub const BASE: &str = "http://localhost:9876";

pub const DUCK: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46, 0x49, 0x46, 0xff, 0xd9];

/// A request as the transport received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub options: Map<String, Value>,
    pub body: Option<Body>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockServer {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> Recorded {
        self.requests().pop().expect("no request was sent")
    }
}

impl Fetch for MockServer {
    fn fetch(&self, url: &str, init: RequestInit) -> BoxFuture<'static, Result<Response, TransportError>> {
        self.requests.lock().unwrap().push(Recorded {
            method: init.method.clone(),
            url: url.to_owned(),
            headers: init.headers.clone(),
            options: init.options.clone(),
            body: init.body.clone(),
        });
        Box::pin(route(url.to_owned(), init))
    }
}

/// Context wired to `server` with the stock form, query and abort primitives.
pub fn config(server: &MockServer) -> Config {
    Config::with_polyfills(
        Polyfills::default()
            .fetch(server.clone())
            .form_data(Arc::new(FormData::new))
            .url_search_params(Arc::new(UrlSearchParams::new))
            .abort_controller(Arc::new(AbortController::new)),
    )
}

fn json_response(status: StatusCode, url: String, value: Value) -> Response {
    Response::new(status, url)
        .header("Content-Type", "application/json")
        .body(value.to_string())
}

fn body_text(init: &RequestInit) -> String {
    init.body
        .as_ref()
        .and_then(Body::as_bytes)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn decode_form(init: &RequestInit) -> Value {
    let mut decoded = Map::new();
    if let Some(Body::Form(form)) = &init.body {
        for (name, value) in form.entries() {
            let value = Value::String(value.as_text().unwrap_or_default().to_owned());
            match decoded.get_mut(name) {
                Some(Value::Array(values)) => values.push(value),
                Some(previous) => *previous = Value::Array(vec![previous.take(), value]),
                None => {
                    decoded.insert(name.clone(), value);
                }
            }
        }
    }
    Value::Object(decoded)
}

async fn route(url: String, init: RequestInit) -> Result<Response, TransportError> {
    let path = url.strip_prefix(BASE).unwrap_or(&url);
    let path = path.split('?').next().unwrap_or_default().to_owned();

    let response = match path.as_str() {
        "/text" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "text/plain")
            .body("A text string"),
        "/json" if init.method == Method::HEAD => {
            Response::new(StatusCode::OK, url).header("Content-Type", "application/json")
        }
        "/json" => json_response(
            StatusCode::OK,
            url,
            json!({ "a": "json", "object": "which", "is": "stringified" }),
        ),
        "/blob" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "image/jpeg")
            .body(DUCK),
        "/arrayBuffer" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "application/octet-stream")
            .body(vec![0x00u8, 0x01, 0x02, 0x03]),
        "/text/roundTrip" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "text/plain")
            .body(body_text(&init)),
        "/json/roundTrip" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "application/json")
            .body(body_text(&init)),
        "/urlencoded/roundTrip" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "text/plain")
            .body(body_text(&init)),
        "/urlencoded/echo" => Response::new(StatusCode::OK, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body_text(&init)),
        "/formData/decode" => json_response(StatusCode::OK, url, decode_form(&init)),
        "/options" => Response::new(StatusCode::OK, url).header("Allow", "OPTIONS"),
        "/customHeaders" => {
            let accepted = init.header("X-Custom-Header-3").is_some()
                && init.header("X-Custom-Header-4").is_some();
            let status = if accepted {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            Response::new(status, url)
        }
        "/accept" => match init.header("Accept") {
            Some("application/json") => json_response(StatusCode::OK, url, json!({ "json": "ok" })),
            _ => Response::new(StatusCode::OK, url).body("text"),
        },
        "/basicauth" => match init.header("Authorization") {
            Some("Basic d3JldGNoOnJvY2tz") => Response::new(StatusCode::OK, url).body("ok"),
            _ => Response::new(StatusCode::UNAUTHORIZED, url).body("Unauthorized"),
        },
        "/json500" => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            url,
            json!({ "error": 500, "message": "ok" }),
        ),
        "/longResult" => {
            let aborted = async {
                match &init.signal {
                    Some(signal) => signal.aborted().await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                () = aborted => return Err(TransportError::abort()),
                () = tokio::time::sleep(Duration::from_secs(1)) => {
                    Response::new(StatusCode::OK, url).body("a long result")
                }
            }
        }
        "/stalledBody" => {
            // Headers right away, the body a second later.
            let body: BodyStream = Box::pin(stream::once(async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, TransportError>(Bytes::from_static(b"a late body"))
            }));
            let body = match init.signal.clone() {
                Some(signal) => abortable_body(body, signal),
                None => body,
            };
            Response::new(StatusCode::OK, url)
                .header("Content-Type", "text/plain")
                .stream(body)
        }
        "/offline" => return Err(TransportError::fetch("request to /offline failed: connection refused")),
        other => match other.trim_start_matches('/').parse::<u16>() {
            Ok(code) => {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Response::new(status, url).body(status.canonical_reason().unwrap_or_default())
            }
            Err(_) => Response::new(StatusCode::NOT_FOUND, url).body("Not Found"),
        },
    };

    Ok(response)
}
