//! Fluent, immutable HTTP request builder with status-code catchers.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Request, response and catcher value types
//! - `core` - Pure transformations: option merging, encoders, status checks
//! - `effects` - Transport trait, configuration context, builder and dispatch
//!
//! # Key Features
//!
//! - **Immutable Builder**: every [`Wretcher`] method returns a new builder
//! - **Deferred Merge**: option trees are merged only at dispatch time
//! - **Catcher Chain**: failures are routed to handlers by status, error kind
//!   or the `"*"` wildcard, with global, builder and per-request layers
//! - **Pluggable Primitives**: the transport, form containers, abort
//!   controllers and the timing primitive are registered on a [`Config`]
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> wretch::Result<()> {
//! use serde_json::{Value, json};
//!
//! let created: Option<Value> = wretch::wretch("https://example.test/items")
//!     .json(&json!({ "name": "duck" }))?
//!     .post()?
//!     .unauthorized(|_| Ok(()))
//!     .json()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod core;
mod data;
mod effects;
mod error;

pub use self::core::{error_message, form_url, is_ok, mix, param_pairs};
pub use data::{
    AbortController, AbortSignal, Blob, Body, BodyStream, CatchKey, Catcher, Catchers, ErrorType,
    FormData, FormUrl, FormValue, RequestInit, Response, UrlSearchParams,
};
pub use effects::{
    Config, Constructor, Fetch, PerfCallback, Performance, PerformanceEntry, Polyfills, Resolver,
    ResponseChain, Timed, Timeline, Wretcher, abortable_body, wretch,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestFetch;

pub use error::{Error, ErrorKind, HttpError, Result, TransportError};
