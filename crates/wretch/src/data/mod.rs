//! Value types shared by the builder, the transport and the response chain.
//!
//! None of these types perform I/O on their own. Body readers on
//! [`Response`] only drain a stream the transport already produced.

pub mod abort;
pub mod body;
pub mod catcher;
pub mod params;
pub mod request;
pub mod response;

pub use abort::{AbortController, AbortSignal};
pub use body::{Body, FormData, FormUrl, FormValue};
pub use catcher::{CatchKey, Catcher, Catchers};
pub use params::UrlSearchParams;
pub use request::RequestInit;
pub use response::{Blob, BodyStream, Response};

/// How the body of a failed response is captured on the status error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorType {
    #[default]
    Text,
    Json,
}
