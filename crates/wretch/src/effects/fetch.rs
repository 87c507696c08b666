use std::future::Future;

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream;

use crate::data::{AbortSignal, BodyStream, RequestInit, Response};
use crate::error::TransportError;

/// Asynchronous transport abstraction, the `fetch` primitive.
///
/// An implementation performs the network exchange for one request and
/// nothing more: status classification, catchers and body parsing happen in
/// the response chain. Implementations must observe
/// [`RequestInit::signal`] and settle with an
/// [`ErrorKind::Abort`](crate::ErrorKind::Abort) error once it is aborted.
///
/// # Implementations
///
/// - [`ReqwestFetch`]: production implementation using `reqwest`
/// - Any `Fn(String, RequestInit) -> impl Future<Output = Result<Response, TransportError>>`
pub trait Fetch: Send + Sync {
    /// Perform one request.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute or relative URL, query string included
    /// * `init` - Method, headers, body, signal and the remaining options
    ///
    /// # Returns
    ///
    /// The response once its status and headers are known. The body is read
    /// lazily from the returned stream.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Abort`](crate::ErrorKind::Abort) when the signal
    /// fires before the response settles, and
    /// [`ErrorKind::Fetch`](crate::ErrorKind::Fetch) when the exchange itself
    /// fails. Body chunks carry the same errors once the headers are in.
    fn fetch(&self, url: &str, init: RequestInit) -> BoxFuture<'static, Result<Response, TransportError>>;
}

impl<F, Fut> Fetch for F
where
    F: Fn(String, RequestInit) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, TransportError>> + Send + 'static,
{
    fn fetch(&self, url: &str, init: RequestInit) -> BoxFuture<'static, Result<Response, TransportError>> {
        Box::pin(self(url.to_owned(), init))
    }
}

/// Cut `body` short once `signal` fires.
///
/// The stream yields a single abort error in place of the next chunk and
/// then ends. Transports use it to keep honoring the signal after the
/// headers have arrived.
pub fn abortable_body(body: BodyStream, signal: AbortSignal) -> BodyStream {
    Box::pin(stream::unfold(Some((body, signal)), |state| async move {
        let Some((mut body, signal)) = state else {
            return None;
        };
        tokio::select! {
            biased;
            () = signal.aborted() => Some((Err(TransportError::abort()), None)),
            chunk = body.next() => chunk.map(|chunk| (chunk, Some((body, signal)))),
        }
    }))
}

#[cfg(feature = "reqwest")]
mod reqwest_fetch {
    use super::*;
    use futures_util::TryStreamExt;
    use reqwest::Client;
    use reqwest::multipart::{Form, Part};

    use crate::data::{Body, FormData, FormValue};

    /// Production transport implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestFetch {
        client: Client,
    }

    impl ReqwestFetch {
        pub fn new() -> Result<Self, reqwest::Error> {
            let client = Client::builder().build()?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    impl Fetch for ReqwestFetch {
        fn fetch(&self, url: &str, init: RequestInit) -> BoxFuture<'static, Result<Response, TransportError>> {
            let client = self.client.clone();
            let url = url.to_owned();
            Box::pin(async move {
                match init.signal.clone() {
                    Some(signal) => tokio::select! {
                        settled = send(client, url, init) => settled,
                        () = signal.aborted() => Err(TransportError::abort()),
                    },
                    None => send(client, url, init).await,
                }
            })
        }
    }

    fn map_error(e: reqwest::Error) -> TransportError {
        TransportError::fetch(e.to_string()).with_source(e)
    }

    async fn send(client: Client, url: String, init: RequestInit) -> Result<Response, TransportError> {
        let signal = init.signal.clone();
        let is_form = matches!(init.body, Some(Body::Form(_)));
        let mut request = client.request(init.method, &url);

        for (key, value) in &init.headers {
            // reqwest appends its own boundary-carrying content type.
            if is_form && key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            request = request.header(key, value);
        }

        request = match init.body {
            Some(Body::Text(text)) => request.body(text),
            Some(Body::Bytes(bytes)) => request.body(bytes),
            Some(Body::Form(form)) => request.multipart(multipart(form)?),
            None => request,
        };

        let response = request.send().await.map_err(map_error)?;
        let status = response.status();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(key, value)| {
                (
                    key.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let mut body: BodyStream = Box::pin(response.bytes_stream().map_err(map_error));
        if let Some(signal) = signal {
            body = abortable_body(body, signal);
        }

        Ok(Response::new(status, url).headers(headers).stream(body))
    }

    fn multipart(form: FormData) -> Result<Form, TransportError> {
        let mut out = Form::new();
        for (name, value) in form.into_entries() {
            out = match value {
                FormValue::Text(text) => out.text(name, text),
                FormValue::File {
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = Part::bytes(bytes.to_vec());
                    if let Some(file_name) = file_name {
                        part = part.file_name(file_name);
                    }
                    if let Some(content_type) = content_type {
                        part = part.mime_str(&content_type).map_err(map_error)?;
                    }
                    out.part(name, part)
                }
            };
        }
        Ok(out)
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_fetch::ReqwestFetch;
