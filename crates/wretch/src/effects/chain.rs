//! Response handler chain: catcher registration, dispatch and body terminals.
//!
//! A [`ResponseChain`] is returned by the builder verbs. The transport runs
//! only when a terminal is awaited, so the chain can still attach a timeout
//! or expose its abort controller beforehand.
//!
//! Each dispatch settles in one of three ways:
//!
//! 1. The transport fails: the error is looked up by its kind.
//! 2. The status is outside `200..=299`: an [`HttpError`] is built from the
//!    response and looked up by its status.
//! 3. The terminal reads the body. Read and decode failures are
//!    `FetchError` transport errors and follow the first path.
//!
//! A failed lookup falls back to the `"*"` catcher. Errors outside these
//! paths, like a custom `res_with` transform failing, are never looked up.
//! At most one catcher runs per dispatch; when it returns `Ok(())` the
//! terminal yields `Ok(None)`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::config::{Config, Constructor};
use super::fetch::Fetch;
use super::perf::{PerfCallback, Performance, PerformanceEntry};
use crate::core::error_message;
use crate::data::{
    AbortController, Blob, CatchKey, Catchers, ErrorType, FormData, RequestInit, Response,
};
use crate::error::{Error, HttpError, Result};

/// Pending request plus the handlers its outcome is dispatched to.
pub struct ResponseChain {
    fetch: Arc<dyn Fetch>,
    url: String,
    init: RequestInit,
    controller: Option<AbortController>,
    make_controller: Option<Constructor<AbortController>>,
    catchers: Catchers,
    global: Catchers,
    error_type: ErrorType,
    performance: Option<Arc<dyn Performance>>,
    perfs: Option<PerfCallback>,
    timeout: Option<Duration>,
}

impl fmt::Debug for ResponseChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseChain")
            .field("url", &self.url)
            .field("method", &self.init.method)
            .field("catchers", &self.catchers)
            .field("global", &self.global)
            .field("error_type", &self.error_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ResponseChain {
    pub(crate) fn new(
        fetch: Arc<dyn Fetch>,
        url: String,
        init: RequestInit,
        controller: Option<AbortController>,
        catchers: Catchers,
        config: &Config,
    ) -> Self {
        Self {
            fetch,
            url,
            init,
            controller,
            make_controller: config.abort_controller(),
            catchers,
            global: config.catchers(),
            error_type: config.error_type(),
            performance: config.performance(),
            perfs: None,
            timeout: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request the transport will receive.
    pub fn request(&self) -> &RequestInit {
        &self.init
    }

    /// Register `catcher` for `key`, replacing any catcher this chain already
    /// holds for it.
    #[must_use]
    pub fn error<K, F>(mut self, key: K, catcher: F) -> Self
    where
        K: Into<CatchKey>,
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.catchers.insert(key.into(), Arc::new(catcher));
        self
    }

    #[must_use]
    pub fn bad_request<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::BAD_REQUEST, catcher)
    }

    #[must_use]
    pub fn unauthorized<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::UNAUTHORIZED, catcher)
    }

    #[must_use]
    pub fn forbidden<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::FORBIDDEN, catcher)
    }

    #[must_use]
    pub fn not_found<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::NOT_FOUND, catcher)
    }

    /// Catcher for a `408 Request Timeout` response. Client-side timeouts
    /// set with [`set_timeout`](Self::set_timeout) surface as aborts.
    #[must_use]
    pub fn timeout<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::TIMEOUT, catcher)
    }

    #[must_use]
    pub fn internal_error<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::INTERNAL_ERROR, catcher)
    }

    #[must_use]
    pub fn on_abort<F>(self, catcher: F) -> Self
    where
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.error(CatchKey::ABORT_ERROR, catcher)
    }

    /// Deliver the timing entry of this request to `callback` once it is
    /// recorded. Without a registered performance primitive the callback
    /// never fires.
    ///
    /// There is no callback-less form: leaving the call out is that form.
    /// The request is then still measured and its entry waits in the
    /// timeline's bounded buffer.
    #[must_use]
    pub fn perfs<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(PerformanceEntry) + Send + 'static,
    {
        self.perfs = Some(Box::new(callback));
        self
    }

    /// Abort the request when it has not settled after `timeout`, response
    /// body included.
    #[must_use]
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.attach_controller();
        self.timeout = Some(timeout);
        self
    }

    /// Controller bound to this request, created on demand.
    pub fn controller(mut self) -> (AbortController, Self) {
        let controller = self.attach_controller();
        (controller, self)
    }

    fn attach_controller(&mut self) -> AbortController {
        if let Some(controller) = &self.controller {
            return controller.clone();
        }
        let controller = self
            .make_controller
            .as_ref()
            .map_or_else(AbortController::new, |constructor| constructor());
        self.init.signal = Some(controller.signal());
        self.controller = Some(controller.clone());
        controller
    }

    pub async fn res(self) -> Result<Option<Response>> {
        self.res_with(|response| async move { Ok::<_, Error>(response) })
            .await
    }

    pub async fn text(self) -> Result<Option<String>> {
        self.res_with(|response| async move { Ok::<_, Error>(response.text().await?) })
            .await
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<Option<T>> {
        self.res_with(|response| async move { Ok::<_, Error>(response.json::<T>().await?) })
            .await
    }

    pub async fn blob(self) -> Result<Option<Blob>> {
        self.res_with(|response| async move { Ok::<_, Error>(response.blob().await?) })
            .await
    }

    pub async fn array_buffer(self) -> Result<Option<Bytes>> {
        self.res_with(|response| async move { Ok::<_, Error>(response.array_buffer().await?) })
            .await
    }

    pub async fn form_data(self) -> Result<Option<FormData>> {
        self.res_with(|response| async move { Ok::<_, Error>(response.form_data().await?) })
            .await
    }

    /// Dispatch and run `transform` over a successful response.
    ///
    /// A timeout set with [`set_timeout`](Self::set_timeout) covers the whole
    /// exchange, body reads in `transform` included.
    ///
    /// # Errors
    ///
    /// Status and transport errors go through the catchers; `Ok(None)` means
    /// one absorbed the failure. Any other error returned by `transform`,
    /// such as [`Error::Serialize`], skips the catchers, the `"*"` one
    /// included, and is returned as is.
    pub async fn res_with<T, F, Fut>(self, transform: F) -> Result<Option<T>>
    where
        F: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let catchers = self.global.overridden_by(&self.catchers);
        let url = self.url.clone();
        let deadline = self.timeout.zip(self.controller.clone());

        let exchange = self.exchange(transform);
        tokio::pin!(exchange);
        let outcome = match deadline {
            Some((timeout, controller)) => tokio::select! {
                outcome = &mut exchange => outcome,
                () = tokio::time::sleep(timeout) => {
                    debug!(url = %url, ?timeout, "request timed out");
                    controller.abort();
                    exchange.await
                }
            },
            None => exchange.await,
        };

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(error) => match catchers.find(&error) {
                Some((key, catcher)) => {
                    debug!(%key, %error, url = %url, "catcher fired");
                    catcher(error).map(|()| None)
                }
                None => {
                    debug!(%error, url = %url, "no catcher matched");
                    Err(error)
                }
            },
        }
    }

    async fn exchange<T, F, Fut>(self, transform: F) -> Result<T>
    where
        F: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        debug!(method = %self.init.method, url = %self.url, "sending request");
        let response = self.fetch.fetch(&self.url, self.init).await?;

        if let (Some(performance), Some(callback)) = (self.performance, self.perfs) {
            performance.observe(response.url(), callback);
        }
        trace!(status = %response.status(), url = response.url(), "response received");

        if !response.ok() {
            return Err(status_error(response, self.error_type).await);
        }
        transform(response).await
    }
}

/// Capture a non-ok response as a status error, body included.
async fn status_error(response: Response, error_type: ErrorType) -> Error {
    let status = response.status();
    let url = response.url().to_owned();
    let headers = response.header_list().to_vec();

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return e.into(),
    };
    let (text, json) = match error_type {
        ErrorType::Text => (Some(body), None),
        ErrorType::Json => match serde_json::from_str(&body) {
            Ok(json) => (None, Some(json)),
            Err(_) => (Some(body), None),
        },
    };

    HttpError {
        status,
        message: error_message(status),
        text,
        json,
        url,
        headers,
    }
    .into()
}
