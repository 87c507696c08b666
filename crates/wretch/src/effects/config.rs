//! Configuration context: runtime primitive registry, defaults and the
//! global catcher store.
//!
//! # Architecture
//!
//! Every [`Wretcher`] carries a handle to the [`Config`] it was created
//! from. [`Config::global`] is the lazily created process-wide context used
//! by [`wretch`](crate::wretch). Tests and embedders can build their own
//! context with [`Config::new`] and avoid shared state altogether.
//!
//! The context is meant to be configured during initialization. Writes are
//! serialized by a lock, but requests already built keep the defaults they
//! snapshotted.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::debug;

use super::fetch::Fetch;
use super::perf::Performance;
use super::wretcher::Wretcher;
use crate::core::mix;
use crate::data::{AbortController, CatchKey, Catchers, ErrorType, FormData, UrlSearchParams};
use crate::error::{Error, Result};

/// Constructor registered for a runtime primitive.
pub type Constructor<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Set of pluggable runtime primitives.
///
/// Unset entries are looked up lazily: the transport, `FormData` and
/// `URLSearchParams` fail with [`Error::MissingPolyfill`] when first needed,
/// while the abort controller and the timing primitives are optional.
#[derive(Clone, Default)]
pub struct Polyfills {
    pub fetch: Option<Arc<dyn Fetch>>,
    pub form_data: Option<Constructor<FormData>>,
    pub url_search_params: Option<Constructor<UrlSearchParams>>,
    pub abort_controller: Option<Constructor<AbortController>>,
    pub performance: Option<Arc<dyn Performance>>,
}

impl fmt::Debug for Polyfills {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polyfills")
            .field("fetch", &self.fetch.is_some())
            .field("form_data", &self.form_data.is_some())
            .field("url_search_params", &self.url_search_params.is_some())
            .field("abort_controller", &self.abort_controller.is_some())
            .field("performance", &self.performance.is_some())
            .finish()
    }
}

impl Polyfills {
    /// Built-in primitives: the reqwest transport (with the `reqwest`
    /// feature), the stock `FormData`, `URLSearchParams` and abort
    /// controller. Timing primitives are left unset.
    pub fn standard() -> Self {
        let polyfills = Self::default()
            .form_data(Arc::new(FormData::new))
            .url_search_params(Arc::new(UrlSearchParams::new))
            .abort_controller(Arc::new(AbortController::new));

        #[cfg(feature = "reqwest")]
        let polyfills = match super::fetch::ReqwestFetch::new() {
            Ok(client) => polyfills.fetch(client),
            Err(e) => {
                tracing::warn!(error = %e, "reqwest transport unavailable");
                polyfills
            }
        };

        polyfills
    }

    #[must_use]
    pub fn fetch(mut self, fetch: impl Fetch + 'static) -> Self {
        self.fetch = Some(Arc::new(fetch));
        self
    }

    #[must_use]
    pub fn form_data(mut self, constructor: Constructor<FormData>) -> Self {
        self.form_data = Some(constructor);
        self
    }

    #[must_use]
    pub fn url_search_params(mut self, constructor: Constructor<UrlSearchParams>) -> Self {
        self.url_search_params = Some(constructor);
        self
    }

    #[must_use]
    pub fn abort_controller(mut self, constructor: Constructor<AbortController>) -> Self {
        self.abort_controller = Some(constructor);
        self
    }

    #[must_use]
    pub fn performance(mut self, performance: Arc<dyn Performance>) -> Self {
        self.performance = Some(performance);
        self
    }

    /// Lay every set entry of `other` over `self`.
    fn merge(&mut self, other: Polyfills) {
        if other.fetch.is_some() {
            self.fetch = other.fetch;
        }
        if other.form_data.is_some() {
            self.form_data = other.form_data;
        }
        if other.url_search_params.is_some() {
            self.url_search_params = other.url_search_params;
        }
        if other.abort_controller.is_some() {
            self.abort_controller = other.abort_controller;
        }
        if other.performance.is_some() {
            self.performance = other.performance;
        }
    }
}

struct ConfigState {
    defaults: Value,
    error_type: ErrorType,
    polyfills: Polyfills,
    catchers: Catchers,
}

impl ConfigState {
    fn new(polyfills: Polyfills) -> Self {
        Self {
            defaults: Value::Object(Map::new()),
            error_type: ErrorType::default(),
            polyfills,
            catchers: Catchers::new(),
        }
    }
}

/// Shared configuration context.
///
/// Cloning is cheap and every clone sees the same state.
#[derive(Clone)]
pub struct Config {
    inner: Arc<RwLock<ConfigState>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Config")
            .field("defaults", &state.defaults)
            .field("error_type", &state.error_type)
            .field("polyfills", &state.polyfills)
            .field("catchers", &state.catchers)
            .finish()
    }
}

static GLOBAL: Lazy<Config> = Lazy::new(Config::standard);

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Empty context: no defaults, no catchers, no primitives.
    pub fn new() -> Self {
        Self::with_polyfills(Polyfills::default())
    }

    /// Context preloaded with [`Polyfills::standard`].
    pub fn standard() -> Self {
        Self::with_polyfills(Polyfills::standard())
    }

    pub fn with_polyfills(polyfills: Polyfills) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConfigState::new(polyfills))),
        }
    }

    /// The process-wide context.
    pub fn global() -> Config {
        GLOBAL.clone()
    }

    /// Start a request builder bound to this context.
    pub fn wretch(&self, url: impl Into<String>) -> Wretcher {
        Wretcher::new(self.clone(), url.into(), Value::Object(Map::new()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ConfigState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConfigState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the default options, or mix them into the current ones when
    /// `mixin` is true.
    pub fn set_defaults(&self, defaults: Value, mixin: bool) -> &Self {
        let mut state = self.write();
        state.defaults = if mixin {
            mix(&state.defaults, &defaults, false)
        } else {
            defaults
        };
        debug!(defaults = %state.defaults, "defaults updated");
        self
    }

    pub fn defaults(&self) -> Value {
        self.read().defaults.clone()
    }

    pub fn set_error_type(&self, error_type: ErrorType) -> &Self {
        self.write().error_type = error_type;
        self
    }

    pub fn error_type(&self) -> ErrorType {
        self.read().error_type
    }

    /// Register runtime primitives. Set entries are merged into the
    /// registry, or the registry is swapped wholesale when `replace` is
    /// true.
    pub fn set_polyfills(&self, polyfills: Polyfills, replace: bool) -> &Self {
        let mut state = self.write();
        if replace {
            state.polyfills = polyfills;
        } else {
            state.polyfills.merge(polyfills);
        }
        debug!(polyfills = ?state.polyfills, replace, "polyfills registered");
        self
    }

    /// Register a catcher in the global store. Catchers registered on a
    /// builder or a response chain take precedence for the same key.
    pub fn catcher<K, F>(&self, key: K, catcher: F) -> &Self
    where
        K: Into<CatchKey>,
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        self.write().catchers.insert(key.into(), Arc::new(catcher));
        self
    }

    pub fn catchers(&self) -> Catchers {
        self.read().catchers.clone()
    }

    /// Drop defaults and global catchers and restore the text error type.
    /// Registered primitives are kept.
    pub fn reset(&self) {
        let mut state = self.write();
        let polyfills = std::mem::take(&mut state.polyfills);
        *state = ConfigState::new(polyfills);
    }

    /// The registered transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPolyfill`] when no `fetch` primitive is
    /// registered.
    pub fn fetch(&self) -> Result<Arc<dyn Fetch>> {
        self.read()
            .polyfills
            .fetch
            .clone()
            .ok_or(Error::MissingPolyfill("fetch"))
    }

    /// A fresh, empty `FormData` from the registered constructor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPolyfill`] when no `FormData` constructor is
    /// registered.
    pub fn form_data(&self) -> Result<FormData> {
        let constructor = self
            .read()
            .polyfills
            .form_data
            .clone()
            .ok_or(Error::MissingPolyfill("FormData"))?;
        Ok(constructor())
    }

    /// A fresh, empty `UrlSearchParams` from the registered constructor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPolyfill`] when no `URLSearchParams`
    /// constructor is registered.
    pub fn url_search_params(&self) -> Result<UrlSearchParams> {
        let constructor = self
            .read()
            .polyfills
            .url_search_params
            .clone()
            .ok_or(Error::MissingPolyfill("URLSearchParams"))?;
        Ok(constructor())
    }

    pub fn abort_controller(&self) -> Option<Constructor<AbortController>> {
        self.read().polyfills.abort_controller.clone()
    }

    pub fn performance(&self) -> Option<Arc<dyn Performance>> {
        self.read().polyfills.performance.clone()
    }
}
