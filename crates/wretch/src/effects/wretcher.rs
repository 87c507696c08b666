use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::chain::ResponseChain;
use super::config::Config;
use crate::core::{form_url, mix, param_pairs, stringify};
use crate::data::{
    AbortController, Body, CatchKey, Catchers, FormUrl, FormValue, RequestInit,
};
use crate::error::{Error, Result};

/// Middleware run against every response chain a builder produces.
pub type Resolver = Arc<dyn Fn(ResponseChain) -> ResponseChain + Send + Sync>;

/// Option tree recorded by a builder and merged only at dispatch time.
#[derive(Debug, Clone)]
enum OptionsPatch {
    Mix { tree: Value, concat: bool },
    Replace(Value),
}

/// Immutable request builder.
///
/// Every method returns a new builder and leaves the receiver untouched, so
/// a configured builder can be shared and reused as the base of many
/// requests. The verb methods dispatch and hand back a [`ResponseChain`].
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> wretch::Result<()> {
/// use serde_json::Value;
///
/// let api = wretch::wretch("https://example.test/api")
///     .accept("application/json")
///     .auth("Bearer token");
///
/// let user: Option<Value> = api
///     .url("/users/1", false)
///     .get()?
///     .not_found(|_| Ok(()))
///     .json()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Wretcher {
    config: Config,
    url: String,
    options: Value,
    patches: Vec<OptionsPatch>,
    body: Option<Body>,
    controller: Option<AbortController>,
    catchers: Catchers,
    resolvers: Vec<Resolver>,
}

impl fmt::Debug for Wretcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wretcher")
            .field("url", &self.url)
            .field("options", &self.options_tree())
            .field("body", &self.body)
            .field("catchers", &self.catchers)
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

/// Start a request builder on the process-wide [`Config`].
pub fn wretch(url: impl Into<String>) -> Wretcher {
    Config::global().wretch(url)
}

impl Wretcher {
    /// Snapshot the context defaults and lay `options` on top.
    pub(crate) fn new(config: Config, url: String, options: Value) -> Self {
        let options = mix(&config.defaults(), &options, false);
        Self {
            config,
            url,
            options,
            patches: Vec::new(),
            body: None,
            controller: None,
            catchers: Catchers::new(),
            resolvers: Vec::new(),
        }
    }

    /// Builder on the process-wide context, seeded with `options`.
    pub fn with_options(url: impl Into<String>, options: Value) -> Self {
        Self::new(Config::global(), url.into(), options)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_url(&self) -> &str {
        &self.url
    }

    /// Options as they would be sent, minus call-time options.
    pub fn options_tree(&self) -> Value {
        self.patches
            .iter()
            .fold(self.options.clone(), |tree, patch| match patch {
                OptionsPatch::Mix { tree: extra, concat } => mix(&tree, extra, *concat),
                OptionsPatch::Replace(tree) => tree.clone(),
            })
    }

    fn patched(&self, patch: OptionsPatch) -> Self {
        let mut next = self.clone();
        next.patches.push(patch);
        next
    }

    /// Append `url` to the current one, or replace it.
    ///
    /// When appending, an existing query string stays at the end.
    pub fn url(&self, url: &str, replace: bool) -> Self {
        let mut next = self.clone();
        next.url = if replace || self.url.is_empty() {
            url.to_owned()
        } else {
            match self.url.split_once('?') {
                Some((base, query)) => format!("{base}{url}?{query}"),
                None => format!("{}{url}", self.url),
            }
        };
        next
    }

    /// Replace the query string with `params`.
    ///
    /// `params` must serialize to an object. Array values repeat their key.
    pub fn query<T: Serialize + ?Sized>(&self, params: &T) -> Result<Self> {
        let mut search = self.config.url_search_params()?;
        for (key, value) in param_pairs(&serde_json::to_value(params)?)? {
            search.append(key, value);
        }

        let base = self.url.split_once('?').map_or(self.url.as_str(), |(base, _)| base);
        let mut next = self.clone();
        next.url = if search.is_empty() {
            base.to_owned()
        } else {
            format!("{base}?{search}")
        };
        Ok(next)
    }

    /// Defer merging `tree` into the options until dispatch.
    pub fn options(&self, tree: Value, concat: bool) -> Self {
        self.patched(OptionsPatch::Mix { tree, concat })
    }

    /// Defer replacing every option gathered so far with `tree`.
    pub fn replace_options(&self, tree: Value) -> Self {
        self.patched(OptionsPatch::Replace(tree))
    }

    /// Merge `headers`, an object of header names to values, into the
    /// request headers. Later values win per name; non-string values are
    /// sent in their JSON form.
    pub fn headers(&self, headers: Value) -> Self {
        self.options(json!({ "headers": headers }), false)
    }

    pub fn header(&self, name: &str, value: &str) -> Self {
        let mut headers = Map::new();
        headers.insert(name.to_owned(), Value::String(value.to_owned()));
        self.headers(Value::Object(headers))
    }

    pub fn accept(&self, accept: &str) -> Self {
        self.header("Accept", accept)
    }

    pub fn content(&self, content_type: &str) -> Self {
        self.header("Content-Type", content_type)
    }

    pub fn auth(&self, authorization: &str) -> Self {
        self.header("Authorization", authorization)
    }

    pub fn body(&self, body: impl Into<Body>) -> Self {
        let mut next = self.clone();
        next.body = Some(body.into());
        next
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self> {
        let body = serde_json::to_string(value)?;
        Ok(self.content("application/json").body(body))
    }

    /// Send a url-encoded form body. Strings are sent as given, objects are
    /// encoded key by key.
    pub fn form_url(&self, input: impl Into<FormUrl>) -> Result<Self> {
        let body = match input.into() {
            FormUrl::Encoded(encoded) => encoded,
            FormUrl::Fields(fields) => form_url(&fields)?,
        };
        Ok(self.content("application/x-www-form-urlencoded").body(body))
    }

    /// Send a multipart body built from the fields of `fields`.
    ///
    /// Array values append one entry per element.
    pub fn form_data<T: Serialize + ?Sized>(&self, fields: &T) -> Result<Self> {
        let mut form = self.config.form_data()?;
        for (name, value) in param_pairs(&serde_json::to_value(fields)?)? {
            form.append(name, FormValue::Text(value));
        }
        Ok(self.content("multipart/form-data").body(form))
    }

    /// Attach an existing controller; aborting it cancels the request.
    pub fn signal(&self, controller: &AbortController) -> Self {
        let mut next = self.clone();
        next.controller = Some(controller.clone());
        next
    }

    /// Create a controller and return it with a builder bound to it.
    pub fn controller(&self) -> (AbortController, Self) {
        let controller = self
            .config
            .abort_controller()
            .map_or_else(AbortController::new, |constructor| constructor());
        let next = self.signal(&controller);
        (controller, next)
    }

    /// Register a catcher carried by this builder and every builder derived
    /// from it.
    pub fn catcher<K, F>(&self, key: K, catcher: F) -> Self
    where
        K: Into<CatchKey>,
        F: Fn(Error) -> Result<()> + Send + Sync + 'static,
    {
        let mut next = self.clone();
        next.catchers.insert(key.into(), Arc::new(catcher));
        next
    }

    /// Register a resolver run on each response chain before it is
    /// returned. Resolvers run in registration order. `clear` drops the
    /// resolvers registered so far.
    pub fn resolve<F>(&self, resolver: F, clear: bool) -> Self
    where
        F: Fn(ResponseChain) -> ResponseChain + Send + Sync + 'static,
    {
        let mut next = self.clone();
        if clear {
            next.resolvers.clear();
        }
        next.resolvers.push(Arc::new(resolver));
        next
    }

    /// Dispatch with `method`, laying `call_options` over everything else.
    ///
    /// The transport is not invoked yet: it runs when a terminal of the
    /// returned chain is awaited. Registered resolvers are applied in order.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method, overriding any `method` option
    /// * `call_options` - Options merged last, `Value::Null` for none
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPolyfill`](crate::Error::MissingPolyfill) when
    /// the context has no `fetch` primitive.
    pub fn method(&self, method: Method, call_options: Value) -> Result<ResponseChain> {
        let fetch = self.config.fetch()?;

        let tree = mix(&self.options_tree(), &call_options, false);
        let mut init = RequestInit::new(method);
        if let Value::Object(mut options) = tree {
            if let Some(Value::Object(headers)) = options.remove("headers") {
                init.headers = headers
                    .iter()
                    .map(|(name, value)| (name.clone(), stringify(value)))
                    .collect();
            }
            options.remove("method");
            init.options = options;
        }
        init.body = self.body.clone();

        let controller = self.controller.clone().or_else(|| {
            self.config
                .abort_controller()
                .map(|constructor| constructor())
        });
        init.signal = controller.as_ref().map(AbortController::signal);

        debug!(method = %init.method, url = %self.url, "dispatching request");
        let chain = ResponseChain::new(
            fetch,
            self.url.clone(),
            init,
            controller,
            self.catchers.clone(),
            &self.config,
        );
        Ok(self
            .resolvers
            .iter()
            .fold(chain, |chain, resolver| resolver(chain)))
    }

    /// Dispatch a `GET` request. See [`method`](Self::method).
    pub fn get(&self) -> Result<ResponseChain> {
        self.method(Method::GET, Value::Null)
    }

    /// Dispatch a `GET` request with call-time `options`.
    pub fn get_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::GET, options)
    }

    /// Dispatch a `PUT` request. See [`method`](Self::method).
    pub fn put(&self) -> Result<ResponseChain> {
        self.method(Method::PUT, Value::Null)
    }

    /// Dispatch a `PUT` request with call-time `options`.
    pub fn put_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::PUT, options)
    }

    /// Dispatch a `PATCH` request. See [`method`](Self::method).
    pub fn patch(&self) -> Result<ResponseChain> {
        self.method(Method::PATCH, Value::Null)
    }

    /// Dispatch a `PATCH` request with call-time `options`.
    pub fn patch_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::PATCH, options)
    }

    /// Dispatch a `POST` request. See [`method`](Self::method).
    pub fn post(&self) -> Result<ResponseChain> {
        self.method(Method::POST, Value::Null)
    }

    /// Dispatch a `POST` request with call-time `options`.
    pub fn post_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::POST, options)
    }

    /// Dispatch a `DELETE` request. See [`method`](Self::method).
    pub fn delete(&self) -> Result<ResponseChain> {
        self.method(Method::DELETE, Value::Null)
    }

    /// Dispatch a `DELETE` request with call-time `options`.
    pub fn delete_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::DELETE, options)
    }

    /// Dispatch a `HEAD` request. See [`method`](Self::method).
    pub fn head(&self) -> Result<ResponseChain> {
        self.method(Method::HEAD, Value::Null)
    }

    /// Dispatch a `HEAD` request with call-time `options`.
    pub fn head_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::HEAD, options)
    }

    /// Dispatch a `OPTIONS` request. See [`method`](Self::method).
    pub fn opts(&self) -> Result<ResponseChain> {
        self.method(Method::OPTIONS, Value::Null)
    }

    /// Dispatch a `OPTIONS` request with call-time `options`.
    pub fn opts_with(&self, options: Value) -> Result<ResponseChain> {
        self.method(Method::OPTIONS, options)
    }
}
