//! Handler of batch requests.
//!
//! [`FetcherBuilder`] collects the transport configuration, [`Fetcher`] turns
//! an iterator of work items into a [`Batch`], and [`Batch::send`] starts the
//! bounded pool.
#![allow(clippy::module_name_repetitions)]
use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use futures::{StreamExt, stream, stream::BoxStream};
use http::{
    HeaderMap,
    header::{self, HeaderValue},
};
use reqwest::Method;
use secrecy::SecretString;
use typed_builder::TypedBuilder;

use crate::{
    BasicAuthCredentials, ErrorKind, Hook, Hooks, Request, RequestBuilder, Response, Result,
    dispatcher::{Dispatcher, ResponseStream},
    transport::Transport,
};

/// Default number of requests in flight, 2.
pub const DEFAULT_POOL_SIZE: usize = 2;
/// Default number of redirects before a request is deemed as failed, 5.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Default user agent, `fetchpool/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("fetchpool/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Fetcher`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `FetcherBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `FetcherBuilder`.
"))]
pub struct FetcherBuilder {
    /// Maximum number of requests in flight. Must be at least 1.
    #[builder(default = DEFAULT_POOL_SIZE)]
    size: usize,
    /// When `true`, responses without a `2xx` status are dropped from the
    /// output and handed to the `OnError` hook instead.
    #[builder(default = true)]
    ignore_errors: bool,
    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Sets the default [headers] for every request.
    ///
    /// [headers]: https://docs.rs/http/latest/http/header/struct.HeaderName.html
    custom_headers: HeaderMap,
    /// Basic authentication for every request.
    basic_auth: Option<BasicAuthCredentials>,
    /// Bearer token for every request.
    bearer_token: Option<SecretString>,
    /// Response timeout per request.
    timeout: Option<Duration>,
    /// Maximum number of redirects per request before returning an error.
    #[builder(default = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,
    /// When `true`, accept invalid SSL certificates.
    ///
    /// ## Warning
    ///
    /// If invalid certificates are trusted, any certificate for any site
    /// will be trusted for use. This includes expired certificates.
    allow_insecure: bool,
    /// Proxy for all requests, e.g. `http://localhost:8080`.
    proxy: Option<String>,
    /// Query parameters appended to every URL.
    query: Vec<(String, String)>,
    /// Request body sent with every request.
    body: Option<Vec<u8>>,
}

impl Default for FetcherBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FetcherBuilder {
    /// Instantiates a [`Fetcher`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The pool size is zero.
    /// - The user-agent is invalid.
    /// - The proxy URL is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn fetcher(self) -> Result<Fetcher> {
        let Self {
            size,
            ignore_errors,
            user_agent,
            custom_headers: mut headers,
            basic_auth,
            bearer_token,
            timeout,
            max_redirects,
            allow_insecure,
            proxy,
            query,
            body,
        } = self;

        let size = NonZeroUsize::new(size).ok_or(ErrorKind::InvalidPoolSize(size))?;

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent).map_err(ErrorKind::InvalidHeader)?,
        );

        let mut builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .default_headers(headers)
            .danger_accept_invalid_certs(allow_insecure)
            .redirect(reqwest::redirect::Policy::limited(max_redirects));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = proxy {
            let all = reqwest::Proxy::all(&proxy).map_err(|e| ErrorKind::InvalidProxy(proxy, e))?;
            builder = builder.proxy(all);
        }

        let client = builder.build().map_err(ErrorKind::BuildClient)?;

        let transport = Transport {
            basic_auth,
            bearer_token,
            query,
            body: body.map(Into::into),
            ..Transport::new(client)
        };

        Ok(Fetcher {
            transport: Arc::new(transport),
            size,
            ignore_errors,
        })
    }
}

/// Generates the per-method shortcuts of [`Fetcher`]
macro_rules! method_shortcuts {
    ($($name:ident, $name_by:ident => $method:ident;)*) => {$(
        #[doc = concat!("Fetch every item with `", stringify!($method), "`, using the item as URL")]
        #[must_use]
        pub fn $name<I>(&self, items: I) -> Batch<I::Item>
        where
            I: IntoIterator,
            I::IntoIter: Send + 'static,
            I::Item: AsRef<str> + Send + 'static,
        {
            self.request(Method::$method, items)
        }

        #[doc = concat!("Fetch every item with `", stringify!($method), "`, deriving the URL with `key`")]
        #[must_use]
        pub fn $name_by<I, K>(&self, items: I, key: K) -> Batch<I::Item>
        where
            I: IntoIterator,
            I::IntoIter: Send + 'static,
            I::Item: Send + 'static,
            K: Fn(&I::Item) -> String + Send + Sync + 'static,
        {
            self.request_by(Method::$method, items, key)
        }
    )*};
}

/// Turns iterators of work items into batches of requests.
///
/// See [`FetcherBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Fetcher {
    /// Underlying `reqwest` client and per-request options.
    transport: Arc<Transport>,
    /// Maximum number of requests in flight.
    size: NonZeroUsize,
    /// Drop responses without a `2xx` status.
    ignore_errors: bool,
}

impl Fetcher {
    /// Prepare a batch which fetches every item with `method`, using the
    /// item itself as the URL
    #[must_use]
    pub fn request<I>(&self, method: Method, items: I) -> Batch<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: AsRef<str> + Send + 'static,
    {
        self.batch(RequestBuilder::new(method), items)
    }

    /// Prepare a batch which fetches every item with `method`, deriving the
    /// URL with `key`
    #[must_use]
    pub fn request_by<I, K>(&self, method: Method, items: I, key: K) -> Batch<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
        K: Fn(&I::Item) -> String + Send + Sync + 'static,
    {
        self.batch(RequestBuilder::with_key(method, key), items)
    }

    method_shortcuts! {
        get, get_by => GET;
        options, options_by => OPTIONS;
        head, head_by => HEAD;
        post, post_by => POST;
        put, put_by => PUT;
        patch, patch_by => PATCH;
        delete, delete_by => DELETE;
    }

    /// A dispatcher for raw request streams, configured like this fetcher
    #[must_use]
    pub fn dispatcher<T>(&self) -> Dispatcher<T> {
        Dispatcher::new(Arc::clone(&self.transport), self.size, self.ignore_errors)
    }

    fn batch<I>(&self, builder: RequestBuilder<I::Item>, items: I) -> Batch<I::Item>
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Send + 'static,
    {
        let requests = stream::iter(items).map(move |item| builder.build(item));
        Batch {
            requests: requests.boxed(),
            dispatcher: self.dispatcher(),
            hooks: Hooks::new(),
        }
    }
}

/// A prepared batch of requests
///
/// Nothing is sent before [`Batch::send`] is called and the returned stream
/// is polled.
pub struct Batch<T> {
    requests: BoxStream<'static, Request<T>>,
    dispatcher: Dispatcher<T>,
    hooks: Hooks<T>,
}

impl<T: Send + 'static> Batch<T> {
    /// Replace all hooks of this batch
    #[must_use]
    pub fn hooks(mut self, hooks: Hooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Register a single hook, replacing a previous one of the same kind
    #[must_use]
    pub fn hook(mut self, hook: Hook<T>) -> Self {
        self.hooks = self.hooks.register(hook);
        self
    }

    /// Transform every answered response before it is classified
    #[must_use]
    pub fn on_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(Response<T>) -> Response<T> + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_response(hook);
        self
    }

    /// Observe responses which are dropped as errors
    #[must_use]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Response<T>) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.on_error(hook);
        self
    }

    /// Override whether non-`2xx` responses are dropped
    #[must_use]
    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.dispatcher = self.dispatcher.ignore_errors(ignore_errors);
        self
    }

    /// Override the number of requests in flight
    #[must_use]
    pub fn size(mut self, size: NonZeroUsize) -> Self {
        self.dispatcher = self.dispatcher.size(size);
        self
    }

    /// Start the batch
    ///
    /// Requests are only made while the returned stream is polled.
    #[must_use]
    pub fn send(self) -> ResponseStream<T> {
        self.dispatcher.hooks(self.hooks).dispatch(self.requests)
    }
}

impl<T> std::fmt::Debug for Batch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("dispatcher", &self.dispatcher)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// Prepare a batch with a default [`Fetcher`].
///
/// This provides the simplest batch fetching without having to create a
/// [`Fetcher`]. For more complex scenarios, see documentation of
/// [`FetcherBuilder`] instead.
///
/// # Errors
///
/// Returns an `Err` if the default [`Fetcher`] cannot be created.
pub fn request<I>(method: Method, items: I) -> Result<Batch<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: AsRef<str> + Send + 'static,
{
    Ok(FetcherBuilder::default().fetcher()?.request(method, items))
}

/// Like [`request`], deriving every URL with `key`.
///
/// # Errors
///
/// Returns an `Err` if the default [`Fetcher`] cannot be created.
pub fn request_by<I, K>(method: Method, items: I, key: K) -> Result<Batch<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    K: Fn(&I::Item) -> String + Send + Sync + 'static,
{
    Ok(FetcherBuilder::default()
        .fetcher()?
        .request_by(method, items, key))
}

/// Generates the per-method free functions
macro_rules! function_shortcuts {
    ($($name:ident => $method:ident;)*) => {$(
        #[doc = concat!("Fetch every item with `", stringify!($method), "` using a default [`Fetcher`]")]
        ///
        /// # Errors
        ///
        /// Returns an `Err` if the default [`Fetcher`] cannot be created.
        pub fn $name<I>(items: I) -> Result<Batch<I::Item>>
        where
            I: IntoIterator,
            I::IntoIter: Send + 'static,
            I::Item: AsRef<str> + Send + 'static,
        {
            request(Method::$method, items)
        }
    )*};
}

function_shortcuts! {
    get => GET;
    options => OPTIONS;
    head => HEAD;
    post => POST;
    put => PUT;
    patch => PATCH;
    delete => DELETE;
}
