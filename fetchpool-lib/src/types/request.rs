use std::{fmt::Display, sync::Arc};

use reqwest::Method;

use crate::{Fetched, Hooks, Response};

/// Function mapping a work item to the URL it should be fetched from
pub type Key<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// A pending request: everything needed to fetch one work item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request<T> {
    /// HTTP method, e.g. `GET` or `POST`
    pub method: Method,

    /// Target URL as produced by the key function.
    /// It is not validated here; malformed URLs surface as transport failures.
    pub url: String,

    /// The work item this request was built from
    pub context: T,
}

impl<T> Request<T> {
    /// Instantiate a new `Request` object
    #[inline]
    #[must_use]
    pub const fn new(method: Method, url: String, context: T) -> Self {
        Request {
            method,
            url,
            context,
        }
    }

    /// Completion step for whatever the transport produced.
    ///
    /// The work item is attached as context. If the server answered, the
    /// `OnResponse` hook gets to transform the result; transport failures
    /// never reach it.
    pub(crate) fn complete(self, fetched: Fetched, hooks: &Hooks<T>) -> Response<T> {
        let answered = fetched.status.is_some();
        let response = Response::new(fetched, self.context);
        if answered {
            hooks.response(response)
        } else {
            response
        }
    }
}

impl<T> Display for Request<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Builds a [`Request`] for every work item
///
/// Without a key, the work item itself is the URL. With a key, the URL is
/// derived from the item and the item is only carried along as context.
pub struct RequestBuilder<T> {
    method: Method,
    key: Key<T>,
}

impl<T: AsRef<str> + 'static> RequestBuilder<T> {
    /// Create a builder which treats every item as the URL to fetch
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            key: Arc::new(|item: &T| item.as_ref().to_owned()),
        }
    }
}

impl<T> RequestBuilder<T> {
    /// Create a builder which derives the URL of every item using `key`
    #[must_use]
    pub fn with_key<K>(method: Method, key: K) -> Self
    where
        K: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            method,
            key: Arc::new(key),
        }
    }

    /// The method used for all requests of this builder
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Turn a work item into a pending request
    #[must_use]
    pub fn build(&self, item: T) -> Request<T> {
        let url = (self.key)(&item);
        Request::new(self.method.clone(), url, item)
    }
}

impl<T> Clone for RequestBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            key: Arc::clone(&self.key),
        }
    }
}

impl<T> std::fmt::Debug for RequestBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
