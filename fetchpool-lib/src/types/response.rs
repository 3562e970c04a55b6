use std::{borrow::Cow, fmt::Display};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Serialize, Serializer, de::DeserializeOwned, ser::SerializeStruct};

use crate::ErrorKind;

/// Everything the transport produced for one request
///
/// This is the part of a [`Response`] which does not depend on the work
/// item. It is built once when a request completes and never touches the
/// transport's own response type afterwards.
#[derive(Debug, Default)]
pub struct Fetched {
    /// Status code; `None` if the server never answered
    pub(crate) status: Option<StatusCode>,
    /// Final URL after redirects, or the requested URL on transport failure
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    /// Only populated when the body was read completely
    pub(crate) body: Option<Bytes>,
    pub(crate) error: Option<ErrorKind>,
}

impl Fetched {
    /// The server answered with `status`
    #[must_use]
    pub(crate) fn answered(status: StatusCode, url: String) -> Self {
        Fetched {
            status: Some(status),
            url,
            ..Default::default()
        }
    }

    /// The request never got a status line back
    #[must_use]
    pub(crate) fn failed(url: String, error: ErrorKind) -> Self {
        Fetched {
            url,
            error: Some(error),
            ..Default::default()
        }
    }
}

/// A completed request together with the work item it was made for
#[derive(Debug)]
pub struct Response<T> {
    fetched: Fetched,
    context: T,
}

impl<T> Response<T> {
    #[inline]
    #[must_use]
    pub(crate) const fn new(fetched: Fetched, context: T) -> Self {
        Response { fetched, context }
    }

    /// The status code, or `None` for a transport failure
    #[inline]
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.fetched.status
    }

    /// `true` if the server answered with a 2xx status
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.fetched.status.is_some_and(|code| code.is_success())
    }

    /// The final URL of the request
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.fetched.url
    }

    /// Response headers; empty for transport failures
    #[inline]
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.fetched.headers
    }

    /// Mutable access to the response headers, e.g. from an `OnResponse` hook
    #[inline]
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.fetched.headers
    }

    /// The fully read body, if any
    #[inline]
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.fetched.body.as_ref()
    }

    /// The body as text. Invalid UTF-8 sequences are replaced.
    #[must_use]
    pub fn text(&self) -> Option<Cow<'_, str>> {
        self.body().map(|body| String::from_utf8_lossy(body))
    }

    /// Deserialize the body as JSON
    ///
    /// Returns `None` if there is no body.
    pub fn json<D: DeserializeOwned>(&self) -> Option<serde_json::Result<D>> {
        self.body().map(|body| serde_json::from_slice(body))
    }

    /// The error recorded for this response, if any
    #[inline]
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorKind> {
        self.fetched.error.as_ref()
    }

    /// The work item this response belongs to
    #[inline]
    #[must_use]
    pub const fn context(&self) -> &T {
        &self.context
    }

    /// Give back the work item, dropping the response
    #[inline]
    #[must_use]
    pub fn into_context(self) -> T {
        self.context
    }

    /// Replace the body, e.g. from an `OnResponse` hook
    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.fetched.body = Some(body);
        self
    }

    /// Split into transport data and work item
    #[must_use]
    pub fn into_parts(self) -> (Fetched, T) {
        (self.fetched, self.context)
    }
}

impl Fetched {
    /// Status code; `None` if the server never answered
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Final URL of the request
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body, if it was read completely
    #[must_use]
    pub fn into_body(self) -> Option<Bytes> {
        self.body
    }
}

impl<T> Display for Response<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status() {
            Some(code) => write!(f, "[{}] {}", code.as_u16(), self.url())?,
            None => write!(f, "[ERR] {}", self.url())?,
        }

        if let Some(e) = self.error() {
            match e.details() {
                Some(details) => write!(f, " | {e}: {details}")?,
                None => write!(f, " | {e}")?,
            }
        }
        Ok(())
    }
}

impl<T: Serialize> Serialize for Response<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("Response", 5)?;
        s.serialize_field("url", self.url())?;
        s.serialize_field("status", &self.status().map(|code| code.as_u16()))?;
        s.serialize_field("bytes", &self.body().map(Bytes::len))?;
        s.serialize_field("error", &self.error())?;
        s.serialize_field("context", &self.context)?;
        s.end()
    }
}
