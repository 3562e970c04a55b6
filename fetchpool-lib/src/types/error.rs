use serde::{Serialize, Serializer};
use std::hash::Hash;
use thiserror::Error;

use crate::utils::reqwest::analyze_error_chain;

/// Possible errors when fetching with `fetchpool_lib`
///
/// Configuration errors are returned from
/// [`FetcherBuilder::fetcher`](crate::FetcherBuilder::fetcher). All other
/// variants never escape a batch; they are attached to the
/// [`Response`](crate::Response) they belong to and can be inspected from
/// hooks or, for transport failures, from yielded responses.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The connection could not be established or was severed before a
    /// status line arrived
    #[error("Network error while trying to connect to an endpoint via reqwest")]
    NetworkRequest(#[source] reqwest::Error),

    /// The body was cut short: fewer bytes than announced, a premature end
    /// of the message or a read timeout
    #[error("Incomplete read: received {received} bytes{}", match .expected {
        Some(len) => format!(" of {len}"),
        None => String::new(),
    })]
    IncompleteBody {
        /// Bytes received before the failure
        received: usize,
        /// Length announced by the server, if any
        expected: Option<u64>,
        /// Underlying error reported by reqwest
        #[source]
        source: reqwest::Error,
    },

    /// Any other failure while materializing the body
    #[error("Cannot read response body")]
    UnexpectedBody(#[source] reqwest::Error),

    /// The underlying reqwest client could not be created
    #[error("Error creating request client: {0}")]
    BuildClient(#[source] reqwest::Error),

    /// The given proxy URL is invalid
    #[error("Invalid proxy `{0}`")]
    InvalidProxy(String, #[source] reqwest::Error),

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The pool must hold at least one in-flight request
    #[error("Invalid pool size {0}: must be at least 1")]
    InvalidPoolSize(usize),
}

impl ErrorKind {
    /// Return more details about the given [`ErrorKind`]
    ///
    /// Which additional information we can extract depends on the underlying
    /// request type. The output is purely meant for humans and the format
    /// can change at any time.
    #[must_use]
    pub fn details(&self) -> Option<String> {
        match self {
            ErrorKind::NetworkRequest(e)
            | ErrorKind::IncompleteBody { source: e, .. }
            | ErrorKind::UnexpectedBody(e) => Some(analyze_error_chain(e)),
            ErrorKind::InvalidProxy(_, e) | ErrorKind::BuildClient(e) => Some(e.to_string()),
            ErrorKind::InvalidHeader(_) | ErrorKind::InvalidPoolSize(_) => None,
        }
    }

    /// Whether this error happened while reading a response body
    #[must_use]
    pub const fn is_body(&self) -> bool {
        matches!(
            self,
            ErrorKind::IncompleteBody { .. } | ErrorKind::UnexpectedBody(_)
        )
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NetworkRequest(e1), Self::NetworkRequest(e2))
            | (Self::UnexpectedBody(e1), Self::UnexpectedBody(e2))
            | (Self::BuildClient(e1), Self::BuildClient(e2)) => e1.to_string() == e2.to_string(),
            (
                Self::IncompleteBody {
                    received: r1,
                    expected: x1,
                    ..
                },
                Self::IncompleteBody {
                    received: r2,
                    expected: x2,
                    ..
                },
            ) => r1 == r2 && x1 == x2,
            (Self::InvalidProxy(p1, _), Self::InvalidProxy(p2, _)) => p1 == p2,
            (Self::InvalidHeader(_), Self::InvalidHeader(_)) => true,
            (Self::InvalidPoolSize(s1), Self::InvalidPoolSize(s2)) => s1 == s2,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        match self {
            Self::NetworkRequest(e) | Self::UnexpectedBody(e) | Self::BuildClient(e) => {
                e.to_string().hash(state);
            }
            Self::IncompleteBody {
                received, expected, ..
            } => (received, expected).hash(state),
            Self::InvalidProxy(p, _) => p.hash(state),
            Self::InvalidHeader(e) => e.to_string().hash(state),
            Self::InvalidPoolSize(s) => s.hash(state),
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
