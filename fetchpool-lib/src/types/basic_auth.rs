use std::str::FromStr;

use thiserror::Error;

/// Reasons a `username:password` string is rejected
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum BasicAuthCredentialsParseError {
    /// No colon separating username and password
    #[error("Invalid basic auth credentials syntax")]
    InvalidSyntax,

    /// The part before the colon is empty
    #[error("Missing basic auth username")]
    MissingUsername,

    /// More than one colon; holds the number of parts
    #[error(
        "Too many values separated by colon. Expected 2, got {0}. Valid form is '<username>:<password>'"
    )]
    TooManyParts(usize),
}

/// [`BasicAuthCredentials`] contains a pair of basic auth values consisting of
/// a username and an optional password.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAuthCredentials {
    /// Basic auth username
    pub username: String,

    /// Basic auth password
    pub password: Option<String>,
}

impl FromStr for BasicAuthCredentials {
    type Err = BasicAuthCredentialsParseError;

    fn from_str(credentials: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = credentials.trim().split(':').collect();

        if parts.len() <= 1 {
            return Err(BasicAuthCredentialsParseError::InvalidSyntax);
        }

        if parts.len() > 2 {
            return Err(BasicAuthCredentialsParseError::TooManyParts(parts.len()));
        }

        if parts[0].is_empty() {
            return Err(BasicAuthCredentialsParseError::MissingUsername);
        }

        Ok(Self {
            username: parts[0].to_string(),
            password: (!parts[1].is_empty()).then(|| parts[1].to_string()),
        })
    }
}

impl BasicAuthCredentials {
    /// Add the credentials to an outgoing request
    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.username, self.password.as_ref())
    }
}
