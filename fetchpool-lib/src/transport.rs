//! Per-request options handed to reqwest.
//!
//! Client-wide settings (headers, timeout, redirects, proxy, TLS) live on the
//! [`reqwest::Client`] itself; everything reqwest only accepts per request is
//! kept here and applied to every request of a batch.
use bytes::Bytes;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};

use crate::BasicAuthCredentials;

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    pub(crate) client: reqwest::Client,
    pub(crate) basic_auth: Option<BasicAuthCredentials>,
    pub(crate) bearer_token: Option<SecretString>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Bytes>,
}

impl Transport {
    pub(crate) fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            basic_auth: None,
            bearer_token: None,
            query: Vec::new(),
            body: None,
        }
    }

    /// Prepare a request for `url`, ready to be sent
    pub(crate) fn prepare(&self, method: &Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method.clone(), url);

        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        if let Some(credentials) = &self.basic_auth {
            request = credentials.apply(request);
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }
        request
    }
}
