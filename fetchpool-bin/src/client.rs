use crate::options::{Config, HeaderMapExt};
use anyhow::{Context, Result};
use fetchpool_lib::{BasicAuthCredentials, Fetcher, FetcherBuilder};
use http::{HeaderMap, Method};
use std::{str::FromStr, time::Duration};

/// Creates a fetcher according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Fetcher> {
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;
    let basic_auth = cfg
        .basic_auth
        .as_deref()
        .map(BasicAuthCredentials::from_str)
        .transpose()
        .context("Invalid basic auth credentials")?;

    FetcherBuilder::builder()
        .size(cfg.size)
        .ignore_errors(!cfg.keep_errors)
        .user_agent(cfg.user_agent.clone())
        .custom_headers(headers)
        .basic_auth(basic_auth)
        .timeout(Duration::from_secs(cfg.timeout as u64))
        .max_redirects(cfg.max_redirects)
        .allow_insecure(cfg.insecure)
        .proxy(cfg.proxy.clone())
        .body(cfg.data.clone().map(String::into_bytes))
        .build()
        .fetcher()
        .context("Failed to create request client")
}

/// Parse the request method, case-insensitively
pub(crate) fn method(cfg: &Config) -> Result<Method> {
    Method::from_str(&cfg.method.to_uppercase())
        .with_context(|| format!("Invalid request method `{}`", cfg.method))
}
