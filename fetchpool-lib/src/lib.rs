//! `fetchpool` is a library for fetching many URLs concurrently.
//! "Hello world" example:
//! ```no_run
//! use futures::StreamExt;
//! use fetchpool_lib::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let urls = vec!["https://example.com", "https://example.org"];
//!   let mut responses = fetchpool_lib::get(urls)?.send();
//!   while let Some(response) = responses.next().await {
//!     println!("{response}");
//!   }
//!   Ok(())
//! }
//! ```
//!
//! Every response carries the work item it was made for. Items don't need to
//! be URLs themselves, a key function derives the URL instead. For more
//! control, build a [`Fetcher`] with the [`FetcherBuilder`]:
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use futures::StreamExt;
//! use fetchpool_lib::{FetcherBuilder, Result};
//!
//! struct Package {
//!   name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let fetcher = FetcherBuilder::builder()
//!     .size(8_usize)
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .fetcher()?;
//!
//!   let packages = vec![Package { name: "serde".into() }, Package { name: "tokio".into() }];
//!   let responses: Vec<_> = fetcher
//!     .get_by(packages, |p: &Package| format!("https://crates.io/api/v1/crates/{}", p.name))
//!     .on_error(|response| eprintln!("dropped {}", response.context().name))
//!     .send()
//!     .collect()
//!     .await;
//!
//!   for response in responses {
//!     println!("{}: {:?}", response.context().name, response.status());
//!   }
//!   Ok(())
//! }
//! ```
// #![deny(missing_docs)]

#[cfg(doctest)]
doc_comment::doctest!("../../README.md");

mod dispatcher;
mod fetcher;
mod transport;
mod types;
mod utils;

#[cfg(test)]
mod test_utils;

pub use crate::{
    dispatcher::{Dispatcher, ResponseStream},
    fetcher::{
        Batch, DEFAULT_MAX_REDIRECTS, DEFAULT_POOL_SIZE, DEFAULT_USER_AGENT, Fetcher,
        FetcherBuilder, delete, get, head, options, patch, post, put, request, request_by,
    },
    types::*,
};
