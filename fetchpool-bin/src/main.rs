//! `fetchpool` fetches many URLs concurrently while keeping the number of
//! requests in flight bounded.
//!
//! The fetchpool binary is a wrapper around fetchpool-lib, which provides
//! convenience functions for calling fetchpool from the command-line.
//!
//! Fetch a few URLs, two at a time:
//! ```sh
//! fetchpool https://example.com https://example.org
//! ```
//!
//! Fetch a list of URLs, eight at a time, as JSON lines:
//! ```sh
//! fetchpool --size 8 --format json urls.txt
//! ```
//!
//! Read URLs from standard input and keep failed responses in the output:
//! ```sh
//! cat urls.txt | fetchpool --keep-errors -
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::PathBuf;

use anyhow::{Error, Result, bail};
use clap::Parser;
use formatters::log::init_logging;
use log::{error, info};

mod client;
mod commands;
mod formatters;
mod inputs;
mod options;
mod stats;
mod verbosity;

use crate::commands::CommandParams;
use crate::options::{Config, FETCHPOOL_CONFIG_FILE, FetchpoolOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    FetchFailure = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // Destructors in `run_main` must run before `exit`
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file and command-line options
fn load_config() -> Result<FetchpoolOptions> {
    let mut opts = FetchpoolOptions::parse();

    init_logging(opts.config.verbose);

    // An explicitly given config file must exist; the default one is optional
    let config_file = match &opts.config_file {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(FETCHPOOL_CONFIG_FILE)).filter(|path| path.is_file()),
    };

    if let Some(config_file) = config_file {
        match Config::load_from_file(&config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call fetchpool entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// The kind of the first `io::Error` in the cause chain, if any
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Run fetchpool on the given inputs
async fn run(opts: &FetchpoolOptions) -> Result<i32> {
    let urls = inputs::collect(&opts.raw_inputs)?;
    let params = CommandParams {
        fetcher: client::create(&opts.config)?,
        method: client::method(&opts.config)?,
        urls,
        cfg: opts.config.clone(),
    };

    let (stats, exit_code) = commands::fetch(params).await?;
    if opts.config.verbose.is_verbose() {
        info!("{stats}");
    }

    Ok(exit_code as i32)
}
