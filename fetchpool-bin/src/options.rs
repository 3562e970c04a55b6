use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use fetchpool_lib::{DEFAULT_MAX_REDIRECTS, DEFAULT_POOL_SIZE, DEFAULT_USER_AGENT};
use http::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::{fs, path::Path, path::PathBuf, str::FromStr};
use strum::{Display, EnumString, VariantNames};

pub(crate) const FETCHPOOL_CONFIG_FILE: &str = "fetchpool.toml";

const DEFAULT_METHOD: &str = "get";
const DEFAULT_TIMEOUT_SECS: usize = 20;

// clap wants `&str` defaults, serde wants functions returning owned values
const POOL_SIZE_STR: &str = concatcp!(DEFAULT_POOL_SIZE);
const MAX_REDIRECTS_STR: &str = concatcp!(DEFAULT_MAX_REDIRECTS);
const TIMEOUT_STR: &str = concatcp!(DEFAULT_TIMEOUT_SECS);
// Shown as default, but a missing default file is not an error
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    FETCHPOOL_CONFIG_FILE,
);

/// How every yielded response is printed
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumString, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub(crate) enum Format {
    /// `[200] https://example.com (1256 bytes)`
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

// Generates the functions used as serde defaults
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

default_function! {
    size: usize = DEFAULT_POOL_SIZE;
    max_redirects: usize = DEFAULT_MAX_REDIRECTS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    timeout: usize = DEFAULT_TIMEOUT_SECS;
    method: String = DEFAULT_METHOD.to_string();
}

// Takes each config file value whose command-line counterpart is still at
// its default
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Split `Header-Name: value` at the first colon
///
/// Errors never contain the header value, it may hold credentials.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = header.split_once(':') else {
        return Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        ));
    };
    let name = name.trim();
    let name = HeaderName::from_str(name)
        .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
    Ok((name, value))
}

/// clap parser for a single `-H` argument
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid = |message: String| clap::Error::raw(clap::error::ErrorKind::InvalidValue, message);

        let header = value
            .to_str()
            .ok_or_else(|| invalid("Header contains invalid UTF-8".to_string()))?;
        let (name, value) = parse_single_header(header).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid(format!("Value of header '{name}' contains invalid UTF-8")))?;
        Ok((name.to_string(), value.to_string()))
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Conversion of collected header pairs into a `HeaderMap`
pub(crate) trait HeaderMapExt {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value for '{name}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// fetchpool fetches many URLs concurrently, with a bounded number of
/// requests in flight, and prints one line per response.
///
/// fetchpool is powered by fetchpool-lib.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct FetchpoolOptions {
    /// URLs to fetch
    #[arg(
        name = "inputs",
        required = true,
        long_help = "URLs to fetch. These can be:
URLs (e.g. `https://example.com`), files with one URL per line
(e.g. `urls.txt`), or standard input (`-`). Empty lines and lines
starting with '#' are ignored."
    )]
    pub(crate) raw_inputs: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

// The config file lists headers as a table
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for fetchpool
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default)]
    pub(crate) verbose: Verbosity,

    /// Request method
    // Using `-X` as a short param similar to curl
    #[arg(short = 'X', long, default_value = DEFAULT_METHOD)]
    #[serde(default = "method")]
    pub(crate) method: String,

    /// Maximum number of requests in flight
    #[arg(short, long, default_value = &POOL_SIZE_STR)]
    #[serde(default = "size")]
    pub(crate) size: usize,

    /// Print responses with an error status and failed connections instead
    /// of dropping them
    #[arg(long)]
    #[serde(default)]
    pub(crate) keep_errors: bool,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long = "header",
        value_parser = HeaderParser,
        number_of_values = 1,
        long_help = "Set custom header for requests

Some websites require custom headers to be passed in order to return valid responses.
You can specify custom headers in the format 'Name: Value'. For example, 'Accept: text/html'.
This is the same format that other tools like curl or wget use.
Multiple headers can be specified by using the flag multiple times."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// Timeout in seconds from connect to response finished
    #[arg(short, long, default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub(crate) timeout: usize,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Basic authentication for every request, as `username:password`
    #[arg(long, value_name = "CREDENTIALS")]
    #[serde(default)]
    pub(crate) basic_auth: Option<String>,

    /// Maximum number of allowed redirects
    #[arg(short, long, default_value = &MAX_REDIRECTS_STR)]
    #[serde(default = "max_redirects")]
    pub(crate) max_redirects: usize,

    /// Proceed for server connections considered insecure (invalid TLS)
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) insecure: bool,

    /// Proxy for all requests, e.g. `http://localhost:8080`
    #[arg(long, env = "FETCHPOOL_PROXY")]
    #[serde(default)]
    pub(crate) proxy: Option<String>,

    /// Request body sent with every request
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) data: Option<String>,

    /// Output format of the responses
    #[arg(short, long, default_value = "plain", value_parser = PossibleValuesParser::new(Format::VARIANTS).map(|s| s.parse::<Format>().unwrap()))]
    #[serde(default)]
    pub(crate) format: Format,

    /// Output file for the responses
    #[arg(short, long, value_parser)]
    #[serde(default)]
    pub(crate) output: Option<PathBuf>,
}

impl Config {
    /// Add headers from the config file unless the command line sets them
    ///
    /// Header names are case-insensitive, so they are compared lowercased.
    fn merge_headers(&mut self, file_headers: &[(String, String)]) {
        let lowercased = |(name, value): (String, String)| (name.to_ascii_lowercase(), value);
        let mut merged: HashMap<_, _> = file_headers.iter().cloned().map(lowercased).collect();
        merged.extend(self.header.drain(..).map(lowercased));
        self.header = merged.into_iter().collect();
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        self.merge_headers(&toml.header);

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,

                // Keys with defaults to assign
                basic_auth: None,
                data: None,
                format: Format::Plain,
                insecure: false,
                keep_errors: false,
                max_redirects: DEFAULT_MAX_REDIRECTS,
                method: DEFAULT_METHOD,
                output: None,
                proxy: None,
                size: DEFAULT_POOL_SIZE,
                timeout: DEFAULT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT,
                verbose: Verbosity::default(),
            }
        }
    }
}
