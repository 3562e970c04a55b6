pub(crate) mod fetch;

pub(crate) use fetch::fetch;

use fetchpool_lib::Fetcher;
use http::Method;

use crate::options::Config;

/// Parameters passed to every command
pub(crate) struct CommandParams {
    pub(crate) fetcher: Fetcher,
    pub(crate) method: Method,
    pub(crate) urls: Vec<String>,
    pub(crate) cfg: Config,
}
