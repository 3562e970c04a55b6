use std::fmt::{self, Display};

use fetchpool_lib::Response;
use serde::Serialize;

/// Counts of a finished run
///
/// Dropped responses never reach the CLI, so they are derived from the
/// number of submitted URLs.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub(crate) struct ResponseStats {
    total: usize,
    successful: usize,
    failures: usize,
}

impl ResponseStats {
    #[inline]
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn add<T>(&mut self, response: &Response<T>) {
        if response.is_success() {
            self.successful += 1;
        } else {
            self.failures += 1;
        }
    }

    /// URLs which produced no output line
    #[inline]
    pub(crate) const fn dropped(&self) -> usize {
        self.total.saturating_sub(self.successful + self.failures)
    }

    #[inline]
    pub(crate) const fn is_success(&self) -> bool {
        self.total == self.successful
    }
}

impl Display for ResponseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Total, {} OK, {} Errors, {} Dropped",
            self.total,
            self.successful,
            self.failures,
            self.dropped()
        )
    }
}
