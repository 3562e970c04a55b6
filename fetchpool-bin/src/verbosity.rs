//! `-v` and `-q` flags, also settable as `verbose = "<level>"` in the config
//! file.
//!
//! Errors are always reported. Each `-v` raises the level by one step
//! (warn, info, debug, trace), each `-q` lowers it; the two flags conflict.
use log::{Level, LevelFilter};
use serde::Deserialize;

#[derive(clap::Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// Log more; pass several times for more detail
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    verbose: u8,

    /// Log less; pass twice to only show errors
    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "verbose"
    )]
    quiet: u8,
}

impl Verbosity {
    /// The log level, starting at `warn` without any flags
    pub(crate) const fn log_level(self) -> Level {
        let steps = 1 + self.verbose as i16 - self.quiet as i16;
        match steps {
            i16::MIN..=0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    pub(crate) fn log_level_filter(self) -> LevelFilter {
        self.log_level().to_level_filter()
    }

    /// `true` once `-v` was passed at least once
    pub(crate) const fn is_verbose(self) -> bool {
        self.verbose > self.quiet
    }
}

// Accepts "warn", "Warning", "debug" and so on
impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        let (verbose, quiet) = match level.to_lowercase().as_str() {
            "error" => (0, 1),
            "warn" | "warning" => (0, 0),
            "info" => (1, 0),
            "debug" => (2, 0),
            "trace" => (3, 0),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "invalid log level `{other}`"
                )));
            }
        };
        Ok(Verbosity { verbose, quiet })
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use log::Level;
    use serde::Deserialize;

    use super::Verbosity;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        verbose: Verbosity,
    }

    #[test]
    fn verify_app() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_levels_from_flags() {
        let level = |args: &[&str]| Cli::parse_from(args).verbose.log_level();
        assert_eq!(level(&["fetchpool"]), Level::Warn);
        assert_eq!(level(&["fetchpool", "-v"]), Level::Info);
        assert_eq!(level(&["fetchpool", "-vv"]), Level::Debug);
        assert_eq!(level(&["fetchpool", "-vvvvv"]), Level::Trace);
        assert_eq!(level(&["fetchpool", "-qqq"]), Level::Error);
    }

    #[test]
    fn test_flags_conflict() {
        assert!(Cli::try_parse_from(["fetchpool", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_deserialize_level() {
        #[derive(Deserialize)]
        struct Wrapper {
            verbose: Verbosity,
        }

        let parsed: Wrapper = toml::from_str(r#"verbose = "Debug""#).unwrap();
        assert_eq!(parsed.verbose.log_level(), Level::Debug);
        assert!(parsed.verbose.is_verbose());

        let parsed: Wrapper = toml::from_str(r#"verbose = "error""#).unwrap();
        assert_eq!(parsed.verbose.log_level(), Level::Error);
        assert!(toml::from_str::<Wrapper>(r#"verbose = "loud""#).is_err());
    }
}
