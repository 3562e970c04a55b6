use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

use crate::{formatters::color::color_for_level, verbosity::Verbosity};

/// Initialize the logging system with the given verbosity level.
pub(crate) fn init_logging(verbose: Verbosity) {
    // RUST_LOG wins over the command-line verbosity
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        // Other crates (hyper, reqwest) stay at `warn`
        builder.filter_level(LevelFilter::Warn);
        builder
            .filter_module("fetchpool", verbose.log_level_filter())
            .filter_module("fetchpool_lib", verbose.log_level_filter());
    }

    builder.format(|buf, record| {
        let level = record.level();
        writeln!(
            buf,
            "{} {}",
            color_for_level(level)
                .clone()
                .for_stderr()
                .apply_to(format!("[{level}]")),
            record.args()
        )
    });

    builder.init();
}
