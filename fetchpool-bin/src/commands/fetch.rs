use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use futures::StreamExt;
use log::debug;

use super::CommandParams;
use crate::{ExitCode, formatters::get_response_formatter, stats::ResponseStats};

/// Fetch all URLs and write one line per yielded response
pub(crate) async fn fetch(params: CommandParams) -> Result<(ResponseStats, ExitCode)> {
    let CommandParams {
        fetcher,
        method,
        urls,
        cfg,
    } = params;

    let mut writer: Box<dyn Write> = match &cfg.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Cannot create output file `{}`", path.display())
        })?)),
        None => Box::new(io::stdout()),
    };
    let formatter = get_response_formatter(cfg.format, cfg.output.is_none());

    let mut stats = ResponseStats::new(urls.len());
    debug!("Fetching {} URLs, {} at a time", urls.len(), cfg.size);

    let mut responses = fetcher.request(method, urls).send();
    while let Some(response) = responses.next().await {
        stats.add(&response);
        writeln!(writer, "{}", formatter.format_response(&response)?)?;
    }
    writer.flush()?;

    let exit_code = if stats.is_success() {
        ExitCode::Success
    } else {
        ExitCode::FetchFailure
    };
    Ok((stats, exit_code))
}
