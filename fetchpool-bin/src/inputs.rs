//! Turning command-line inputs into the list of URLs to fetch
//!
//! An input is either a URL, a file with one URL per line or `-` for
//! standard input. Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Comment marker for ignoring lines in URL lists
const COMMENT_MARKER: &str = "#";

/// Read URLs from any reader
pub(crate) fn from_reader<R: Read>(reader: R) -> Result<Vec<String>> {
    let lines = BufReader::new(reader)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .context("Cannot read lines from reader")?;
    Ok(filter_lines(lines))
}

fn filter_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .collect()
}

/// Expand all raw inputs, keeping their order
pub(crate) fn collect(raw_inputs: &[String]) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for raw in raw_inputs {
        let path = Path::new(raw);
        if raw == "-" {
            urls.extend(from_reader(std::io::stdin()).context("Cannot read URLs from stdin")?);
        } else if path.is_file() {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Cannot open input file: {}", path.display()))?;
            urls.extend(from_reader(file)?);
        } else {
            urls.push(raw.clone());
        }
    }
    Ok(urls)
}
