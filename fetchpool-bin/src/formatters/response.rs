use anyhow::Result;
use fetchpool_lib::Response;

use super::color::{GREEN, PINK, YELLOW};

/// The responses printed by the CLI carry the URL they were requested with
pub(crate) type UrlResponse = Response<String>;

/// Formats a single yielded response as one output line
pub(crate) trait ResponseFormatter: Send + Sync {
    fn format_response(&self, response: &UrlResponse) -> Result<String>;
}

/// `[STATUS] URL (N bytes)`, without color codes
///
/// Used when writing to a file.
pub(crate) struct PlainFormatter;

impl ResponseFormatter for PlainFormatter {
    fn format_response(&self, response: &UrlResponse) -> Result<String> {
        Ok(with_size(response.to_string(), response))
    }
}

/// Like [`PlainFormatter`], with the status colored by its class
pub(crate) struct ColorFormatter;

impl ResponseFormatter for ColorFormatter {
    fn format_response(&self, response: &UrlResponse) -> Result<String> {
        let color = match response.status() {
            Some(code) if code.is_success() => &GREEN,
            Some(code) if code.is_redirection() => &YELLOW,
            _ => &PINK,
        };
        let line = response.to_string();
        // Display always starts with the bracketed status
        let (status, rest) = line.split_at(line.find(']').map_or(0, |end| end + 1));
        Ok(with_size(format!("{}{rest}", color.apply_to(status)), response))
    }
}

/// One JSON object per line
pub(crate) struct JsonFormatter;

impl ResponseFormatter for JsonFormatter {
    fn format_response(&self, response: &UrlResponse) -> Result<String> {
        Ok(serde_json::to_string(response)?)
    }
}

fn with_size(line: String, response: &UrlResponse) -> String {
    match response.body() {
        Some(body) => format!("{line} ({} bytes)", body.len()),
        None => line,
    }
}
