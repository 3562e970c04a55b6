use std::error::Error;

/// A rule for matching error message patterns to human-readable messages
struct ErrorRule {
    patterns: &'static [&'static str],
    message: &'static str,
}

impl ErrorRule {
    const fn new(patterns: &'static [&'static str], message: &'static str) -> Self {
        Self { patterns, message }
    }

    fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|pattern| text.contains(pattern))
    }
}

/// Known error message fragments, checked in order
const RULES: &[ErrorRule] = &[
    ErrorRule::new(
        &["failed to lookup address", "nodename nor servname", "name resolution"],
        "DNS resolution failed",
    ),
    ErrorRule::new(&["certificate"], "TLS certificate error"),
    ErrorRule::new(&["handshake"], "TLS handshake failed"),
    ErrorRule::new(
        &["Connection refused", "connection refused"],
        "Connection refused",
    ),
    ErrorRule::new(
        &["Connection reset", "connection reset"],
        "Connection reset by server",
    ),
    ErrorRule::new(&["timed out", "timeout"], "Request timed out"),
];

/// Analyze the error chain of a reqwest error and return a concise message
/// suitable for a single log line.
pub(crate) fn analyze_error_chain(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        return "Request timed out".to_string();
    }
    if error.is_redirect() {
        return "Too many redirects".to_string();
    }

    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<std::io::Error>() {
            return analyze_io_error(io_error);
        }
        if let Some(hyper_error) = err.downcast_ref::<hyper::Error>() {
            return analyze_hyper_error(hyper_error);
        }
        let message = err.to_string();
        if let Some(rule) = RULES.iter().find(|rule| rule.matches(&message)) {
            return rule.message.to_string();
        }
        source = err.source();
    }

    if error.is_connect() {
        "Connection failed".to_string()
    } else if error.is_builder() {
        "Invalid request. Check the URL".to_string()
    } else if error.is_decode() {
        "Response decoding failed".to_string()
    } else {
        format!("Request failed: {error}")
    }
}

fn analyze_io_error(io_error: &std::io::Error) -> String {
    match io_error.kind() {
        std::io::ErrorKind::ConnectionRefused => "Connection refused".to_string(),
        std::io::ErrorKind::ConnectionReset => "Connection reset by server".to_string(),
        std::io::ErrorKind::TimedOut => "Request timed out".to_string(),
        std::io::ErrorKind::UnexpectedEof => "Connection closed unexpectedly".to_string(),
        std::io::ErrorKind::InvalidData => "Invalid response data".to_string(),
        _ => {
            let message = io_error.to_string();
            RULES
                .iter()
                .find(|rule| rule.matches(&message))
                .map_or_else(|| format!("I/O error: {message}"), |rule| rule.message.to_string())
        }
    }
}

fn analyze_hyper_error(hyper_error: &hyper::Error) -> String {
    if hyper_error.is_incomplete_message() {
        return "Connection closed before response completed".to_string();
    }
    if hyper_error.is_parse() {
        return "Invalid HTTP response format".to_string();
    }
    if hyper_error.is_timeout() {
        return "Request timed out".to_string();
    }
    if hyper_error.is_closed() || hyper_error.is_canceled() {
        return "Connection was closed unexpectedly".to_string();
    }
    format!("HTTP protocol error: {hyper_error}")
}

/// Check whether a body read failed because the message was cut short.
///
/// This is the case for read timeouts, for bodies shorter than the announced
/// `Content-Length` and for connections that were closed or reset while the
/// body was still in transit.
pub(crate) fn is_incomplete_read(
    error: &reqwest::Error,
    received: usize,
    expected: Option<u64>,
) -> bool {
    if error.is_timeout() || error.is_body() {
        return true;
    }
    if expected.is_some_and(|len| (received as u64) < len) {
        return true;
    }

    let mut source = error.source();
    while let Some(err) = source {
        if let Some(hyper_error) = err.downcast_ref::<hyper::Error>()
            && (hyper_error.is_incomplete_message() || hyper_error.is_closed())
        {
            return true;
        }
        if let Some(io_error) = err.downcast_ref::<std::io::Error>()
            && matches!(
                io_error.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
            )
        {
            return true;
        }
        source = err.source();
    }
    false
}
