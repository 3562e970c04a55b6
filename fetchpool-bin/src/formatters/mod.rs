pub(crate) mod color;
pub(crate) mod log;
pub(crate) mod response;

use self::response::ResponseFormatter;
use crate::options::Format;

/// Create a response formatter based on the given format option
///
/// Colors are only used for plain output to a terminal.
pub(crate) fn get_response_formatter(format: Format, to_terminal: bool) -> Box<dyn ResponseFormatter> {
    match format {
        Format::Plain if to_terminal => Box::new(response::ColorFormatter),
        Format::Plain => Box::new(response::PlainFormatter),
        Format::Json => Box::new(response::JsonFormatter),
    }
}
