//! Core pieces shared by the gcal crates: tracing, output formatting,
//! translations and time input parsing.

pub mod format;
pub mod i18n;
pub mod time;
pub mod tracing;

pub use format::{
    FormatError, OutputFormat, OutputFormatter, Tabular, cell_text, ellipsis, select_fields,
};
pub use i18n::{I18n, Locale};
pub use time::{
    EventTime, TimeParseError, TimeWindow, parse_date_input, parse_datetime_in,
    parse_datetime_input, parse_duration,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
