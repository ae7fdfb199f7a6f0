//! Formatting helpers for meter readings.
//!
//! Loggers append one tab-separated line per [`Reading`]. Two layouts exist:
//! the basic `timestamp\tvalue\tunit` line and the extended line that adds the
//! display text and the lit annunciators.

use crate::types::Reading;

/// Text written in place of a value the meter did not display as a number.
pub const NO_VALUE: &str = "N/A";

/// Layout of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `timestamp\tvalue\tunit\n`
    Basic,
    /// `timestamp\tvalue\tunit\tdisplay\tstates\n`
    #[default]
    Extended,
}

/// Format an optional reading value, using [`NO_VALUE`] when absent.
///
/// # Example
///
/// ```
/// use dmmlog_core::format_value;
///
/// assert_eq!(format_value(Some(5.0)), "5");
/// assert_eq!(format_value(Some(0.0125)), "0.0125");
/// assert_eq!(format_value(None), "N/A");
/// ```
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NO_VALUE.to_string(),
    }
}

/// Render one log line for `reading`, including the trailing newline.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use dmmlog_core::{format_log_line, Coupling, LogFormat, Quantity, Reading, StatusFlags};
///
/// let reading = Reading {
///     timestamp: UNIX_EPOCH + Duration::from_secs(10),
///     value: Some(5.0),
///     quantity: Quantity::Voltage(Coupling::Dc),
///     display: "5.00V".into(),
///     flags: StatusFlags::empty(),
/// };
/// assert_eq!(format_log_line(&reading, LogFormat::Basic), "10.000000\t5\tVDC\n");
/// ```
pub fn format_log_line(reading: &Reading, format: LogFormat) -> String {
    let head = format!(
        "{:.6}\t{}\t{}",
        reading.timestamp_secs(),
        format_value(reading.value),
        reading.quantity.unit_code()
    );
    match format {
        LogFormat::Basic => format!("{head}\n"),
        LogFormat::Extended => format!("{head}\t{}\t{}\n", reading.display, reading.flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quantity, StatusFlag, StatusFlags};
    use std::time::{Duration, UNIX_EPOCH};

    fn reading(value: Option<f64>) -> Reading {
        Reading {
            timestamp: UNIX_EPOCH + Duration::from_micros(1_700_000_000_250_000),
            value,
            quantity: Quantity::Resistance,
            display: "1.000kΩ".into(),
            flags: [StatusFlag::Auto, StatusFlag::Hold].into_iter().collect(),
        }
    }

    #[test]
    fn value_present() {
        assert_eq!(format_value(Some(1000.0)), "1000");
        assert_eq!(format_value(Some(-2.5)), "-2.5");
    }

    #[test]
    fn value_absent() {
        assert_eq!(format_value(None), "N/A");
    }

    #[test]
    fn basic_line() {
        assert_eq!(
            format_log_line(&reading(Some(1000.0)), LogFormat::Basic),
            "1700000000.250000\t1000\tOHM\n"
        );
    }

    #[test]
    fn extended_line() {
        assert_eq!(
            format_log_line(&reading(Some(1000.0)), LogFormat::Extended),
            "1700000000.250000\t1000\tOHM\t1.000kΩ\tAUTO,HOLD\n"
        );
    }

    #[test]
    fn extended_line_without_value_or_flags() {
        let mut r = reading(None);
        r.flags = StatusFlags::empty();
        assert_eq!(
            format_log_line(&r, LogFormat::Extended),
            "1700000000.250000\tN/A\tOHM\t1.000kΩ\t\n"
        );
    }

    #[test]
    fn default_format_is_extended() {
        assert_eq!(LogFormat::default(), LogFormat::Extended);
    }
}
