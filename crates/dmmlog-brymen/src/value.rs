//! Turning display text into a value and a quantity.
//!
//! The digit text handed to [`assemble`] is exactly what the LCD shows, in
//! display order: an optional leading `-`, four glyphs, and any decimal
//! points between them. Special displays are recognised before the text is
//! treated as a number:
//!
//! 1. a trailing `C`/`F` is a temperature reading,
//! 2. `EF` alone is the electric-field detector with no field present,
//! 3. a run of dashes is the electric-field strength bar,
//! 4. anything else is parsed as a decimal number and scaled by the prefix.
//!
//! Text that is not a number (overload, blank LCD, unknown segments) gives
//! `value: None`.

use dmmlog_core::{Coupling, Quantity, TemperatureScale};

use crate::fields::{Prefix, QuantityName};

/// The electric-field banner shown while no field is detected.
const FIELD_BANNER: &str = "EF";

/// Result of assembling one frame's display text.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub value: Option<f64>,
    pub quantity: Quantity,
    pub display: String,
}

/// Combine display text, prefix and annunciators into a value.
///
/// # Example
///
/// ```
/// use dmmlog_brymen::fields::{Prefix, QuantityName};
/// use dmmlog_brymen::value::assemble;
/// use dmmlog_core::{Coupling, Quantity};
///
/// let a = assemble(" 5.00", Prefix::None, Coupling::Dc, QuantityName::Volt);
/// assert_eq!(a.value, Some(5.0));
/// assert_eq!(a.quantity, Quantity::Voltage(Coupling::Dc));
/// assert_eq!(a.display, "5.00V");
/// ```
pub fn assemble(text: &str, prefix: Prefix, coupling: Coupling, name: QuantityName) -> Assembled {
    if let Some((body, scale)) = split_temperature(text) {
        let number = normalize(body);
        let quantity = Quantity::Temperature(scale);
        return Assembled {
            value: parse_decimal(&number),
            display: format!("{number}{}", quantity.display_suffix()),
            quantity,
        };
    }

    if is_field_banner(text) {
        return Assembled {
            value: Some(0.0),
            quantity: Quantity::ElectricField,
            display: FIELD_BANNER.to_string(),
        };
    }

    if let Some(dashes) = field_strength(text) {
        return Assembled {
            value: Some(dashes as f64),
            quantity: Quantity::ElectricField,
            display: text.trim_end().to_string(),
        };
    }

    let quantity = quantity_for(name, coupling);
    let number = normalize(text);
    let value = parse_decimal(&number).map(|v| v * prefix.multiplier());
    Assembled {
        value,
        display: format!("{number}{}{}", prefix.symbol(), quantity.display_suffix()),
        quantity,
    }
}

/// Map the unit annunciator and AC/DC state to a quantity.
pub fn quantity_for(name: QuantityName, coupling: Coupling) -> Quantity {
    match name {
        QuantityName::Volt => Quantity::Voltage(coupling),
        QuantityName::Ampere => Quantity::Current(coupling),
        QuantityName::Ohm => Quantity::Resistance,
        QuantityName::Hertz => Quantity::Frequency,
        QuantityName::Farad => Quantity::Capacitance,
        QuantityName::None => Quantity::Unknown,
    }
}

fn split_temperature(text: &str) -> Option<(&str, TemperatureScale)> {
    if let Some(body) = text.strip_suffix('C') {
        Some((body, TemperatureScale::Celsius))
    } else {
        text.strip_suffix('F')
            .map(|body| (body, TemperatureScale::Fahrenheit))
    }
}

fn is_field_banner(text: &str) -> bool {
    text.strip_prefix(FIELD_BANNER)
        .is_some_and(|rest| rest.chars().all(|c| c == ' '))
}

/// Number of dashes when the text is one or more dashes followed by blanks.
fn field_strength(text: &str) -> Option<usize> {
    let dashes = text.trim_end_matches(' ');
    if !dashes.is_empty() && dashes.chars().all(|c| c == '-') {
        Some(dashes.len())
    } else {
        None
    }
}

/// Drop surrounding blanks and the blanks between a leading sign and the
/// first digit, so `"-  12"` reads as `"-12"`.
fn normalize(text: &str) -> String {
    let text = text.trim();
    match text.strip_prefix('-') {
        Some(rest) => format!("-{}", rest.trim_start()),
        None => text.to_string(),
    }
}

/// Parse `[-]digits[.digits]`. Anything else, including exponents and the
/// empty string, is not a displayed number.
fn parse_decimal(text: &str) -> Option<f64> {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let well_formed = unsigned.chars().any(|c| c.is_ascii_digit())
        && unsigned.chars().all(|c| c.is_ascii_digit() || c == '.')
        && unsigned.matches('.').count() <= 1;
    if well_formed { text.parse().ok() } else { None }
}
