//! Field extraction from a validated frame.
//!
//! Every extractor is a pure function of the frame bytes. Positions use the
//! MSB-first numbering of [`BitRef`]; only the low nibble (indices 4..=7) of
//! each byte carries data, the high nibble being the sequence index.
//!
//! | Byte | [4]            | [5]       | [6]        | [7]          |
//! |------|----------------|-----------|------------|--------------|
//! | 1    | LOW_IMPEDANCE  | DC        | AC         | AUTO         |
//! | 2    | CREST          | REL       | HOLD       | BEEP         |
//! | 11   | LOW_BATTERY    | NEG_SCALE | M          | k            |
//! | 12   | MAX / SCALE    | Ω         | Hz         | n            |
//! | 13   | MIN            | F         | u          | m            |
//! | 14   | DBM            | V         | A          |              |
//!
//! Bytes 3..=10 hold the four digits, two bytes each (see
//! [`segments`](crate::segments)). Bit 7 of byte 3 is the minus sign; bit 7
//! of bytes 5, 7 and 9 is the decimal point left of digits 2, 3 and 4.

use std::fmt;

use dmmlog_core::{Coupling, StatusFlag, StatusFlags};

use crate::bits::BitRef;
use crate::frame::RawFrame;
use crate::segments::SegmentCode;

/// Number of digit positions on the LCD.
pub const DIGIT_COUNT: usize = 4;

const DC: BitRef = BitRef::new(1, 5);
const AC: BitRef = BitRef::new(1, 6);

const MINUS: BitRef = BitRef::new(3, 7);

const PREFIX_BITS: [(BitRef, Prefix); 5] = [
    (BitRef::new(11, 6), Prefix::Mega),
    (BitRef::new(11, 7), Prefix::Kilo),
    (BitRef::new(12, 7), Prefix::Nano),
    (BitRef::new(13, 6), Prefix::Micro),
    (BitRef::new(13, 7), Prefix::Milli),
];

// Volts first: at power-up the meter briefly asserts both V and Ω.
const NAME_BITS: [(BitRef, QuantityName); 5] = [
    (BitRef::new(14, 5), QuantityName::Volt),
    (BitRef::new(12, 5), QuantityName::Ohm),
    (BitRef::new(12, 6), QuantityName::Hertz),
    (BitRef::new(13, 5), QuantityName::Farad),
    (BitRef::new(14, 6), QuantityName::Ampere),
];

// MAX and SCALE share one bit on the BM25x; both are reported.
const FLAG_BITS: [(BitRef, StatusFlag); 12] = [
    (BitRef::new(1, 7), StatusFlag::Auto),
    (BitRef::new(1, 4), StatusFlag::LowImpedance),
    (BitRef::new(2, 7), StatusFlag::Beep),
    (BitRef::new(2, 6), StatusFlag::Hold),
    (BitRef::new(2, 5), StatusFlag::RelativeZero),
    (BitRef::new(2, 4), StatusFlag::Crest),
    (BitRef::new(11, 4), StatusFlag::LowBattery),
    (BitRef::new(11, 5), StatusFlag::NegativeScale),
    (BitRef::new(12, 4), StatusFlag::Max),
    (BitRef::new(12, 4), StatusFlag::Scale),
    (BitRef::new(13, 4), StatusFlag::Min),
    (BitRef::new(14, 4), StatusFlag::Dbm),
];

/// SI magnitude prefix shown next to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    Mega,
    Kilo,
    None,
    Milli,
    Micro,
    Nano,
}

impl Prefix {
    /// Factor applied to the displayed number.
    pub fn multiplier(&self) -> f64 {
        match self {
            Prefix::Mega => 1e6,
            Prefix::Kilo => 1e3,
            Prefix::None => 1.0,
            Prefix::Milli => 1e-3,
            Prefix::Micro => 1e-6,
            Prefix::Nano => 1e-9,
        }
    }

    /// Display symbol; empty for no prefix.
    pub fn symbol(&self) -> &'static str {
        match self {
            Prefix::Mega => "M",
            Prefix::Kilo => "k",
            Prefix::None => "",
            Prefix::Milli => "m",
            Prefix::Micro => "u",
            Prefix::Nano => "n",
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unit annunciator lit on the LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantityName {
    Volt,
    Ohm,
    Hertz,
    Farad,
    Ampere,
    None,
}

/// AC/DC annunciators. DC wins if both are lit.
pub fn current_type(frame: &RawFrame) -> Coupling {
    if DC.is_set(frame.as_ref()) {
        Coupling::Dc
    } else if AC.is_set(frame.as_ref()) {
        Coupling::Ac
    } else {
        Coupling::Unspecified
    }
}

/// Byte offsets carrying digit `position` (1..=4, left to right).
pub fn digit_bytes(position: usize) -> (usize, usize) {
    (2 * position + 1, 2 * position + 2)
}

/// Segment code of digit `position` (1..=4), `None` for any other position.
pub fn segment_pair(frame: &RawFrame, position: usize) -> Option<SegmentCode> {
    if !(1..=DIGIT_COUNT).contains(&position) {
        return None;
    }
    let (first, second) = digit_bytes(position);
    Some(SegmentCode::from_bytes(frame.byte(first), frame.byte(second)))
}

/// Whether the extra minus segment left of digit 1 is lit.
pub fn has_minus(frame: &RawFrame) -> bool {
    MINUS.is_set(frame.as_ref())
}

/// Whether the decimal point left of digit `position` (2..=4) is lit.
pub fn has_point_before(frame: &RawFrame, position: usize) -> bool {
    if !(2..=DIGIT_COUNT).contains(&position) {
        return false;
    }
    let (first, _) = digit_bytes(position);
    BitRef::new(first, 7).is_set(frame.as_ref())
}

/// The single decimal point of the legacy revision, as the digit position
/// it precedes. The leftmost lit boundary wins; `None` means an integer.
pub fn decimal_point_position(frame: &RawFrame) -> Option<usize> {
    (2..=DIGIT_COUNT).find(|&position| has_point_before(frame, position))
}

/// SI prefix, by priority mega, kilo, nano, micro, milli.
pub fn prefix(frame: &RawFrame) -> Prefix {
    PREFIX_BITS
        .iter()
        .find(|(bit, _)| bit.is_set(frame.as_ref()))
        .map(|(_, p)| *p)
        .unwrap_or(Prefix::None)
}

/// Unit annunciator, by priority V, Ω, Hz, F, A.
pub fn quantity_name(frame: &RawFrame) -> QuantityName {
    NAME_BITS
        .iter()
        .find(|(bit, _)| bit.is_set(frame.as_ref()))
        .map(|(_, n)| *n)
        .unwrap_or(QuantityName::None)
}

/// All status annunciators.
pub fn status_flags(frame: &RawFrame) -> StatusFlags {
    FLAG_BITS
        .iter()
        .filter(|(bit, _)| bit.is_set(frame.as_ref()))
        .map(|(_, flag)| *flag)
        .collect()
}
