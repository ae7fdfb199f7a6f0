//! 7-segment glyph decoding.
//!
//! Each LCD digit is transmitted as two nibbles spread over a pair of bytes.
//! The first byte carries three segments in bits 4..=6 (MSB-first), the
//! second byte carries four segments in bits 4..=7:
//!
//! ```text
//!      a
//!    f   b        first byte:  [4]=a [5]=f [6]=e   ([7] is a marker bit)
//!      g          second byte: [4]=b [5]=g [6]=c [7]=d
//!    e   c
//!      d
//! ```
//!
//! Two table revisions exist. The legacy table is the one used by early
//! BM257 firmware decoders and only knows digits; the unified table adds
//! the blank digit and the letter glyphs later meters show for overload,
//! auto-range power-up, temperature and electric-field detection.

use std::fmt;

/// The pair of segment patterns for one digit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentCode {
    /// Segments a, f, e as a 3-bit value (a is the high bit).
    pub upper: u8,
    /// Segments b, g, c, d as a 4-bit value (b is the high bit).
    pub lower: u8,
}

impl SegmentCode {
    /// Build a code, masking each half to its width.
    pub const fn new(upper: u8, lower: u8) -> Self {
        SegmentCode {
            upper: upper & 0x07,
            lower: lower & 0x0F,
        }
    }

    /// Extract the code from the two bytes carrying one digit.
    pub const fn from_bytes(first: u8, second: u8) -> Self {
        SegmentCode::new(first >> 1, second)
    }
}

impl fmt::Display for SegmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03b}/{:04b}", self.upper, self.lower)
    }
}

/// One decoded LCD character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    /// A decimal digit 0..=9.
    Digit(u8),
    /// No segment lit.
    Blank,
    /// Only the middle segment lit.
    Minus,
    /// `A` of the power-up "Auto" banner.
    A,
    /// `u` of the power-up "Auto" banner.
    U,
    /// `t` of the power-up "Auto" banner.
    T,
    /// `o` of the power-up "Auto" banner.
    O,
    /// `E`: error, or the first letter of the electric-field "EF" banner.
    E,
    /// Celsius marker.
    C,
    /// Fahrenheit marker, or the second letter of "EF".
    F,
    /// Overload, shown as `0.L`.
    L,
    /// A segment pattern not in the table.
    Unknown,
}

impl Glyph {
    /// The character this glyph contributes to the display text.
    pub fn as_char(&self) -> char {
        match self {
            Glyph::Digit(d) => char::from(b'0' + d),
            Glyph::Blank => ' ',
            Glyph::Minus => '-',
            Glyph::A => 'A',
            Glyph::U => 'u',
            Glyph::T => 't',
            Glyph::O => 'o',
            Glyph::E => 'E',
            Glyph::C => 'C',
            Glyph::F => 'F',
            Glyph::L => 'L',
            Glyph::Unknown => '?',
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A versioned segment-code lookup table.
#[derive(Debug)]
pub struct SegmentTable {
    /// Revision name for diagnostics.
    pub name: &'static str,
    /// Every known code and the glyph it encodes.
    pub entries: &'static [(SegmentCode, Glyph)],
}

impl SegmentTable {
    /// Decode one code. Codes absent from the table decode to [`Glyph::Unknown`].
    pub fn lookup(&self, code: SegmentCode) -> Glyph {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, g)| *g)
            .unwrap_or(Glyph::Unknown)
    }
}

const fn entry(upper: u8, lower: u8, glyph: Glyph) -> (SegmentCode, Glyph) {
    (SegmentCode::new(upper, lower), glyph)
}

/// Early BM257 table: digits, with an all-dark digit read as `0` and the
/// `C` pattern only seen in the temperature position.
pub static LEGACY: SegmentTable = SegmentTable {
    name: "legacy",
    entries: &[
        entry(0b111, 0b1011, Glyph::Digit(0)),
        entry(0b000, 0b0000, Glyph::Digit(0)),
        entry(0b000, 0b1010, Glyph::Digit(1)),
        entry(0b101, 0b1101, Glyph::Digit(2)),
        entry(0b100, 0b1111, Glyph::Digit(3)),
        entry(0b010, 0b1110, Glyph::Digit(4)),
        entry(0b110, 0b0111, Glyph::Digit(5)),
        entry(0b111, 0b0111, Glyph::Digit(6)),
        entry(0b100, 0b1010, Glyph::Digit(7)),
        entry(0b111, 0b1111, Glyph::Digit(8)),
        entry(0b110, 0b1111, Glyph::Digit(9)),
        entry(0b111, 0b0001, Glyph::C),
    ],
};

/// Current table covering every glyph the BM25x family displays.
pub static UNIFIED: SegmentTable = SegmentTable {
    name: "unified",
    entries: &[
        entry(0b111, 0b1011, Glyph::Digit(0)),
        entry(0b000, 0b1010, Glyph::Digit(1)),
        entry(0b101, 0b1101, Glyph::Digit(2)),
        entry(0b100, 0b1111, Glyph::Digit(3)),
        entry(0b010, 0b1110, Glyph::Digit(4)),
        entry(0b110, 0b0111, Glyph::Digit(5)),
        entry(0b111, 0b0111, Glyph::Digit(6)),
        entry(0b100, 0b1010, Glyph::Digit(7)),
        entry(0b111, 0b1111, Glyph::Digit(8)),
        entry(0b110, 0b1111, Glyph::Digit(9)),
        entry(0b000, 0b0000, Glyph::Blank),
        entry(0b000, 0b0100, Glyph::Minus),
        entry(0b111, 0b1110, Glyph::A),
        entry(0b001, 0b0011, Glyph::U),
        entry(0b011, 0b0101, Glyph::T),
        entry(0b001, 0b0111, Glyph::O),
        entry(0b111, 0b0101, Glyph::E),
        entry(0b111, 0b0001, Glyph::C),
        entry(0b111, 0b0100, Glyph::F),
        entry(0b011, 0b0001, Glyph::L),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_codes() -> impl Iterator<Item = SegmentCode> {
        (0..8u8).flat_map(|upper| (0..16u8).map(move |lower| SegmentCode::new(upper, lower)))
    }

    #[test]
    fn code_from_bytes_ignores_marker_and_high_nibble() {
        // 0x3F: sequence nibble 3, segments 111, marker bit set.
        let code = SegmentCode::from_bytes(0x3F, 0x4B);
        assert_eq!(code, SegmentCode::new(0b111, 0b1011));
        assert_eq!(code.to_string(), "111/1011");
    }

    #[test]
    fn unified_table_documented_glyphs() {
        let expected = [
            ((0b111, 0b1011), '0'),
            ((0b000, 0b1010), '1'),
            ((0b101, 0b1101), '2'),
            ((0b100, 0b1111), '3'),
            ((0b010, 0b1110), '4'),
            ((0b110, 0b0111), '5'),
            ((0b111, 0b0111), '6'),
            ((0b100, 0b1010), '7'),
            ((0b111, 0b1111), '8'),
            ((0b110, 0b1111), '9'),
            ((0b000, 0b0000), ' '),
            ((0b000, 0b0100), '-'),
            ((0b111, 0b1110), 'A'),
            ((0b001, 0b0011), 'u'),
            ((0b011, 0b0101), 't'),
            ((0b001, 0b0111), 'o'),
            ((0b111, 0b0101), 'E'),
            ((0b111, 0b0001), 'C'),
            ((0b111, 0b0100), 'F'),
            ((0b011, 0b0001), 'L'),
        ];
        for ((upper, lower), c) in expected {
            let glyph = UNIFIED.lookup(SegmentCode::new(upper, lower));
            assert_eq!(glyph.as_char(), c, "code {upper:03b}/{lower:04b}");
        }
        assert_eq!(UNIFIED.entries.len(), expected.len());
    }

    #[test]
    fn legacy_table_documented_glyphs() {
        assert_eq!(LEGACY.lookup(SegmentCode::new(0b000, 0b0000)), Glyph::Digit(0));
        assert_eq!(LEGACY.lookup(SegmentCode::new(0b111, 0b1011)), Glyph::Digit(0));
        assert_eq!(LEGACY.lookup(SegmentCode::new(0b110, 0b1111)), Glyph::Digit(9));
        assert_eq!(LEGACY.lookup(SegmentCode::new(0b111, 0b0001)), Glyph::C);
        // Letters other than C are not part of the legacy revision.
        assert_eq!(LEGACY.lookup(SegmentCode::new(0b011, 0b0001)), Glyph::Unknown);
    }

    #[test]
    fn tables_have_no_duplicate_codes() {
        for table in [&LEGACY, &UNIFIED] {
            let codes: HashSet<_> = table.entries.iter().map(|(c, _)| *c).collect();
            assert_eq!(codes.len(), table.entries.len(), "{} table", table.name);
        }
    }

    #[test]
    fn every_code_decodes_without_panicking() {
        for table in [&LEGACY, &UNIFIED] {
            let known = all_codes()
                .filter(|c| table.lookup(*c) != Glyph::Unknown)
                .count();
            assert_eq!(known, table.entries.len(), "{} table", table.name);
        }
    }

    #[test]
    fn unknown_marker_char() {
        assert_eq!(Glyph::Unknown.as_char(), '?');
        assert_eq!(Glyph::Digit(7).to_string(), "7");
    }
}
