//! Bit access within a frame.
//!
//! Brymen's protocol notes number the bits of each byte as they appear in
//! the printed binary string: index 0 is the most significant bit, index 7
//! the least significant. [`BitRef`] keeps that numbering so the field tables
//! in [`fields`](crate::fields) can be read side by side with a bit dump,
//! while the actual test is a single mask operation.

use std::fmt;

/// Render `byte` as eight binary digits, most significant first.
///
/// # Example
///
/// ```
/// use dmmlog_brymen::bits::bit_string;
///
/// assert_eq!(bit_string(0x02), "00000010");
/// assert_eq!(bit_string(0xE5), "11100101");
/// ```
pub fn bit_string(byte: u8) -> String {
    format!("{byte:08b}")
}

/// Mask selecting MSB-first bit `index` (0..=7) of a byte.
pub const fn mask(index: u8) -> u8 {
    0x80 >> index
}

/// Whether MSB-first bit `index` of `byte` is set.
pub const fn bit_at(byte: u8, index: u8) -> bool {
    byte & mask(index) != 0
}

/// A single flag bit at a fixed position within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRef {
    /// Byte offset within the frame.
    pub byte: usize,
    /// MSB-first bit index within the byte.
    pub index: u8,
}

impl BitRef {
    pub const fn new(byte: usize, index: u8) -> Self {
        BitRef { byte, index }
    }

    /// Test this bit in `frame`. Out-of-range offsets read as clear.
    pub fn is_set(&self, frame: &[u8]) -> bool {
        frame
            .get(self.byte)
            .is_some_and(|&b| bit_at(b, self.index))
    }
}

impl fmt::Display for BitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte{}[{}]", self.byte, self.index)
    }
}

/// Space-separated bit strings for every byte, for trace output.
pub fn dump(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|&b| bit_string(b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_string_has_leading_zeros() {
        assert_eq!(bit_string(0x00), "00000000");
        assert_eq!(bit_string(0x01), "00000001");
        assert_eq!(bit_string(0xFF), "11111111");
    }

    #[test]
    fn bit_at_matches_string_indexing_for_every_byte() {
        for byte in 0..=u8::MAX {
            let s = bit_string(byte);
            for (index, c) in s.chars().enumerate() {
                assert_eq!(bit_at(byte, index as u8), c == '1', "byte {byte:#04x} index {index}");
            }
        }
    }

    #[test]
    fn masks() {
        assert_eq!(mask(0), 0x80);
        assert_eq!(mask(4), 0x08);
        assert_eq!(mask(7), 0x01);
    }

    #[test]
    fn bit_ref_reads_frame() {
        let frame = [0x00, 0x04, 0x00];
        assert!(BitRef::new(1, 5).is_set(&frame));
        assert!(!BitRef::new(1, 6).is_set(&frame));
        assert!(!BitRef::new(9, 0).is_set(&frame));
    }

    #[test]
    fn bit_ref_display() {
        assert_eq!(BitRef::new(14, 5).to_string(), "byte14[5]");
    }

    #[test]
    fn dump_joins_bytes() {
        assert_eq!(dump(&[0x02, 0x80]), "00000010 10000000");
    }
}
