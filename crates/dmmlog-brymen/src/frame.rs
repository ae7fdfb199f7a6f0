//! Frame boundary and integrity checks.
//!
//! The meter sends one 15-byte frame per display update. Every byte carries
//! its own position in the high nibble, so a dropped or duplicated byte is
//! visible on the very next byte and the caller can resynchronize within one
//! frame instead of hunting for a magic value.
//!
//! # Frame format
//!
//! ```text
//! byte:  0    1    2    3    4   ...   13   14
//!       0x?2 0x1? 0x2? 0x3? 0x4? ... 0xD? 0xE?
//! ```
//!
//! - High nibble of byte `i`: sequence index `i`
//! - Low nibble of byte 0: header value `2` (sequenced revision)
//! - Low nibbles of bytes 1..=14: segment and annunciator bits

use std::fmt;

/// Number of bytes in one frame.
pub const FRAME_LEN: usize = 15;

/// Low nibble of byte 0 in sequenced frames.
pub const HEADER_NIBBLE: u8 = 0x2;

/// High nibble of byte 14 in legacy frames.
const LEGACY_TRAILER_NIBBLE: u8 = 0xE;

/// How strictly frames are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// Header nibble plus the per-byte sequence index of bytes 0..=13.
    #[default]
    Sequenced,
    /// Early firmware check: first and last high nibbles only.
    Legacy,
}

/// A length-checked, structurally valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    /// The frame bytes.
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// One byte by offset. Offsets come from the fixed field layout.
    pub(crate) fn byte(&self, index: usize) -> u8 {
        self.0[index]
    }
}

impl AsRef<[u8]> for RawFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Why a candidate frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    /// The transport delivered the wrong number of bytes.
    Length(usize),
    /// Byte 0 does not start a frame.
    Header(u8),
    /// A byte's high nibble does not match its position.
    Sequence {
        /// Byte offset within the candidate frame.
        index: usize,
        /// The high nibble found there.
        found: u8,
    },
    /// Byte 14 does not end a frame (legacy check).
    Trailer(u8),
}

impl fmt::Display for ResyncReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResyncReason::Length(n) => write!(f, "expected {FRAME_LEN} bytes, got {n}"),
            ResyncReason::Header(b) => write!(f, "bad header byte {b:#04x}"),
            ResyncReason::Sequence { index, found } => {
                write!(f, "byte {index} carries sequence index {found}")
            }
            ResyncReason::Trailer(b) => write!(f, "bad trailer byte {b:#04x}"),
        }
    }
}

/// Outcome of checking one candidate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCheck {
    /// The frame can be decoded.
    Valid(RawFrame),
    /// The byte stream is misaligned or corrupt; the caller must resync.
    Resync(ResyncReason),
}

impl FrameCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, FrameCheck::Valid(_))
    }
}

/// Check a candidate frame.
///
/// Performs no I/O. A [`FrameCheck::Resync`] result means the buffered bytes
/// must be thrown away and the transport realigned before the next read.
///
/// # Example
///
/// ```
/// use dmmlog_brymen::frame::{check_frame, FrameCheck, ResyncReason, ValidationMode};
///
/// let mut buf: Vec<u8> = (0..15u8).map(|i| i << 4).collect();
/// buf[0] |= 0x02;
/// assert!(check_frame(&buf, ValidationMode::Sequenced).is_valid());
///
/// buf[7] = 0x80;
/// assert_eq!(
///     check_frame(&buf, ValidationMode::Sequenced),
///     FrameCheck::Resync(ResyncReason::Sequence { index: 7, found: 8 })
/// );
/// ```
pub fn check_frame(buf: &[u8], mode: ValidationMode) -> FrameCheck {
    let bytes: [u8; FRAME_LEN] = match buf.try_into() {
        Ok(bytes) => bytes,
        Err(_) => return FrameCheck::Resync(ResyncReason::Length(buf.len())),
    };

    match mode {
        ValidationMode::Sequenced => {
            if bytes[0] & 0x0F != HEADER_NIBBLE {
                return FrameCheck::Resync(ResyncReason::Header(bytes[0]));
            }
            for (index, &b) in bytes.iter().enumerate().take(FRAME_LEN - 1) {
                let found = b >> 4;
                if usize::from(found) != index {
                    return FrameCheck::Resync(ResyncReason::Sequence { index, found });
                }
            }
        }
        ValidationMode::Legacy => {
            if bytes[0] >> 4 != 0 {
                return FrameCheck::Resync(ResyncReason::Header(bytes[0]));
            }
            if bytes[FRAME_LEN - 1] >> 4 != LEGACY_TRAILER_NIBBLE {
                return FrameCheck::Resync(ResyncReason::Trailer(bytes[FRAME_LEN - 1]));
            }
        }
    }

    FrameCheck::Valid(RawFrame(bytes))
}
