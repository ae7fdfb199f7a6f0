//! Building a [`Reading`] from one frame.
//!
//! [`build_reading`] runs every field extractor over a validated frame and
//! hands the results to the value assembler. It keeps no state: the same
//! frame and timestamp always give the same reading.

use std::time::SystemTime;

use dmmlog_core::Reading;
use tracing::{trace, warn};

use crate::bits;
use crate::fields::{self, DIGIT_COUNT};
use crate::frame::{FrameCheck, RawFrame, ResyncReason, check_frame};
use crate::models::{BrymenModel, DecimalPoints};
use crate::segments::Glyph;
use crate::value;

/// The LCD text of a frame: sign, four glyphs and decimal points.
///
/// Unknown segment codes appear as `?` and are logged; the rest of the
/// frame still decodes.
///
/// # Example
///
/// ```
/// use dmmlog_brymen::models::bm257s;
/// use dmmlog_brymen::frame::{check_frame, FrameCheck};
/// use dmmlog_brymen::reading::display_text;
///
/// // " 5.00": digit 1 blank, then 5, 0, 0 with a point before digit 3.
/// let buf = [0x02, 0x10, 0x20, 0x30, 0x40, 0x5C, 0x67, 0x7F, 0x8B, 0x9E, 0xAB, 0xB0, 0xC0, 0xD0, 0xE0];
/// let FrameCheck::Valid(frame) = check_frame(&buf, bm257s().validation) else { panic!() };
/// assert_eq!(display_text(&frame, &bm257s()), " 5.00");
/// ```
pub fn display_text(frame: &RawFrame, model: &BrymenModel) -> String {
    let legacy_point = match model.decimal_points {
        DecimalPoints::Single => fields::decimal_point_position(frame),
        DecimalPoints::PerDigit => None,
    };

    let mut text = String::with_capacity(2 * DIGIT_COUNT + 1);
    if fields::has_minus(frame) {
        text.push('-');
    }
    for position in 1..=DIGIT_COUNT {
        let point = match model.decimal_points {
            DecimalPoints::Single => legacy_point == Some(position),
            DecimalPoints::PerDigit => fields::has_point_before(frame, position),
        };
        if point {
            text.push('.');
        }

        let Some(code) = fields::segment_pair(frame, position) else {
            continue;
        };
        let glyph = model.segments.lookup(code);
        if glyph == Glyph::Unknown {
            warn!(
                position,
                code = %code,
                table = model.segments.name,
                "unknown segment code"
            );
        }
        text.push(glyph.as_char());
    }
    text
}

/// Decode a validated frame into a reading stamped with `timestamp`.
pub fn build_reading(frame: &RawFrame, model: &BrymenModel, timestamp: SystemTime) -> Reading {
    trace!(frame = %bits::dump(frame.as_ref()), model = model.name, "decoding frame");

    let text = display_text(frame, model);
    let assembled = value::assemble(
        &text,
        fields::prefix(frame),
        fields::current_type(frame),
        fields::quantity_name(frame),
    );

    Reading {
        timestamp,
        value: assembled.value,
        quantity: assembled.quantity,
        display: assembled.display,
        flags: fields::status_flags(frame),
    }
}

/// Validate `buf` and decode it in one step.
///
/// Returns the resync reason when the bytes are not a usable frame; no
/// reading is ever built from rejected bytes.
pub fn decode(
    buf: &[u8],
    model: &BrymenModel,
    timestamp: SystemTime,
) -> Result<Reading, ResyncReason> {
    match check_frame(buf, model.validation) {
        FrameCheck::Valid(frame) => Ok(build_reading(&frame, model, timestamp)),
        FrameCheck::Resync(reason) => Err(reason),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frame::FRAME_LEN;
    use crate::models::{bm257, bm257s};
    use crate::segments::SegmentCode;
    use dmmlog_core::{Coupling, Quantity, StatusFlag, TemperatureScale};
    use std::time::{Duration, UNIX_EPOCH};

    /// Segment code of a printable glyph in the unified table.
    fn code_for(c: char) -> SegmentCode {
        crate::segments::UNIFIED
            .entries
            .iter()
            .find(|(_, g)| g.as_char() == c)
            .map(|(code, _)| *code)
            .unwrap_or_else(|| panic!("no segment code for {c:?}"))
    }

    /// Builder for test frames in the sequenced layout.
    pub(crate) struct TestFrame {
        buf: [u8; FRAME_LEN],
    }

    impl TestFrame {
        pub(crate) fn new() -> Self {
            let mut buf = [0u8; FRAME_LEN];
            for (i, b) in buf.iter_mut().enumerate() {
                *b = (i as u8) << 4;
            }
            buf[0] |= 0x02;
            TestFrame { buf }
        }

        /// Set the four digit glyphs. Points and sign are separate bits.
        pub(crate) fn digits(mut self, glyphs: &str) -> Self {
            let glyphs: Vec<char> = glyphs.chars().collect();
            assert_eq!(glyphs.len(), 4, "four glyphs expected");
            for (i, c) in glyphs.into_iter().enumerate() {
                let (first, second) = fields::digit_bytes(i + 1);
                let code = code_for(c);
                self.buf[first] = (self.buf[first] & 0xF1) | (code.upper << 1);
                self.buf[second] = (self.buf[second] & 0xF0) | code.lower;
            }
            self
        }

        /// Light the decimal point left of digit `position` (2..=4).
        pub(crate) fn point(self, position: usize) -> Self {
            let (first, _) = fields::digit_bytes(position);
            self.bit(first, 7)
        }

        pub(crate) fn minus(self) -> Self {
            self.bit(3, 7)
        }

        pub(crate) fn bit(mut self, byte: usize, index: u8) -> Self {
            self.buf[byte] |= bits::mask(index);
            self
        }

        pub(crate) fn raw_segments(mut self, position: usize, upper: u8, lower: u8) -> Self {
            let (first, second) = fields::digit_bytes(position);
            self.buf[first] = (self.buf[first] & 0xF1) | ((upper & 0x07) << 1);
            self.buf[second] = (self.buf[second] & 0xF0) | (lower & 0x0F);
            self
        }

        pub(crate) fn bytes(&self) -> [u8; FRAME_LEN] {
            self.buf
        }

        pub(crate) fn frame(&self) -> RawFrame {
            match check_frame(&self.buf, crate::frame::ValidationMode::Sequenced) {
                FrameCheck::Valid(frame) => frame,
                other => panic!("test frame rejected: {other:?}"),
            }
        }
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn dc_voltage_scenario() {
        let frame = TestFrame::new()
            .digits(" 500")
            .point(3)
            .bit(1, 5)
            .bit(14, 5);
        let reading = decode(&frame.bytes(), &bm257s(), at(1)).unwrap();
        assert_eq!(reading.value, Some(5.0));
        assert_eq!(reading.quantity, Quantity::Voltage(Coupling::Dc));
        assert_eq!(reading.display, "5.00V");
        assert_eq!(reading.timestamp, at(1));
        assert!(reading.flags.is_empty());
    }

    #[test]
    fn decimal_point_at_second_boundary() {
        let frame = TestFrame::new().digits("1234").point(3).frame();
        assert_eq!(display_text(&frame, &bm257s()), "12.34");
    }

    #[test]
    fn legacy_decimal_point_at_second_boundary() {
        let frame = TestFrame::new().digits("1234").point(3).frame();
        assert_eq!(display_text(&frame, &bm257()), "12.34");
    }

    #[test]
    fn point_sits_left_of_its_digit() {
        let frame = TestFrame::new().digits(" 500").point(3).frame();
        assert_eq!(display_text(&frame, &bm257s()), " 5.00");
        assert_eq!(display_text(&frame, &bm257()), "05.00");

        let frame = TestFrame::new().digits(" 500").point(2).frame();
        assert_eq!(display_text(&frame, &bm257s()), " .500");
    }

    #[test]
    fn legacy_takes_only_the_first_point() {
        let frame = TestFrame::new().digits("1234").point(2).point(4).frame();
        assert_eq!(display_text(&frame, &bm257()), "1.234");
        assert_eq!(display_text(&frame, &bm257s()), "1.23.4");
    }

    #[test]
    fn legacy_without_point_is_integer() {
        let frame = TestFrame::new().digits("1234").frame();
        assert_eq!(display_text(&frame, &bm257()), "1234");
    }

    #[test]
    fn kilo_prefix_scaling() {
        let frame = TestFrame::new().digits("1000").bit(11, 7).bit(12, 5);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, Some(1_000_000.0));
        assert_eq!(reading.quantity, Quantity::Resistance);
        assert_eq!(reading.display, "1000kΩ");
    }

    #[test]
    fn negative_reading() {
        let frame = TestFrame::new()
            .digits("0125")
            .minus()
            .point(2)
            .bit(1, 6)
            .bit(14, 6)
            .bit(13, 7);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert!((reading.value.unwrap() + 0.125e-3).abs() < 1e-15);
        assert_eq!(reading.quantity, Quantity::Current(Coupling::Ac));
        assert_eq!(reading.display, "-0.125mA");
    }

    #[test]
    fn blank_display_has_no_value() {
        let frame = TestFrame::new().digits("    ").bit(14, 5);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.quantity, Quantity::Voltage(Coupling::Unspecified));
    }

    #[test]
    fn overload_has_no_value() {
        let frame = TestFrame::new()
            .digits(" 0L ")
            .point(3)
            .bit(11, 6)
            .bit(12, 5);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.display, "0.LMΩ");
    }

    #[test]
    fn temperature_reading() {
        let frame = TestFrame::new().digits(" 23C").bit(14, 5);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, Some(23.0));
        assert_eq!(
            reading.quantity,
            Quantity::Temperature(TemperatureScale::Celsius)
        );
        assert_eq!(reading.display, "23°C");
    }

    #[test]
    fn electric_field_readings() {
        let banner = TestFrame::new().digits("EF  ");
        let reading = decode(&banner.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, Some(0.0));
        assert_eq!(reading.quantity, Quantity::ElectricField);

        let bars = TestFrame::new().digits("--- ");
        let reading = decode(&bars.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, Some(3.0));
        assert_eq!(reading.quantity, Quantity::ElectricField);
    }

    #[test]
    fn unknown_segment_keeps_rest_of_frame() {
        let frame = TestFrame::new()
            .digits("1234")
            .raw_segments(2, 0b001, 0b0001)
            .bit(14, 5)
            .bit(2, 6);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.value, None);
        assert_eq!(reading.quantity, Quantity::Voltage(Coupling::Unspecified));
        assert_eq!(reading.display, "1?34V");
        assert!(reading.flags.contains(StatusFlag::Hold));
    }

    #[test]
    fn flags_are_carried_into_reading() {
        let frame = TestFrame::new().digits("   0").bit(1, 7).bit(12, 4).bit(11, 4);
        let reading = decode(&frame.bytes(), &bm257s(), at(0)).unwrap();
        assert_eq!(reading.flags.to_string(), "AUTO,LOW_BATTERY,MAX,SCALE");
    }

    #[test]
    fn decoding_is_repeatable() {
        let frame = TestFrame::new()
            .digits("1234")
            .point(3)
            .bit(11, 7)
            .bit(12, 5)
            .bit(2, 6);
        let first = decode(&frame.bytes(), &bm257s(), at(7)).unwrap();
        let second = decode(&frame.bytes(), &bm257s(), at(7)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value.map(f64::to_bits), second.value.map(f64::to_bits));
    }

    #[test]
    fn rejected_bytes_never_build_a_reading() {
        let mut bytes = TestFrame::new().digits("1234").bytes();
        bytes[6] = 0x76;
        assert_eq!(
            decode(&bytes, &bm257s(), at(0)),
            Err(ResyncReason::Sequence { index: 6, found: 7 })
        );
        assert_eq!(
            decode(&bytes[..10], &bm257s(), at(0)),
            Err(ResyncReason::Length(10))
        );
    }

    #[test]
    fn legacy_model_reads_all_dark_digit_as_zero() {
        let frame = TestFrame::new().digits(" 500").point(3).bit(14, 5);
        let reading = decode(&frame.bytes(), &bm257(), at(0)).unwrap();
        assert_eq!(reading.display, "05.00V");
        assert_eq!(reading.value, Some(5.0));
    }
}
