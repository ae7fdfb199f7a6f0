//! Core types used throughout dmmlog.
//!
//! These types are the manufacturer-agnostic result of decoding a meter
//! frame. Protocol crates produce them; loggers, plotters and other
//! consumers receive them by value with no dependency on any decoder.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// AC/DC modifier of a voltage or current measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coupling {
    /// Direct current (`=` annunciator).
    Dc,
    /// Alternating current (`~` annunciator).
    Ac,
    /// Neither annunciator lit.
    Unspecified,
}

impl Coupling {
    /// The single-character annunciator the meter shows for this coupling.
    pub fn symbol(&self) -> char {
        match self {
            Coupling::Dc => '=',
            Coupling::Ac => '~',
            Coupling::Unspecified => ' ',
        }
    }
}

impl fmt::Display for Coupling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Coupling::Dc => "DC",
            Coupling::Ac => "AC",
            Coupling::Unspecified => "",
        };
        write!(f, "{s}")
    }
}

/// Temperature scale selected on the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureScale {
    Celsius,
    Fahrenheit,
}

/// Physical quantity of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Voltage(Coupling),
    Current(Coupling),
    Resistance,
    Capacitance,
    Frequency,
    Temperature(TemperatureScale),
    /// Non-contact voltage (electric field) detection.
    ElectricField,
    /// No unit annunciator was lit.
    Unknown,
}

impl Quantity {
    /// Compact machine-readable unit code, used in log files.
    ///
    /// # Example
    ///
    /// ```
    /// use dmmlog_core::{Coupling, Quantity};
    ///
    /// assert_eq!(Quantity::Voltage(Coupling::Dc).unit_code(), "VDC");
    /// assert_eq!(Quantity::Resistance.unit_code(), "OHM");
    /// ```
    pub fn unit_code(&self) -> &'static str {
        match self {
            Quantity::Voltage(Coupling::Dc) => "VDC",
            Quantity::Voltage(Coupling::Ac) => "VAC",
            Quantity::Voltage(Coupling::Unspecified) => "V",
            Quantity::Current(Coupling::Dc) => "ADC",
            Quantity::Current(Coupling::Ac) => "AAC",
            Quantity::Current(Coupling::Unspecified) => "A",
            Quantity::Resistance => "OHM",
            Quantity::Capacitance => "F",
            Quantity::Frequency => "HZ",
            Quantity::Temperature(TemperatureScale::Celsius) => "DEGC",
            Quantity::Temperature(TemperatureScale::Fahrenheit) => "DEGF",
            Quantity::ElectricField => "EF",
            Quantity::Unknown => "-",
        }
    }

    /// Human-readable unit suffix appended to display strings.
    ///
    /// Empty for quantities the meter shows as bare text (electric field
    /// detection, unknown).
    pub fn display_suffix(&self) -> &'static str {
        match self {
            Quantity::Voltage(_) => "V",
            Quantity::Current(_) => "A",
            Quantity::Resistance => "Ω",
            Quantity::Capacitance => "F",
            Quantity::Frequency => "Hz",
            Quantity::Temperature(TemperatureScale::Celsius) => "°C",
            Quantity::Temperature(TemperatureScale::Fahrenheit) => "°F",
            Quantity::ElectricField | Quantity::Unknown => "",
        }
    }

    /// The AC/DC modifier, for voltage and current.
    pub fn coupling(&self) -> Option<Coupling> {
        match self {
            Quantity::Voltage(c) | Quantity::Current(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Voltage(c) | Quantity::Current(c) if *c != Coupling::Unspecified => {
                write!(f, "{} {c}", self.display_suffix())
            }
            Quantity::ElectricField => write!(f, "EF"),
            Quantity::Unknown => write!(f, "?"),
            _ => write!(f, "{}", self.display_suffix()),
        }
    }
}

/// A single LCD annunciator reported alongside the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFlag {
    Auto,
    Hold,
    RelativeZero,
    Beep,
    LowBattery,
    LowImpedance,
    NegativeScale,
    Max,
    Min,
    Crest,
    Dbm,
    Scale,
}

impl StatusFlag {
    /// Every flag, in the order they are listed in log files.
    pub const ALL: [StatusFlag; 12] = [
        StatusFlag::Auto,
        StatusFlag::Hold,
        StatusFlag::RelativeZero,
        StatusFlag::Beep,
        StatusFlag::LowBattery,
        StatusFlag::LowImpedance,
        StatusFlag::NegativeScale,
        StatusFlag::Max,
        StatusFlag::Min,
        StatusFlag::Crest,
        StatusFlag::Dbm,
        StatusFlag::Scale,
    ];

    fn mask(self) -> u16 {
        1 << (self as u16)
    }

    /// Upper-case name as written in extended log lines.
    pub fn name(&self) -> &'static str {
        match self {
            StatusFlag::Auto => "AUTO",
            StatusFlag::Hold => "HOLD",
            StatusFlag::RelativeZero => "RELATIVE_ZERO",
            StatusFlag::Beep => "BEEP",
            StatusFlag::LowBattery => "LOW_BATTERY",
            StatusFlag::LowImpedance => "LOW_IMPEDANCE",
            StatusFlag::NegativeScale => "NEGATIVE_SCALE",
            StatusFlag::Max => "MAX",
            StatusFlag::Min => "MIN",
            StatusFlag::Crest => "CREST",
            StatusFlag::Dbm => "DBM",
            StatusFlag::Scale => "SCALE",
        }
    }
}

impl fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unordered set of [`StatusFlag`]s decoded from one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusFlags(u16);

impl StatusFlags {
    /// The empty set.
    pub fn empty() -> Self {
        StatusFlags(0)
    }

    pub fn insert(&mut self, flag: StatusFlag) {
        self.0 |= flag.mask();
    }

    /// Insert `flag` when `on` is true.
    pub fn set(&mut self, flag: StatusFlag, on: bool) {
        if on {
            self.insert(flag);
        } else {
            self.0 &= !flag.mask();
        }
    }

    pub fn contains(&self, flag: StatusFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the set flags in [`StatusFlag::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = StatusFlag> + '_ {
        StatusFlag::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<StatusFlag> for StatusFlags {
    fn from_iter<I: IntoIterator<Item = StatusFlag>>(iter: I) -> Self {
        let mut flags = StatusFlags::empty();
        for flag in iter {
            flags.insert(flag);
        }
        flags
    }
}

impl fmt::Display for StatusFlags {
    /// Comma-separated flag names, e.g. `AUTO,HOLD`. Empty when no flag is set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{flag}")?;
            first = false;
        }
        Ok(())
    }
}

/// One decoded display snapshot.
///
/// Built once per valid frame and never mutated afterwards. The decoder
/// keeps no reference to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Acquisition time of the frame.
    pub timestamp: SystemTime,
    /// Numeric value in base SI units, or `None` when the display did not
    /// show a number (overload, blank LCD, unknown segment pattern).
    pub value: Option<f64>,
    /// Physical quantity.
    pub quantity: Quantity,
    /// Display text, e.g. `"5.00V"` or `"1.000kΩ"`.
    pub display: String,
    /// Annunciators lit on the LCD.
    pub flags: StatusFlags,
}

impl Reading {
    /// Seconds since the Unix epoch, with sub-second precision.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
