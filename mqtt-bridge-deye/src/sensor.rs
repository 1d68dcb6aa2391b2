//! Sensor definitions and register decoding.

use std::fmt;

use crate::range::RegisterRange;
use crate::registers::RegisterMap;

/// How many registers a numeric value spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Words {
    /// One 16-bit register.
    One,
    /// Two registers, low word first.
    Two,
}

impl Words {
    /// Number of registers.
    pub const fn count(self) -> u16 {
        match self {
            Words::One => 1,
            Words::Two => 2,
        }
    }
}

/// Linear conversion from a raw integer to engineering units.
///
/// The result is `(raw + offset) * factor`, rounded to `decimals` places
/// the way `format!("{:.N}")` renders it. Formatting works on the exact
/// binary value of the product, so a product that is only close to a tie
/// rounds toward the side it actually lies on, and an exact tie such as
/// `2.5` rounds half to even.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub offset: i64,
    pub factor: f64,
    pub decimals: u8,
}

impl Scaling {
    /// Scale `raw` and round it to the configured number of decimals.
    pub fn apply(&self, raw: i64) -> DecodedValue {
        let scaled = (raw + self.offset) as f64 * self.factor;
        let rendered = format!("{:.*}", usize::from(self.decimals), scaled);
        DecodedValue::Number {
            value: rendered.parse().unwrap_or(scaled),
            decimals: self.decimals,
        }
    }
}

/// Decoding rule of a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeRule {
    /// Unsigned integer. All bits set means "no data".
    Unsigned { words: Words, scaling: Scaling },
    /// Two's complement integer. The minimum value means "no data".
    Signed { words: Words, scaling: Scaling },
    /// Enumerated code of one register. Unknown codes decode to nothing.
    Lookup(&'static [(u16, &'static str)]),
    /// One bit of a register, bit 0 being the least significant.
    Flag { bit: u8 },
}

impl DecodeRule {
    /// Number of registers the rule reads.
    pub const fn words(&self) -> u16 {
        match self {
            DecodeRule::Unsigned { words, .. } | DecodeRule::Signed { words, .. } => words.count(),
            DecodeRule::Lookup(_) | DecodeRule::Flag { .. } => 1,
        }
    }
}

/// A value decoded from registers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedValue {
    /// Measurement, already rounded to `decimals` places.
    Number { value: f64, decimals: u8 },
    /// Enumerated state.
    Label { code: u16, label: &'static str },
    /// Single bit.
    Flag(bool),
}

impl DecodedValue {
    /// Numeric form used in published payloads.
    pub fn as_f64(&self) -> f64 {
        match *self {
            DecodedValue::Number { value, .. } => value,
            DecodedValue::Label { code, .. } => f64::from(code),
            DecodedValue::Flag(set) => {
                if set {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodedValue::Number { value, decimals } => {
                write!(f, "{:.*}", usize::from(decimals), value)
            }
            DecodedValue::Label { label, .. } => f.write_str(label),
            DecodedValue::Flag(set) => write!(f, "{}", set),
        }
    }
}

/// A named metric decoded from one or more inverter registers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensor {
    /// Human readable name.
    pub name: &'static str,
    /// Metric name used for publishing. `None` means decode only.
    pub metric: Option<&'static str>,
    /// Unit of measurement.
    pub unit: &'static str,
    /// First register address.
    pub address: u16,
    pub rule: DecodeRule,
    /// Metric groups this sensor belongs to.
    pub groups: &'static [&'static str],
}

impl Sensor {
    const fn with_rule(name: &'static str, address: u16, rule: DecodeRule) -> Self {
        assert!(
            address as u32 + rule.words() as u32 <= u16::MAX as u32 + 1,
            "sensor registers must end within the address space"
        );
        Self {
            name,
            metric: None,
            unit: "",
            address,
            rule,
            groups: &[],
        }
    }

    /// One-register unsigned sensor.
    pub const fn unsigned(name: &'static str, address: u16, factor: f64, decimals: u8) -> Self {
        Self::numeric(name, address, Words::One, false, factor, decimals)
    }

    /// One-register signed sensor.
    pub const fn signed(name: &'static str, address: u16, factor: f64, decimals: u8) -> Self {
        Self::numeric(name, address, Words::One, true, factor, decimals)
    }

    /// Numeric sensor of any width and signedness.
    pub const fn numeric(
        name: &'static str,
        address: u16,
        words: Words,
        signed: bool,
        factor: f64,
        decimals: u8,
    ) -> Self {
        let scaling = Scaling {
            offset: 0,
            factor,
            decimals,
        };
        let rule = if signed {
            DecodeRule::Signed { words, scaling }
        } else {
            DecodeRule::Unsigned { words, scaling }
        };
        Self::with_rule(name, address, rule)
    }

    /// Enumerated sensor.
    pub const fn lookup(
        name: &'static str,
        address: u16,
        table: &'static [(u16, &'static str)],
    ) -> Self {
        Self::with_rule(name, address, DecodeRule::Lookup(table))
    }

    /// Bit flag sensor.
    pub const fn flag(name: &'static str, address: u16, bit: u8) -> Self {
        assert!(bit < 16, "flag bit must address a 16-bit register");
        Self::with_rule(name, address, DecodeRule::Flag { bit })
    }

    /// Publish under `metric`.
    pub const fn metric(mut self, metric: &'static str) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Set the unit of measurement.
    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Set the group memberships.
    pub const fn groups(mut self, groups: &'static [&'static str]) -> Self {
        self.groups = groups;
        self
    }

    /// Add a raw offset applied before scaling. No effect on lookups and flags.
    pub const fn offset(mut self, offset: i64) -> Self {
        match &mut self.rule {
            DecodeRule::Unsigned { scaling, .. } | DecodeRule::Signed { scaling, .. } => {
                scaling.offset = offset;
            }
            DecodeRule::Lookup(_) | DecodeRule::Flag { .. } => {}
        }
        self
    }

    /// Registers this sensor reads.
    pub const fn range(&self) -> RegisterRange {
        RegisterRange::with_len(self.address, self.rule.words())
    }

    /// Whether this sensor belongs to any of `groups`.
    pub fn in_any_group<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        groups
            .iter()
            .any(|g| self.groups.iter().any(|own| *own == g.as_ref()))
    }

    /// Decode this sensor from `registers`.
    ///
    /// Returns `None` when a required register is missing or the inverter
    /// reports "no data".
    pub fn read_value(&self, registers: &RegisterMap) -> Option<DecodedValue> {
        match self.rule {
            DecodeRule::Unsigned { words, scaling } => {
                let raw = self.read_raw(registers, words)?;
                let no_data = match words {
                    Words::One => u32::from(u16::MAX),
                    Words::Two => u32::MAX,
                };
                (raw != no_data).then(|| scaling.apply(i64::from(raw)))
            }
            DecodeRule::Signed { words, scaling } => {
                let raw = self.read_raw(registers, words)?;
                let value = match words {
                    Words::One => i64::from(raw as u16 as i16),
                    Words::Two => i64::from(raw as i32),
                };
                let no_data = match words {
                    Words::One => i64::from(i16::MIN),
                    Words::Two => i64::from(i32::MIN),
                };
                (value != no_data).then(|| scaling.apply(value))
            }
            DecodeRule::Lookup(table) => {
                let code = registers.word(self.address)?;
                table
                    .iter()
                    .find(|(c, _)| *c == code)
                    .map(|&(code, label)| DecodedValue::Label { code, label })
            }
            DecodeRule::Flag { bit } => registers
                .word(self.address)
                .map(|word| DecodedValue::Flag((word >> bit) & 1 == 1)),
        }
    }

    fn read_raw(&self, registers: &RegisterMap, words: Words) -> Option<u32> {
        let low = registers.word(self.address)?;
        match words {
            Words::One => Some(u32::from(low)),
            Words::Two => {
                let high = registers.word(self.address.checked_add(1)?)?;
                Some((u32::from(high) << 16) | u32::from(low))
            }
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.range())
    }
}
