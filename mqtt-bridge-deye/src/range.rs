//! Register address ranges and read coalescing.

use std::fmt;

/// A half-open interval `[start, end)` of register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegisterRange {
    start: u16,
    end: u32,
}

impl RegisterRange {
    /// Create a range covering `start..end`.
    ///
    /// Returns `None` for empty or inverted ranges.
    pub fn new(start: u16, end: u32) -> Option<Self> {
        (u32::from(start) < end && end <= u32::from(u16::MAX) + 1).then_some(Self { start, end })
    }

    /// Create a range from its first and last register, both included.
    ///
    /// This is how inverter register tables list their blocks. Panics if
    /// `last < first`.
    pub const fn inclusive(first: u16, last: u16) -> Self {
        assert!(first <= last, "register range must not be inverted");
        Self {
            start: first,
            end: last as u32 + 1,
        }
    }

    /// Range of `count` registers starting at `start`.
    ///
    /// Panics if the range is empty or runs past address `0xffff`.
    pub const fn with_len(start: u16, count: u16) -> Self {
        assert!(count > 0, "register range must not be empty");
        let end = start as u32 + count as u32;
        assert!(
            end <= u16::MAX as u32 + 1,
            "register range must end within the address space"
        );
        Self { start, end }
    }

    /// First register address.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// One past the last register address.
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Last register address.
    pub fn last(&self) -> u16 {
        (self.end - 1) as u16
    }

    /// Number of registers covered. Never zero.
    pub fn count(&self) -> u16 {
        (self.end - u32::from(self.start)) as u16
    }

    /// Iterate over the covered register addresses.
    pub fn addresses(&self) -> std::ops::RangeInclusive<u16> {
        self.start..=self.last()
    }

    /// Whether `address` lies in this range.
    pub fn contains(&self, address: u16) -> bool {
        address >= self.start && u32::from(address) < self.end
    }
}

impl fmt::Display for RegisterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}..={:#06x}", self.start, self.last())
    }
}

/// Coalesce register ranges into the fewest disjoint reads.
///
/// Overlapping and adjacent ranges are merged; nested ranges are absorbed.
/// The output is sorted by start address and does not depend on the
/// order of the input.
pub fn merge_ranges<I>(ranges: I) -> Vec<RegisterRange>
where
    I: IntoIterator<Item = RegisterRange>,
{
    let mut sorted: Vec<RegisterRange> = ranges.into_iter().collect();
    sorted.sort_unstable();

    let mut merged: Vec<RegisterRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(current) if u32::from(range.start) <= current.end => {
                current.end = current.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}
