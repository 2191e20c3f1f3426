//! Precision policy for deep-zoom coordinates.
//!
//! Determines how many decimal digits position arithmetic needs to
//! faithfully represent a point at a given zoom level, and threads that
//! choice explicitly through all coordinate construction.

/// Floor on working precision, in decimal digits.
const MIN_DIGITS: usize = 50;

/// Extra digits carried beyond the level-derived requirement.
const HEADROOM_DIGITS: f64 = 20.0;

/// Decimal digits required to represent positions at `level`.
///
/// At level L adjacent tiles are 2^-L apart, i.e. ~0.301·L decimal
/// digits below unity; 0.35·L plus headroom covers that with margin for
/// accumulated rounding across pan/zoom chains.
pub fn digits_for_level(level: f64) -> usize {
    let needed = (level.max(0.0) * 0.35 + HEADROOM_DIGITS).ceil() as usize;
    needed.max(MIN_DIGITS)
}

/// Explicit working precision for position arithmetic.
///
/// Created per dataset from its deepest expected level, and only ever
/// grows: re-loading a shallower dataset never degrades coordinates
/// already held at higher precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecisionContext {
    digits: usize,
}

impl PrecisionContext {
    /// Context with the minimum working precision.
    pub fn new() -> Self {
        Self { digits: MIN_DIGITS }
    }

    /// Context sized for a dataset whose deepest level is `max_level`.
    pub fn for_level(max_level: f64) -> Self {
        Self {
            digits: digits_for_level(max_level),
        }
    }

    /// Working precision in decimal digits.
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Grow the context to cover `level`. Never shrinks.
    pub fn raise_for_level(&mut self, level: f64) {
        self.digits = self.digits.max(digits_for_level(level));
    }
}

impl Default for PrecisionContext {
    fn default() -> Self {
        Self::new()
    }
}
