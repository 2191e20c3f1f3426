//! Arbitrary precision decimal with explicit precision enforcement.
//!
//! Positions in the unit square need ~0.3 decimal digits per zoom level,
//! so a session at level 200+ is far beyond f64. `BigDec` wraps a
//! decimal `DBig` and keeps an f64 internally when the requested
//! precision fits; the representation switch is transparent to callers.

use crate::error::{CoreError, CoreResult};
use dashu::integer::IBig;
use dashu_base::Approximation;
use dashu_float::round::mode::HalfAway;
use dashu_float::{DBig, FBig};
use serde::{Deserialize, Serialize};

/// Decimal digits an f64 can carry faithfully.
const F64_DIGITS: usize = 15;

/// Largest power-of-two exponent applied in one multiplication step.
/// Every 2^k with |k| <= 1000 is exactly representable as an f64.
const POW2_CHUNK: i64 = 1000;

#[derive(Clone, Debug)]
pub struct BigDec {
    value: BigDecValue,
    digits: usize,
}

#[derive(Clone, Debug)]
enum BigDecValue {
    F64(f64),
    Big(DBig),
}

/// Take the value out of a possibly-inexact conversion result.
fn resolve<T, E>(approx: Approximation<T, E>) -> T {
    match approx {
        Approximation::Exact(v) => v,
        Approximation::Inexact(v, _) => v,
    }
}

/// Convert a finite f64 to a decimal float at the given precision.
fn dbig_from_f64(val: f64, digits: usize) -> DBig {
    eprintln!("dbig_from_f64 enter val={} digits={}", val, digits);
    if val == 0.0 {
        return resolve(DBig::ZERO.with_precision(digits));
    }
    // Exact binary representation first, then an atomic base conversion
    // at the target precision.
    let binary = FBig::<HalfAway>::try_from(val).unwrap_or(FBig::ZERO);
    let decimal = resolve(binary.with_base_and_precision::<10>(digits));
    decimal.with_rounding::<HalfAway>()
}

impl BigDec {
    /// Create from f64 with explicit precision. `val` must be finite.
    pub fn from_f64(val: f64, digits: usize) -> Self {
        let value = if digits <= F64_DIGITS {
            BigDecValue::F64(val)
        } else {
            BigDecValue::Big(dbig_from_f64(val, digits))
        };
        Self { value, digits }
    }

    /// Create zero with explicit precision.
    pub fn zero(digits: usize) -> Self {
        Self::from_f64(0.0, digits)
    }

    /// Create one with explicit precision.
    pub fn one(digits: usize) -> Self {
        Self::from_f64(1.0, digits)
    }

    /// Parse a decimal string (plain or scientific notation).
    pub fn from_str(input: &str, digits: usize) -> CoreResult<Self> {
        if digits <= F64_DIGITS {
            let parsed: f64 = input.trim().parse().map_err(|e| CoreError::BadCoordinate {
                input: input.to_string(),
                reason: format!("{}", e),
            })?;
            if !parsed.is_finite() {
                return Err(CoreError::BadCoordinate {
                    input: input.to_string(),
                    reason: "not finite".to_string(),
                });
            }
            return Ok(Self::from_f64(parsed, digits));
        }

        let parsed: DBig = input.trim().parse().map_err(|e| CoreError::BadCoordinate {
            input: input.to_string(),
            reason: format!("{}", e),
        })?;
        Ok(Self {
            value: BigDecValue::Big(resolve(parsed.with_precision(digits))),
            digits,
        })
    }

    /// Requested precision in decimal digits.
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// Lossy conversion to f64.
    pub fn to_f64(&self) -> f64 {
        match &self.value {
            BigDecValue::F64(v) => *v,
            BigDecValue::Big(v) => resolve(v.to_f64()),
        }
    }

    fn to_dbig(&self) -> DBig {
        match &self.value {
            BigDecValue::F64(v) => dbig_from_f64(*v, self.digits),
            BigDecValue::Big(v) => v.clone(),
        }
    }

    fn wrap(value: DBig, digits: usize) -> Self {
        Self {
            value: BigDecValue::Big(value),
            digits,
        }
    }

    /// Add, preserving the larger precision.
    pub fn add(&self, other: &Self) -> Self {
        let digits = self.digits.max(other.digits);
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) if digits <= F64_DIGITS => {
                Self::from_f64(a + b, digits)
            }
            _ => Self::wrap(&self.to_dbig() + &other.to_dbig(), digits),
        }
    }

    /// Subtract, preserving the larger precision.
    pub fn sub(&self, other: &Self) -> Self {
        let digits = self.digits.max(other.digits);
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) if digits <= F64_DIGITS => {
                Self::from_f64(a - b, digits)
            }
            _ => Self::wrap(&self.to_dbig() - &other.to_dbig(), digits),
        }
    }

    /// Multiply, preserving the larger precision.
    pub fn mul(&self, other: &Self) -> Self {
        let digits = self.digits.max(other.digits);
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) if digits <= F64_DIGITS => {
                Self::from_f64(a * b, digits)
            }
            _ => Self::wrap(&self.to_dbig() * &other.to_dbig(), digits),
        }
    }

    /// Divide, preserving the larger precision.
    pub fn div(&self, other: &Self) -> Self {
        let digits = self.digits.max(other.digits);
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) if digits <= F64_DIGITS => {
                Self::from_f64(a / b, digits)
            }
            _ => Self::wrap(&self.to_dbig() / &other.to_dbig(), digits),
        }
    }

    /// Multiply by a plain f64 scalar. `scalar` must be finite.
    pub fn mul_f64(&self, scalar: f64) -> Self {
        self.mul(&Self::from_f64(scalar, self.digits))
    }

    /// Negate.
    pub fn neg(&self) -> Self {
        match &self.value {
            BigDecValue::F64(v) => Self {
                value: BigDecValue::F64(-v),
                digits: self.digits,
            },
            BigDecValue::Big(v) => Self::wrap(-v.clone(), self.digits),
        }
    }

    /// Scale by 2^exp without losing precision.
    ///
    /// The factor is applied in chunks whose f64 value is an exact power
    /// of two, so the only rounding is the final truncation to the
    /// working precision.
    pub fn mul_pow2(&self, exp: i64) -> Self {
        if exp == 0 {
            return self.clone();
        }
        match &self.value {
            BigDecValue::F64(v) if self.digits <= F64_DIGITS => Self {
                value: BigDecValue::F64(v * libm::exp2(exp as f64)),
                digits: self.digits,
            },
            _ => {
                let mut acc = self.to_dbig();
                let mut remaining = exp;
                while remaining != 0 {
                    let step = remaining.clamp(-POW2_CHUNK, POW2_CHUNK);
                    let factor = dbig_from_f64(libm::exp2(step as f64), self.digits);
                    acc = &acc * &factor;
                    remaining -= step;
                }
                Self::wrap(acc, self.digits)
            }
        }
    }

    /// 2^exp at the given precision, for fractional exponents.
    ///
    /// The integer part of the exponent is exact; the fractional factor
    /// lies in [1, 2) and is taken from the native exp2, which is the
    /// fast path for any |exp| and all the accuracy the fractional part
    /// can carry.
    pub fn pow2(exp: f64, digits: usize) -> Self {
        let int_part = exp.floor();
        let frac = exp - int_part;
        let base = Self::one(digits).mul_pow2(int_part as i64);
        if frac == 0.0 {
            base
        } else {
            base.mul_f64(libm::exp2(frac))
        }
    }

    /// Split into integer floor and fractional part.
    ///
    /// The floor is exact (arbitrary width); the fraction is in [0, 1)
    /// and reduced to f64, which is all downstream screen-space math
    /// needs.
    pub fn floor_split(&self) -> (IBig, f64) {
        match &self.value {
            BigDecValue::F64(v) => {
                let floor = v.floor();
                (IBig::from(floor as i128), v - floor)
            }
            BigDecValue::Big(v) => {
                let trunc = v.clone().trunc();
                let mut int = resolve(trunc.to_int());
                let mut frac = resolve((v - &trunc).to_f64());
                if frac < 0.0 {
                    int = int - IBig::ONE;
                    frac += 1.0;
                }
                (int, frac)
            }
        }
    }

    /// Clamp into [0, 1].
    pub fn clamp_unit(&self) -> Self {
        let zero = Self::zero(self.digits);
        let one = Self::one(self.digits);
        if *self < zero {
            zero
        } else if *self > one {
            one
        } else {
            self.clone()
        }
    }
}

impl PartialEq for BigDec {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) => a == b,
            _ => self.to_dbig() == other.to_dbig(),
        }
    }
}

impl PartialOrd for BigDec {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (&self.value, &other.value) {
            (BigDecValue::F64(a), BigDecValue::F64(b)) => a.partial_cmp(b),
            _ => self.to_dbig().partial_cmp(&other.to_dbig()),
        }
    }
}

impl std::fmt::Display for BigDec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            BigDecValue::F64(v) => write!(f, "{}", v),
            BigDecValue::Big(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct BigDecSerde {
    value: String,
    digits: usize,
}

impl Serialize for BigDec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        BigDecSerde {
            value: self.to_string(),
            digits: self.digits,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigDec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BigDecSerde::deserialize(deserializer)?;
        BigDec::from_str(&raw.value, raw.digits)
            .map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_from_f64_loop() {
        let t = std::time::Instant::now();
        for i in 0..5 {
            let v = i as f64 * 0.0001 + 0.1;
            let _ = BigDec::from_f64(v, 55);
        }
        eprintln!("2000 from_f64 took {:?}", t.elapsed());
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = BigDec::from_str("not a number", 60).unwrap_err();
        assert!(matches!(err, CoreError::BadCoordinate { .. }));
    }

    #[test]
    fn parse_preserves_deep_digits() {
        let a = BigDec::from_str("0.500000000000000000000000000000000000000000000000001", 60)
            .unwrap();
        let half = BigDec::from_str("0.5", 60).unwrap();
        assert!(a > half, "the 1e-51 tail must survive parsing");
    }

    #[test]
    fn arithmetic_keeps_larger_precision() {
        let a = BigDec::from_f64(1.5, 60);
        let b = BigDec::from_f64(2.5, 90);
        assert_eq!(a.add(&b).digits(), 90);
        assert_eq!(a.mul(&b).digits(), 90);
    }

    #[test]
    fn mul_pow2_matches_f64_at_shallow_exponents() {
        let x = BigDec::from_f64(0.3, 60);
        let scaled = x.mul_pow2(10);
        assert!((scaled.to_f64() - 0.3 * 1024.0).abs() < 1e-9);
    }

    #[test]
    fn mul_pow2_is_accurate_beyond_f64_range() {
        // 2^-1100 underflows f64 entirely; the chunked path must not.
        let x = BigDec::one(400).mul_pow2(-1100);
        assert!(x > BigDec::zero(400));
        let back = x.mul_pow2(1100);
        let diff = back.sub(&BigDec::one(400));
        assert!(diff.to_f64().abs() < 1e-300);
    }

    #[test]
    fn floor_split_small_values() {
        let x = BigDec::from_f64(3.25, 60);
        let (int, frac) = x.floor_split();
        assert_eq!(int, IBig::from(3));
        assert!((frac - 0.25).abs() < 1e-12);
    }

    #[test]
    fn floor_split_deep_scaled_position() {
        // 0.5 * 2^200 has an exact integer floor of 2^199.
        let x = BigDec::from_str("0.5", 90).unwrap().mul_pow2(200);
        let (int, frac) = x.floor_split();
        let expected = IBig::from(2).pow(199);
        assert_eq!(int, expected);
        assert!(frac.abs() < 1e-12);
    }

    #[test]
    fn floor_split_negative_value() {
        let x = BigDec::from_f64(-0.25, 60);
        let (int, frac) = x.floor_split();
        assert_eq!(int, IBig::from(-1));
        assert!((frac - 0.75).abs() < 1e-12);
    }

    #[test]
    fn clamp_unit_bounds() {
        let lo = BigDec::from_f64(-0.5, 60).clamp_unit();
        let hi = BigDec::from_f64(1.5, 60).clamp_unit();
        let mid = BigDec::from_f64(0.25, 60).clamp_unit();
        assert_eq!(lo, BigDec::zero(60));
        assert_eq!(hi, BigDec::one(60));
        assert_eq!(mid, BigDec::from_f64(0.25, 60));
    }

    #[test]
    fn pow2_fractional_exponent() {
        let x = BigDec::pow2(2.5, 60);
        assert!((x.to_f64() - 5.656854249492381).abs() < 1e-12);
    }

    #[test]
    fn serde_roundtrip_preserves_value() {
        let original = BigDec::from_str("0.52010500000000000000000000000001", 60).unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let restored: BigDec = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.digits(), 60);
    }
}
