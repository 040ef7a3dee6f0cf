// The numeric value universe (§3.2 "Numeric", §4.4, §8.1-1/2).
//
// Each fixed-width kind wraps a native integer; the arbitrary
// precision kinds (`Int`, `UInt`, `Int256`, `UInt256`, `Word256`) wrap
// `num-bigint`, matching the bignum choice `sui-types` makes for the
// same on-chain-integer problem. `Word*` kinds wrap silently; every
// other kind fails with Overflow/Underflow the moment an operation
// would leave its declared range, per §3.3.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::errors::ValueError;

pub type NResult<T> = Result<T, ValueError>;

/// The Fix64/UFix64 scale factor: eight fractional decimal digits.
pub const FIX64_FACTOR: i64 = 100_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Word8,
    Word16,
    Word32,
    Word64,
    Word128,
    Word256,
    Fix64,
    UFix64,
}

impl NumericKind {
    pub fn is_word(&self) -> bool {
        matches!(
            self,
            NumericKind::Word8
                | NumericKind::Word16
                | NumericKind::Word32
                | NumericKind::Word64
                | NumericKind::Word128
                | NumericKind::Word256
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            NumericKind::Int
                | NumericKind::Int8
                | NumericKind::Int16
                | NumericKind::Int32
                | NumericKind::Int64
                | NumericKind::Int128
                | NumericKind::Int256
                | NumericKind::Fix64
        )
    }

    pub fn bit_width(&self) -> Option<u32> {
        use NumericKind::*;
        match self {
            Int8 | UInt8 | Word8 => Some(8),
            Int16 | UInt16 | Word16 => Some(16),
            Int32 | UInt32 | Word32 => Some(32),
            Int64 | UInt64 | Word64 | Fix64 | UFix64 => Some(64),
            Int128 | UInt128 | Word128 => Some(128),
            Int256 | UInt256 | Word256 => Some(256),
            Int | UInt => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use NumericKind::*;
        match self {
            Int => "Int",
            Int8 => "Int8",
            Int16 => "Int16",
            Int32 => "Int32",
            Int64 => "Int64",
            Int128 => "Int128",
            Int256 => "Int256",
            UInt => "UInt",
            UInt8 => "UInt8",
            UInt16 => "UInt16",
            UInt32 => "UInt32",
            UInt64 => "UInt64",
            UInt128 => "UInt128",
            UInt256 => "UInt256",
            Word8 => "Word8",
            Word16 => "Word16",
            Word32 => "Word32",
            Word64 => "Word64",
            Word128 => "Word128",
            Word256 => "Word256",
            Fix64 => "Fix64",
            UFix64 => "UFix64",
        }
    }

    /// Inclusive minimum, `None` for unbounded-below (`UInt`/`Word*`
    /// share a lower bound of zero, always representable).
    pub fn min_big(&self) -> BigInt {
        use NumericKind::*;
        match self {
            Int => min_unbounded_signed(),
            Int8 => BigInt::from(i8::MIN),
            Int16 => BigInt::from(i16::MIN),
            Int32 => BigInt::from(i32::MIN),
            Int64 => BigInt::from(i64::MIN),
            Int128 => BigInt::from(i128::MIN),
            Int256 => -(BigInt::from(1i32) << 255u32),
            Fix64 => BigInt::from(i64::MIN),
            UFix64 | UInt | UInt8 | UInt16 | UInt32 | UInt64 | UInt128 | UInt256 | Word8
            | Word16 | Word32 | Word64 | Word128 | Word256 => BigInt::zero(),
        }
    }

    /// Inclusive maximum; `None` for unbounded-above (`Int`/`UInt`).
    pub fn max_big(&self) -> Option<BigInt> {
        use NumericKind::*;
        Some(match self {
            Int | UInt => return None,
            Int8 => BigInt::from(i8::MAX),
            Int16 => BigInt::from(i16::MAX),
            Int32 => BigInt::from(i32::MAX),
            Int64 => BigInt::from(i64::MAX),
            Int128 => BigInt::from(i128::MAX),
            Int256 => (BigInt::from(1) << 255) - 1,
            UInt8 => BigInt::from(u8::MAX),
            UInt16 => BigInt::from(u16::MAX),
            UInt32 => BigInt::from(u32::MAX),
            UInt64 => BigInt::from(u64::MAX),
            UInt128 => BigInt::from(u128::MAX),
            UInt256 => (BigInt::from(1) << 256) - 1,
            Word8 => BigInt::from(u8::MAX),
            Word16 => BigInt::from(u16::MAX),
            Word32 => BigInt::from(u32::MAX),
            Word64 => BigInt::from(u64::MAX),
            Word128 => BigInt::from(u128::MAX),
            Word256 => (BigInt::from(1) << 256) - 1,
            Fix64 => BigInt::from(i64::MAX),
            UFix64 => BigInt::from(u64::MAX),
        })
    }
}

fn min_unbounded_signed() -> BigInt {
    // `Int` has no statically declared minimum; callers that need a
    // concrete bound (e.g. `min_big` consumers checking
    // `MinInt <= n`) should special-case `NumericKind::Int` instead
    // of relying on this sentinel. Kept only so `min_big` is total.
    BigInt::zero()
}

fn modulus(bits: u32) -> BigUint {
    BigUint::from(1u8) << bits
}

fn wrap_to_width(v: &BigInt, bits: u32) -> BigUint {
    let m = modulus(bits);
    let (sign, mag) = v.clone().into_parts();
    let mag = mag % &m;
    if sign == Sign::Minus && !mag.is_zero() {
        m - mag
    } else {
        mag
    }
}

/// A concrete numeric value, tagged by its `NumericKind`.
#[derive(Clone, Debug)]
pub struct Numeric {
    pub kind: NumericKind,
    value: BigInt,
}

impl Numeric {
    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.value
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.value.to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Construct a value of `kind` from an arbitrary-precision
    /// integer, range-checking against `kind`'s bounds (§3.3, §8.1-1).
    pub fn from_bigint(kind: NumericKind, v: BigInt) -> NResult<Numeric> {
        Self::check_range(kind, &v)?;
        Ok(Numeric { kind, value: v })
    }

    fn check_range(kind: NumericKind, v: &BigInt) -> NResult<()> {
        if !matches!(kind, NumericKind::Int) {
            let min = kind.min_big();
            if matches!(kind, NumericKind::UInt) {
                if v.sign() == Sign::Minus {
                    return Err(ValueError::Underflow);
                }
            } else if v < &min {
                return Err(ValueError::Underflow);
            }
            if let Some(max) = kind.max_big() {
                if v > &max {
                    return Err(ValueError::Overflow);
                }
            }
        }
        Ok(())
    }

    pub fn from_i64(kind: NumericKind, v: i64) -> NResult<Numeric> {
        Self::from_bigint(kind, BigInt::from(v))
    }

    pub fn from_u64(kind: NumericKind, v: u64) -> NResult<Numeric> {
        Self::from_bigint(kind, BigInt::from(v))
    }

    /// Convert this value to `target`, enforcing §3.3/§8.1-1: success
    /// iff `target.min <= self <= target.max`.
    pub fn convert(&self, target: NumericKind) -> NResult<Numeric> {
        if target.is_word() && self.kind.is_word() {
            // Word-to-word conversions wrap instead of failing,
            // matching the "Word* wrap silently" rule (§3.2) applied
            // at the boundary of a narrowing `Coerce`.
            let bits = target.bit_width().unwrap();
            let wrapped = wrap_to_width(&self.value, bits);
            return Ok(Numeric {
                kind: target,
                value: BigInt::from(wrapped),
            });
        }
        Numeric::from_bigint(target, self.value.clone())
    }

    /// Integer -> Fix64/UFix64, per §3.3's fixed-point scaling rule.
    pub fn int_to_fixed_point(n: &BigInt, kind: NumericKind) -> NResult<Numeric> {
        debug_assert!(matches!(kind, NumericKind::Fix64 | NumericKind::UFix64));
        if matches!(kind, NumericKind::UFix64) && n.sign() == Sign::Minus {
            return Err(ValueError::Underflow);
        }
        let scaled = n * FIX64_FACTOR;
        Numeric::from_bigint(kind, scaled)
    }

    fn same_kind(&self, other: &Numeric) -> NResult<()> {
        if self.kind != other.kind {
            // Binary numeric operators require identical types; a
            // mismatch here means the caller (the interpreter) built
            // an ill-typed AST node, which should have been rejected
            // by the checker. We still fail closed rather than panic.
            return Err(ValueError::InvalidOperands {
                op: "numeric",
                left: crate::static_type::StaticType::numeric(self.kind),
                right: crate::static_type::StaticType::numeric(other.kind),
            });
        }
        Ok(())
    }

    fn wrapping_result(&self, raw: BigInt) -> NResult<Numeric> {
        if self.kind.is_word() {
            let bits = self.kind.bit_width().unwrap();
            let wrapped = BigInt::from(wrap_to_width(&raw, bits));
            Ok(Numeric {
                kind: self.kind,
                value: wrapped,
            })
        } else {
            Numeric::from_bigint(self.kind, raw)
        }
    }

    pub fn checked_add(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value + &other.value)
    }

    pub fn checked_sub(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value - &other.value)
    }

    pub fn checked_mul(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value * &other.value)
    }

    pub fn checked_div(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        if other.value.is_zero() {
            return Err(ValueError::DivisionByZero);
        }
        self.wrapping_result(&self.value / &other.value)
    }

    pub fn checked_rem(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        if other.value.is_zero() {
            return Err(ValueError::DivisionByZero);
        }
        self.wrapping_result(&self.value % &other.value)
    }

    pub fn checked_bitand(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value & &other.value)
    }

    pub fn checked_bitor(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value | &other.value)
    }

    pub fn checked_bitxor(&self, other: &Numeric) -> NResult<Numeric> {
        self.same_kind(other)?;
        self.wrapping_result(&self.value ^ &other.value)
    }

    pub fn checked_shl(&self, bits: u32) -> NResult<Numeric> {
        self.wrapping_result(&self.value << bits)
    }

    pub fn checked_shr(&self, bits: u32) -> NResult<Numeric> {
        self.wrapping_result(&self.value >> bits)
    }

    pub fn negate(&self) -> NResult<Numeric> {
        if self.kind.is_word() || !self.kind.is_signed() {
            return Err(ValueError::InvalidOperands {
                op: "negate",
                left: crate::static_type::StaticType::numeric(self.kind),
                right: crate::static_type::StaticType::numeric(self.kind),
            });
        }
        self.wrapping_result(-&self.value)
    }

    pub fn cmp_value(&self, other: &Numeric) -> NResult<Ordering> {
        self.same_kind(other)?;
        Ok(self.value.cmp(&other.value))
    }

    pub fn equals(&self, other: &Numeric) -> bool {
        self.kind == other.kind && self.value == other.value
    }

    /// Two's-complement big-endian bytes (§4.1).
    pub fn to_big_endian_bytes(&self) -> Vec<u8> {
        match self.kind.bit_width() {
            Some(bits) if !self.kind.is_word() => {
                let nbytes = (bits / 8) as usize;
                fixed_width_be_bytes(&self.value, nbytes, self.kind.is_signed())
            }
            Some(bits) => {
                // Word* is always unsigned-at-rest.
                let nbytes = (bits / 8) as usize;
                let mag = self.value.to_biguint().unwrap_or_else(BigUint::zero);
                let mut bytes = mag.to_bytes_be();
                while bytes.len() < nbytes {
                    bytes.insert(0, 0);
                }
                bytes
            }
            None => {
                // Variable-width Int/UInt: minimal two's-complement
                // length, special-cased for zero (§4.1: `0 -> {0}`).
                if self.value.is_zero() {
                    vec![0]
                } else if self.kind.is_signed() {
                    minimal_twos_complement(&self.value)
                } else {
                    self.value.to_biguint().unwrap().to_bytes_be()
                }
            }
        }
    }

    pub fn from_big_endian_bytes(kind: NumericKind, bytes: &[u8]) -> NResult<Numeric> {
        let value = match kind.bit_width() {
            Some(_) if kind.is_word() || !kind.is_signed() => {
                BigInt::from(BigUint::from_bytes_be(bytes))
            }
            Some(_) => {
                if bytes.is_empty() {
                    BigInt::zero()
                } else {
                    let negative = bytes[0] & 0x80 != 0;
                    if negative {
                        BigInt::from_signed_bytes_be(bytes)
                    } else {
                        BigInt::from(BigUint::from_bytes_be(bytes))
                    }
                }
            }
            None if kind.is_signed() => {
                if bytes.is_empty() {
                    BigInt::zero()
                } else {
                    BigInt::from_signed_bytes_be(bytes)
                }
            }
            None => BigInt::from(BigUint::from_bytes_be(bytes)),
        };
        Numeric::from_bigint(kind, value)
    }

    /// `fromString` for fixed-point types: `[-]?D+\.D*` with at most
    /// 8 fractional digits (§4.4).
    pub fn fixed_point_from_string(kind: NumericKind, s: &str) -> Option<Numeric> {
        lazy_static::lazy_static! {
            static ref FIXED_POINT_RE: regex::Regex =
                regex::Regex::new(r"^(-)?([0-9]+)\.([0-9]*)$").unwrap();
        }
        let caps = FIXED_POINT_RE.captures(s)?;
        let negative = caps.get(1).is_some();
        if negative && matches!(kind, NumericKind::UFix64) {
            return None;
        }
        let int_part = caps.get(2)?.as_str();
        let frac_part = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        if frac_part.len() > 8 {
            return None;
        }
        let mut frac_digits = frac_part.to_string();
        while frac_digits.len() < 8 {
            frac_digits.push('0');
        }
        let int_val: BigInt = int_part.parse().ok()?;
        let frac_val: BigInt = frac_digits.parse().ok()?;
        let mut scaled = int_val * FIX64_FACTOR + frac_val;
        if negative {
            scaled = -scaled;
        }
        Numeric::from_bigint(kind, scaled).ok()
    }

    pub fn to_display_string(&self) -> String {
        match self.kind {
            NumericKind::Fix64 | NumericKind::UFix64 => fixed_point_to_string(&self.value),
            _ => self.value.to_string(),
        }
    }
}

fn fixed_point_to_string(scaled: &BigInt) -> String {
    let negative = scaled.sign() == Sign::Minus;
    let magnitude = scaled.magnitude().clone();
    let factor = BigUint::from(FIX64_FACTOR as u64);
    let int_part = &magnitude / &factor;
    let frac_part = &magnitude % &factor;
    let sign = if negative { "-" } else { "" };
    format!("{}{}.{:08}", sign, int_part, frac_part)
}

fn minimal_twos_complement(v: &BigInt) -> Vec<u8> {
    // `-1 -> {255}`, `128 -> {0, 128}` (§4.1): grow one byte at a
    // time until the value round-trips as a signed big-endian number.
    let mut nbytes = 1usize;
    loop {
        let bytes = fixed_width_be_bytes(v, nbytes, true);
        if &BigInt::from_signed_bytes_be(&bytes) == v {
            return bytes;
        }
        nbytes += 1;
    }
}

fn fixed_width_be_bytes(v: &BigInt, nbytes: usize, signed: bool) -> Vec<u8> {
    if signed {
        let mut bytes = v.to_signed_bytes_be();
        if bytes.len() < nbytes {
            let fill = if v.sign() == Sign::Minus { 0xffu8 } else { 0u8 };
            let mut padded = vec![fill; nbytes - bytes.len()];
            padded.append(&mut bytes);
            padded
        } else {
            bytes
        }
    } else {
        let mag = v.to_biguint().unwrap_or_else(BigUint::zero);
        let mut bytes = mag.to_bytes_be();
        if bytes.len() < nbytes {
            let mut padded = vec![0u8; nbytes - bytes.len()];
            padded.append(&mut bytes);
            padded
        } else {
            bytes
        }
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_overflows_at_the_declared_maximum() {
        let max = Numeric::from_i64(NumericKind::Int8, i8::MAX as i64).unwrap();
        let one = Numeric::from_i64(NumericKind::Int8, 1).unwrap();
        assert_eq!(max.checked_add(&one), Err(ValueError::Overflow));
    }

    #[test]
    fn word_kinds_wrap_instead_of_overflowing() {
        let max = Numeric::from_i64(NumericKind::Word8, u8::MAX as i64).unwrap();
        let one = Numeric::from_i64(NumericKind::Word8, 1).unwrap();
        let wrapped = max.checked_add(&one).unwrap();
        assert_eq!(wrapped.to_i64(), Some(0));
    }

    #[test]
    fn int_to_fixed_point_overflows_past_ufix64s_representable_integer_part() {
        // UFix64's backing u64 can represent at most u64::MAX / 1e8 as
        // an integer part; one past that raises Overflow rather than
        // silently truncating.
        let max_int_part = BigInt::from(u64::MAX / (FIX64_FACTOR as u64)) + 1;
        assert_eq!(
            Numeric::int_to_fixed_point(&max_int_part, NumericKind::UFix64),
            Err(ValueError::Overflow)
        );
    }

    #[test]
    fn fixed_point_round_trips_through_display() {
        let n = Numeric::fixed_point_from_string(NumericKind::UFix64, "12.34").unwrap();
        assert_eq!(n.to_display_string(), "12.34000000");
    }

    #[test]
    fn division_by_zero_is_reported_distinctly_from_overflow() {
        let a = Numeric::from_i64(NumericKind::Int, 10).unwrap();
        let zero = Numeric::from_i64(NumericKind::Int, 0).unwrap();
        assert_eq!(a.checked_div(&zero), Err(ValueError::DivisionByZero));
    }

    #[test]
    fn big_endian_round_trip_for_negative_fixed_width() {
        let n = Numeric::from_i64(NumericKind::Int16, -1).unwrap();
        let bytes = n.to_big_endian_bytes();
        assert_eq!(bytes, vec![0xff, 0xff]);
        let back = Numeric::from_big_endian_bytes(NumericKind::Int16, &bytes).unwrap();
        assert_eq!(back, n);
    }
}
