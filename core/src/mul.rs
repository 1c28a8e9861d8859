//! Multiply and divide primitives shared by the M extension.
//!
//! An ALU variant adding signed/unsigned multiply and divide with a
//! two-word product and remainder. Kept separate from [`crate::alu`] since
//! these primitives need a wider intermediate (`2W` bits) that the base
//! ALU's single-register chaining doesn't model.

use crate::word::Word;

/// `a * b` as a `(high, low)` pair of `W`-wide words forming the full
/// `2W`-bit unsigned product.
#[must_use]
pub fn multiply_unsigned<W: Word>(a: W, b: W) -> (W, W) {
    let product = u128::from(a.to_u64()) * u128::from(b.to_u64());
    let lo = W::from_u64(product as u64);
    let hi = W::from_u64((product >> W::BITS) as u64);
    (hi, lo)
}

/// `a / b` and `a % b` as unsigned `W`-wide values. `b == 0` yields
/// `(all_ones, a)` per the divide-by-zero edge case.
#[must_use]
pub fn divide_unsigned<W: Word>(a: W, b: W) -> (W, W) {
    if b == W::ZERO {
        return (W::ALL_ONES, a);
    }
    let (a, b) = (a.to_u64(), b.to_u64());
    (W::from_u64(a / b), W::from_u64(a % b))
}

/// Signed multiply's full `2W`-bit product, as `(high, low)`.
#[must_use]
pub fn multiply_signed<W: Word>(a: W, b: W) -> (W, W) {
    let product = i128::from(a.to_i64()) * i128::from(b.to_i64());
    let lo = W::from_u64(product as u64);
    let hi = W::from_u64((product >> W::BITS) as u64);
    (hi, lo)
}

/// Signed×unsigned multiply (`a` signed, `b` unsigned), full `2W`-bit
/// product as `(high, low)`.
#[must_use]
pub fn multiply_signed_unsigned<W: Word>(a: W, b: W) -> (W, W) {
    let product = i128::from(a.to_i64()) * i128::from(b.to_u64() as i128);
    let lo = W::from_u64(product as u64);
    let hi = W::from_u64((product >> W::BITS) as u64);
    (hi, lo)
}

/// Signed `a / b` and `a % b`. `b == 0` yields `(all_ones, a)`; the
/// most-negative-by-`-1` overflow case yields `(a, 0)`.
#[must_use]
pub fn divide_signed<W: Word>(a: W, b: W) -> (W, W) {
    if b == W::ZERO {
        return (W::ALL_ONES, a);
    }
    let most_negative = W::SIGN_BIT;
    let minus_one = W::ALL_ONES;
    if a == most_negative && b == minus_one {
        return (a, W::ZERO);
    }
    let (a, b) = (a.to_i64(), b.to_i64());
    (W::from_i64(a / b), W::from_i64(a % b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_multiply_is_commutative() {
        let a = 0xFFFF_FFFFu32;
        let b = 0x1234_5678u32;
        assert_eq!(multiply_unsigned(a, b), multiply_unsigned(b, a));
    }

    #[test]
    fn unsigned_multiply_matches_u64_math() {
        let a = 0x1_0000u32;
        let b = 0x1_0000u32;
        let (hi, lo) = multiply_unsigned(a, b);
        assert_eq!((u64::from(hi) << 32) | u64::from(lo), 0x1_0000_0000);
    }

    #[test]
    fn divide_by_zero_yields_all_ones_and_dividend() {
        assert_eq!(divide_unsigned(42u32, 0), (u32::MAX, 42));
        assert_eq!(divide_signed(42u32, 0), (u32::MAX, 42));
    }

    #[test]
    fn unsigned_divide_satisfies_quotient_remainder_identity() {
        let (a, b) = (100u32, 7u32);
        let (q, r) = divide_unsigned(a, b);
        assert_eq!(q * b + r, a);
        assert!(r < b);
    }

    #[test]
    fn signed_divide_overflow_case() {
        let most_neg = i32::MIN as u32;
        let minus_one = u32::MAX;
        assert_eq!(divide_signed(most_neg, minus_one), (most_neg, 0));
    }
}
