//! Fixed-Point Math for the Power Perpetual Engine
//!
//! WAD (18-decimal) arithmetic over `u128` amounts, with `U256`
//! intermediates so products of two full-range values never wrap.
//! Every operation is checked and maps failures to typed errors.

use primitive_types::U256;

use crate::constants::scaling::WAD;
use crate::errors::{PerpError, PerpResult};

fn to_u128(value: U256) -> PerpResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(PerpError::Overflow);
    }
    Ok(value.low_u128())
}

/// (a * b) / denom with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, denom: u128) -> PerpResult<u128> {
    if denom == 0 {
        return Err(PerpError::DivisionByZero);
    }
    let prod = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(PerpError::Overflow)?;
    to_u128(prod / U256::from(denom))
}

/// (a * b) / denom with a 256-bit intermediate, rounding up
pub fn mul_div_up(a: u128, b: u128, denom: u128) -> PerpResult<u128> {
    if denom == 0 {
        return Err(PerpError::DivisionByZero);
    }
    let denom = U256::from(denom);
    let prod = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(PerpError::Overflow)?;
    let (quot, rem) = prod.div_mod(denom);
    let rounded = if rem.is_zero() {
        quot
    } else {
        quot.checked_add(U256::one()).ok_or(PerpError::Overflow)?
    };
    to_u128(rounded)
}

/// WAD multiplication, rounding down: (a * b) / 1e18
pub fn wad_mul(a: u128, b: u128) -> PerpResult<u128> {
    mul_div(a, b, WAD)
}

/// WAD multiplication, rounding up
pub fn wad_mul_up(a: u128, b: u128) -> PerpResult<u128> {
    mul_div_up(a, b, WAD)
}

/// WAD division, rounding down: (a * 1e18) / b
pub fn wad_div(a: u128, b: u128) -> PerpResult<u128> {
    mul_div(a, WAD, b)
}

/// Checked addition
pub fn safe_add(a: u128, b: u128) -> PerpResult<u128> {
    a.checked_add(b).ok_or(PerpError::Overflow)
}

/// Checked subtraction
pub fn safe_sub(a: u128, b: u128) -> PerpResult<u128> {
    a.checked_sub(b).ok_or(PerpError::Underflow)
}

/// WAD exponentiation by squaring: base^exp where base is WAD-scaled.
///
/// Used to turn mean ticks into prices (1.0001^tick). Per-step floor
/// rounding keeps the cumulative relative error below 1e-12 for any
/// exponent the oracle accepts.
pub fn wad_pow(base: u128, exp: u32) -> PerpResult<u128> {
    let mut result = WAD;
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = wad_mul(result, b)?;
        }
        e >>= 1;
        if e > 0 {
            b = wad_mul(b, b)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::oracle::TICK_BASE_WAD;

    /// Asserts two WAD values agree within `tol_bps` hundredths of a percent
    fn assert_close(actual: u128, expected: u128, tol_bps: u128) {
        let diff = actual.abs_diff(expected);
        assert!(
            diff * 10_000 <= expected * tol_bps,
            "actual {actual} vs expected {expected} (diff {diff})"
        );
    }

    #[test]
    fn test_wad_mul_basic() {
        // 1.5 * 2.0 = 3.0
        assert_eq!(wad_mul(3 * WAD / 2, 2 * WAD).unwrap(), 3 * WAD);
        assert_eq!(wad_mul(0, WAD).unwrap(), 0);
        assert_eq!(wad_mul(WAD, WAD).unwrap(), WAD);
    }

    #[test]
    fn test_wad_mul_rounding() {
        // 1 wei * 1 wei rounds to zero down, one up
        assert_eq!(wad_mul(1, 1).unwrap(), 0);
        assert_eq!(wad_mul_up(1, 1).unwrap(), 1);
        // exact results do not get bumped
        assert_eq!(wad_mul_up(2 * WAD, 3 * WAD).unwrap(), 6 * WAD);
    }

    #[test]
    fn test_wad_div() {
        assert_eq!(wad_div(6 * WAD, 3 * WAD).unwrap(), 2 * WAD);
        assert_eq!(wad_div(WAD, 2 * WAD).unwrap(), WAD / 2);
        assert!(matches!(wad_div(WAD, 0), Err(PerpError::DivisionByZero)));
    }

    #[test]
    fn test_mul_div_large_operands() {
        // exceeds u128 as an intermediate product, fits after division
        let a = u128::MAX / 2;
        assert_eq!(mul_div(a, 4, 2).unwrap(), u128::MAX - 1);
        // overflowing result is rejected
        assert!(matches!(
            mul_div(u128::MAX, u128::MAX, 1),
            Err(PerpError::Overflow)
        ));
    }

    #[test]
    fn test_safe_add_sub() {
        assert_eq!(safe_add(1, 2).unwrap(), 3);
        assert!(matches!(safe_add(u128::MAX, 1), Err(PerpError::Overflow)));
        assert_eq!(safe_sub(3, 2).unwrap(), 1);
        assert!(matches!(safe_sub(2, 3), Err(PerpError::Underflow)));
    }

    #[test]
    fn test_wad_pow_identities() {
        assert_eq!(wad_pow(TICK_BASE_WAD, 0).unwrap(), WAD);
        assert_eq!(wad_pow(TICK_BASE_WAD, 1).unwrap(), TICK_BASE_WAD);
        assert_eq!(wad_pow(2 * WAD, 10).unwrap(), 1024 * WAD);
    }

    #[test]
    fn test_wad_pow_tick_base() {
        // 1.0001^6932 ~= 2.0001
        let two_ish = wad_pow(TICK_BASE_WAD, 6_932).unwrap();
        assert_close(two_ish, 2 * WAD, 10);

        // 1.0001^76013 ~= 2000
        let two_thousand_ish = wad_pow(TICK_BASE_WAD, 76_013).unwrap();
        assert_close(two_thousand_ish, 2_000 * WAD, 10);
    }
}
