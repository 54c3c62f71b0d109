//! Funding Engine
//!
//! Continuous funding accrual for the power perpetual. Each application
//! moves the global normalization factor by a rational multiplier that
//! converges the denormalized mark price toward the index over one
//! funding period. Called at the top of every state-mutating entrypoint.

use primitive_types::U256;

use crate::constants::funding::FUNDING_PERIOD_SECS;
use crate::constants::scaling::{INDEX_SCALE, WAD};
use crate::errors::{PerpError, PerpResult};
use crate::math::{mul_div, wad_mul};
use crate::oracle::PriceOracle;
use crate::types::{ControllerConfig, ProtocolState};

/// Index price over the given window: collateral price squared, descaled
/// by the index scale, in quote units (WAD).
pub fn get_index(
    oracle: &PriceOracle,
    config: &ControllerConfig,
    period: u32,
    now: u64,
) -> PerpResult<u128> {
    let collateral_price = oracle.get_twap_safe(
        config.collateral_quote_pool,
        config.collateral_asset,
        config.quote_asset,
        period,
        now,
    )?;
    mul_div(collateral_price, collateral_price, WAD * INDEX_SCALE)
}

/// Denormalized mark price over the given window: the perpetual's traded
/// price re-expressed in quote units and divided by the current
/// normalization factor.
pub fn get_denormalized_mark(
    oracle: &PriceOracle,
    config: &ControllerConfig,
    normalization_factor: u128,
    period: u32,
    now: u64,
) -> PerpResult<u128> {
    let collateral_price = oracle.get_twap_safe(
        config.collateral_quote_pool,
        config.collateral_asset,
        config.quote_asset,
        period,
        now,
    )?;
    let perp_price = oracle.get_twap_safe(
        config.power_perp_pool,
        config.power_perp_asset,
        config.collateral_asset,
        period,
        now,
    )?;
    let mark = wad_mul(collateral_price, perp_price)?;
    mul_div(mark, WAD, normalization_factor)
}

/// Computes the post-funding normalization factor.
///
/// With funding ratio `r = elapsed / funding_period` the update is
/// `norm * mark / ((1 + r) * mark - r * index)`. The denominator must be
/// strictly positive; a zero or negative denominator is a degenerate
/// market state and fails rather than producing a nonsensical factor.
pub fn compute_normalization_factor(
    normalization_factor: u128,
    mark: u128,
    index: u128,
    elapsed: u64,
    funding_period: u64,
) -> PerpResult<u128> {
    if elapsed == 0 {
        return Ok(normalization_factor);
    }
    if funding_period == 0 {
        return Err(PerpError::DivisionByZero);
    }
    if mark == 0 {
        return Err(PerpError::FundingComputationError { mark, index });
    }

    // r in WAD
    let ratio = mul_div(elapsed as u128, WAD, funding_period as u128)?;

    // denominator = (1 + r) * mark - r * index, in WAD, exact in U256
    let one_plus_r = U256::from(WAD)
        .checked_add(U256::from(ratio))
        .ok_or(PerpError::Overflow)?;
    let lhs = one_plus_r
        .checked_mul(U256::from(mark))
        .ok_or(PerpError::Overflow)?;
    let rhs = U256::from(ratio)
        .checked_mul(U256::from(index))
        .ok_or(PerpError::Overflow)?;
    if lhs <= rhs {
        return Err(PerpError::FundingComputationError { mark, index });
    }
    let denominator = (lhs - rhs) / U256::from(WAD);
    if denominator.is_zero() {
        return Err(PerpError::FundingComputationError { mark, index });
    }

    // norm * mark / denominator
    let scaled = U256::from(normalization_factor)
        .checked_mul(U256::from(mark))
        .ok_or(PerpError::Overflow)?
        / denominator;
    if scaled > U256::from(u128::MAX) {
        return Err(PerpError::Overflow);
    }
    Ok(scaled.low_u128())
}

/// Applies funding to the protocol state using fresh TWAPs.
///
/// The lookback window is the elapsed time since the last update, capped
/// to what both price pools can serve, so the oracle is never asked for
/// a window it cannot cover. Zero elapsed time is an exact no-op.
/// Returns the (possibly unchanged) normalization factor.
pub fn apply_funding(
    state: &mut ProtocolState,
    oracle: &PriceOracle,
    config: &ControllerConfig,
    now: u64,
) -> PerpResult<u128> {
    let elapsed = now.saturating_sub(state.last_funding_update);
    if elapsed == 0 {
        return Ok(state.normalization_factor);
    }

    let period = elapsed
        .min(oracle.get_max_period(config.collateral_quote_pool, now)? as u64)
        .min(oracle.get_max_period(config.power_perp_pool, now)? as u64)
        .min(u32::MAX as u64) as u32;
    if period == 0 {
        return Err(PerpError::StaleOrInvalidPrice {
            pool: config.collateral_quote_pool,
        });
    }

    let index = get_index(oracle, config, period, now)?;
    let mark = get_denormalized_mark(oracle, config, state.normalization_factor, period, now)?;

    let new_factor = compute_normalization_factor(
        state.normalization_factor,
        mark,
        index,
        elapsed,
        FUNDING_PERIOD_SECS,
    )?;

    state.normalization_factor = new_factor;
    state.last_funding_update = now;
    Ok(new_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_elapsed_is_noop() {
        let norm = compute_normalization_factor(WAD, 2 * WAD, WAD, 0, FUNDING_PERIOD_SECS).unwrap();
        assert_eq!(norm, WAD);
    }

    #[test]
    fn test_mark_equals_index_is_noop() {
        // any elapsed time: denominator reduces to mark exactly
        for elapsed in [1u64, 3_600, 86_400, 7 * 86_400] {
            let norm = compute_normalization_factor(
                WAD,
                400 * WAD,
                400 * WAD,
                elapsed,
                FUNDING_PERIOD_SECS,
            )
            .unwrap();
            assert_eq!(norm, WAD);
        }
    }

    #[test]
    fn test_mark_above_index_shrinks_factor() {
        // longs pay shorts: norm decreases toward parity
        let norm = compute_normalization_factor(
            WAD,
            410 * WAD,
            400 * WAD,
            86_400,
            FUNDING_PERIOD_SECS,
        )
        .unwrap();
        // r = 1: multiplier = 410 / (2*410 - 400) = 410/420
        assert_eq!(norm, mul_div(WAD, 410 * WAD, 420 * WAD).unwrap());
        assert!(norm < WAD);
    }

    #[test]
    fn test_mark_below_index_grows_factor() {
        let norm = compute_normalization_factor(
            WAD,
            390 * WAD,
            400 * WAD,
            86_400,
            FUNDING_PERIOD_SECS,
        )
        .unwrap();
        // r = 1: multiplier = 390 / (2*390 - 400) = 390/380
        assert_eq!(norm, mul_div(WAD, 390 * WAD, 380 * WAD).unwrap());
        assert!(norm > WAD);
    }

    #[test]
    fn test_degenerate_denominator_fails() {
        // (1+r)*mark <= r*index: with r = 1, mark = 100, index = 300
        let result = compute_normalization_factor(
            WAD,
            100 * WAD,
            300 * WAD,
            86_400,
            FUNDING_PERIOD_SECS,
        );
        assert!(matches!(
            result,
            Err(PerpError::FundingComputationError { .. })
        ));

        // exactly zero denominator also fails
        let result =
            compute_normalization_factor(WAD, 100 * WAD, 200 * WAD, 86_400, FUNDING_PERIOD_SECS);
        assert!(matches!(
            result,
            Err(PerpError::FundingComputationError { .. })
        ));
    }

    #[test]
    fn test_zero_mark_fails() {
        let result = compute_normalization_factor(WAD, 0, 400 * WAD, 60, FUNDING_PERIOD_SECS);
        assert!(matches!(
            result,
            Err(PerpError::FundingComputationError { .. })
        ));
    }

    #[test]
    fn test_funding_is_composable() {
        // applying two half-day steps lands close to one full-day step
        let half = compute_normalization_factor(WAD, 410 * WAD, 400 * WAD, 43_200, FUNDING_PERIOD_SECS)
            .unwrap();
        let two_halves =
            compute_normalization_factor(half, 410 * WAD, 400 * WAD, 43_200, FUNDING_PERIOD_SECS)
                .unwrap();
        let full = compute_normalization_factor(WAD, 410 * WAD, 400 * WAD, 86_400, FUNDING_PERIOD_SECS)
            .unwrap();
        let diff = two_halves.abs_diff(full);
        // compounding two half periods is not identical to one full
        // period, but stays within a tenth of a percent here
        assert!(diff * 1_000 < full);
    }
}
