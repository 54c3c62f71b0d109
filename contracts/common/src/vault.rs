//! Vault Accounting
//!
//! Pure functions over a `Vault` value: collateral/debt mutation with
//! underflow guards and the collateralization-ratio check. No I/O here;
//! the controller owns sequencing and price lookups.

use crate::constants::ratios::BPS_DENOMINATOR;
use crate::constants::scaling::{INDEX_SCALE, WAD};
use crate::errors::{PerpError, PerpResult};
use crate::math::{mul_div_up, safe_add, safe_sub, wad_mul_up};
use crate::types::Vault;

/// Add collateral to a vault
pub fn add_collateral(vault: &mut Vault, amount: u128) -> PerpResult<()> {
    vault.collateral = safe_add(vault.collateral, amount)?;
    Ok(())
}

/// Remove collateral from a vault
pub fn remove_collateral(vault: &mut Vault, amount: u128) -> PerpResult<()> {
    vault.collateral =
        safe_sub(vault.collateral, amount).map_err(|_| PerpError::InsufficientCollateral {
            available: vault.collateral,
            requested: amount,
        })?;
    Ok(())
}

/// Add debt notional to a vault
pub fn add_debt(vault: &mut Vault, amount: u128) -> PerpResult<()> {
    vault.short_amount = safe_add(vault.short_amount, amount)?;
    Ok(())
}

/// Remove debt notional from a vault
pub fn remove_debt(vault: &mut Vault, amount: u128) -> PerpResult<()> {
    vault.short_amount =
        safe_sub(vault.short_amount, amount).map_err(|_| PerpError::InsufficientDebt {
            available: vault.short_amount,
            requested: amount,
        })?;
    Ok(())
}

/// Collateral value of a debt notional: short * norm * price, descaled by
/// the index scale. This is the settlement value of the short side, and
/// the base the minimum collateral ratio multiplies into.
pub fn debt_value_in_collateral(
    short_amount: u128,
    normalization_factor: u128,
    collateral_price: u128,
) -> PerpResult<u128> {
    let normalized = wad_mul_up(short_amount, normalization_factor)?;
    mul_div_up(normalized, collateral_price, WAD * INDEX_SCALE)
}

/// Minimum collateral required to back a short at the given ratio.
/// Rounds up at every step so rounding error can never let an
/// undercollateralized vault pass.
pub fn required_collateral(
    short_amount: u128,
    normalization_factor: u128,
    collateral_price: u128,
    min_collateral_ratio_bps: u64,
) -> PerpResult<u128> {
    let debt_value =
        debt_value_in_collateral(short_amount, normalization_factor, collateral_price)?;
    mul_div_up(
        debt_value,
        min_collateral_ratio_bps as u128,
        BPS_DENOMINATOR as u128,
    )
}

/// Whether held collateral meets the minimum for the vault's short
pub fn is_properly_collateralized(
    vault: &Vault,
    normalization_factor: u128,
    collateral_price: u128,
    min_collateral_ratio_bps: u64,
) -> PerpResult<bool> {
    if vault.short_amount == 0 {
        return Ok(true);
    }
    let required = required_collateral(
        vault.short_amount,
        normalization_factor,
        collateral_price,
        min_collateral_ratio_bps,
    )?;
    Ok(vault.collateral >= required)
}
