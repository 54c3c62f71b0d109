//! Protocol Constants
//!
//! All magic numbers and configuration defaults for the power perpetual
//! engine. Amounts and prices are unsigned 18-decimal fixed point (WAD).

/// Debt token metadata
pub mod token {
    /// Token name
    pub const NAME: &str = "Power Perpetual";
    /// Token symbol
    pub const SYMBOL: &str = "PWR";
    /// Decimal places
    pub const DECIMALS: u8 = 18;
    /// One unit with decimals (1 token = 1e18 base units)
    pub const ONE: u128 = 1_000_000_000_000_000_000;
}

/// Fixed-point scaling
pub mod scaling {
    /// 18-decimal fixed-point unit
    pub const WAD: u128 = 1_000_000_000_000_000_000;

    /// Index scale of the power-2 perpetual: one debt unit targets
    /// price^2 / INDEX_SCALE quote units. Keeps notionals in a sane range
    /// for realistic collateral prices.
    pub const INDEX_SCALE: u128 = 10_000;
}

/// Collateralization ratios (basis points, 10_000 = 100%)
pub mod ratios {
    /// Default minimum collateral ratio: 150%. A vault holding less
    /// collateral than short value times this ratio is liquidatable.
    pub const MIN_COLLATERAL_RATIO_BPS: u64 = 15_000;

    /// Basis points denominator
    pub const BPS_DENOMINATOR: u64 = 10_000;
}

/// Funding-rate configuration
pub mod funding {
    /// Funding period in seconds: elapsed / period is the funding ratio
    /// applied to the normalization factor (one day).
    pub const FUNDING_PERIOD_SECS: u64 = 86_400;
}

/// TWAP lookback windows (seconds)
pub mod twap {
    /// Default window for solvency checks on mint/withdraw/burn
    pub const DEFAULT_PERIOD_SECS: u32 = 420;

    /// Short window for the liquidation eligibility check and the
    /// shutdown settlement snapshot
    pub const SHORT_PERIOD_SECS: u32 = 600;
}

/// Liquidation configuration defaults
pub mod liquidation {
    /// Default liquidation bonus paid on top of index value (basis points).
    /// Zero mirrors the source system, which stated a bonus but never
    /// applied one; hosts may configure a non-zero bonus.
    pub const DEFAULT_BONUS_BPS: u64 = 0;
}

/// Oracle configuration
pub mod oracle {
    /// Maximum observations retained per pool
    pub const MAX_OBSERVATIONS: usize = 1_024;

    /// Tick base: prices are 1.0001^tick, so this is 1.0001 in WAD
    pub const TICK_BASE_WAD: u128 = 1_000_100_000_000_000_000;

    /// Largest tick magnitude a pool may record (keeps prices within u128 WAD)
    pub const MAX_TICK: i32 = 400_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wad_consistency() {
        assert_eq!(token::ONE, scaling::WAD);
        assert_eq!(10u128.pow(token::DECIMALS as u32), scaling::WAD);
    }

    #[test]
    fn test_ratio_sanity() {
        assert!(ratios::MIN_COLLATERAL_RATIO_BPS > ratios::BPS_DENOMINATOR);
    }
}
