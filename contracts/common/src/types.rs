//! Core Types for the Power Perpetual Engine
//!
//! Fundamental data structures shared by every module: vault positions,
//! global protocol state, and the controller configuration.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::{liquidation, ratios, scaling, twap};
use crate::errors::{PerpError, PerpResult};

/// Type alias for addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for AMM pool identifiers
pub type PoolId = [u8; 32];

/// Type alias for vault identifiers. Vault 0 is reserved: passing it to
/// mint opens a new vault.
pub type VaultId = u64;

/// The all-zero address, rejected wherever an address is configured
pub const ZERO_ADDRESS: Address = [0u8; 32];

// ============ Vault ============

/// A collateral + debt position, identified by its ownership-token ID.
///
/// Ownership is not stored here: the ownership registry is authoritative,
/// so transferring the ownership token transfers control of the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Vault {
    /// Unique identifier, equal to the ownership-token ID
    pub id: VaultId,
    /// Collateral held, WAD units of the collateral asset
    pub collateral: u128,
    /// Debt-token notional owed, pre-normalization, WAD units
    pub short_amount: u128,
    /// Optional delegate allowed to act on the vault besides its owner
    pub operator: Option<Address>,
}

impl Vault {
    /// Creates an empty vault
    pub fn new(id: VaultId) -> Self {
        Self {
            id,
            collateral: 0,
            short_amount: 0,
            operator: None,
        }
    }

    /// Returns true if the vault holds no collateral and owes no debt
    pub fn is_empty(&self) -> bool {
        self.collateral == 0 && self.short_amount == 0
    }
}

// ============ Global Protocol State ============

/// Process-wide singleton state, passed explicitly into every entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProtocolState {
    /// Accumulated funding debt scaling, WAD; starts at 1.0 and moves in
    /// either direction as funding is applied
    pub normalization_factor: u128,
    /// Timestamp of the last funding application; advances only forward
    pub last_funding_update: u64,
    /// One-way shutdown latch
    pub is_shut_down: bool,
    /// Settlement price frozen at shutdown (WAD, collateral in quote);
    /// zero until shutdown
    pub shutdown_price_snapshot: u128,
    /// Reversible pause latch; blocks user operations while set
    pub is_paused: bool,
}

impl ProtocolState {
    /// Fresh state at the given init timestamp
    pub fn new(now: u64) -> Self {
        Self {
            normalization_factor: scaling::WAD,
            last_funding_update: now,
            is_shut_down: false,
            shutdown_price_snapshot: 0,
            is_paused: false,
        }
    }
}

// ============ Controller Configuration ============

/// Immutable controller configuration, validated once at init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ControllerConfig {
    /// Protocol owner; may shut down, pause, and collect fees
    pub owner: Address,
    /// Collateral asset address (e.g., wrapped ETH)
    pub collateral_asset: Address,
    /// Quote asset address (e.g., a USD stablecoin)
    pub quote_asset: Address,
    /// Power perpetual debt-token address
    pub power_perp_asset: Address,
    /// AMM pool trading collateral against quote
    pub collateral_quote_pool: PoolId,
    /// AMM pool trading the power perpetual against collateral
    pub power_perp_pool: PoolId,
    /// Minimum collateral ratio in basis points
    pub min_collateral_ratio_bps: u64,
    /// Liquidation bonus paid on top of index value, basis points
    pub liquidation_bonus_bps: u64,
    /// Whether liquidation reduces the target vault's recorded debt and
    /// collateral. `false` replays the source system's bookkeeping gap.
    pub reduce_vault_on_liquidation: bool,
    /// Fee on the collateral value of newly minted debt, basis points
    pub fee_bps: u64,
}

impl ControllerConfig {
    /// Builds a config with default ratios and fees
    pub fn new(
        owner: Address,
        collateral_asset: Address,
        quote_asset: Address,
        power_perp_asset: Address,
        collateral_quote_pool: PoolId,
        power_perp_pool: PoolId,
    ) -> Self {
        Self {
            owner,
            collateral_asset,
            quote_asset,
            power_perp_asset,
            collateral_quote_pool,
            power_perp_pool,
            min_collateral_ratio_bps: ratios::MIN_COLLATERAL_RATIO_BPS,
            liquidation_bonus_bps: liquidation::DEFAULT_BONUS_BPS,
            reduce_vault_on_liquidation: true,
            fee_bps: 0,
        }
    }

    /// Validates the configuration. Zero addresses and degenerate ratios
    /// are rejected at init time rather than surfacing mid-operation.
    pub fn validate(&self) -> PerpResult<()> {
        if self.owner == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "owner is zero" });
        }
        if self.collateral_asset == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "collateral asset is zero" });
        }
        if self.quote_asset == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "quote asset is zero" });
        }
        if self.power_perp_asset == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "power perp asset is zero" });
        }
        if self.collateral_quote_pool == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "collateral-quote pool is zero" });
        }
        if self.power_perp_pool == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress { reason: "power-perp pool is zero" });
        }
        if self.min_collateral_ratio_bps < ratios::BPS_DENOMINATOR {
            return Err(PerpError::InvalidState);
        }
        Ok(())
    }

    /// Lookback window for the liquidation eligibility check
    pub fn liquidation_period(&self) -> u32 {
        twap::SHORT_PERIOD_SECS
    }

    /// Lookback window for post-operation solvency checks
    pub fn solvency_period(&self) -> u32 {
        twap::DEFAULT_PERIOD_SECS
    }
}
