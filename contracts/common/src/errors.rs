//! Error Types for the Power Perpetual Engine
//!
//! Typed errors with context payloads and stable codes. Every failure
//! aborts the whole entrypoint; there is no partial state commit.

use crate::types::{Address, PoolId, VaultId};

/// Result type alias for engine operations
pub type PerpResult<T> = Result<T, PerpError>;

/// Main error enum for all engine failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerpError {
    // ============ Configuration Errors ============
    /// Invalid address (e.g., zero address) supplied at init
    InvalidAddress {
        /// Description of why the address is invalid
        reason: &'static str,
    },

    // ============ State-Machine Errors ============
    /// Protocol has been shut down; normal operations are disabled
    AlreadyShutDown,

    /// Redemption requested while the protocol is still active
    NotShutDown,

    /// Protocol is paused
    ProtocolPaused,

    /// Operation is invalid for the target's current state
    /// (e.g., liquidating a properly collateralized vault)
    InvalidState,

    // ============ Vault Errors ============
    /// Vault not found with given ID
    VaultNotFound { vault_id: VaultId },

    /// Vault fails the collateralization check after the operation
    Undercollateralized { vault_id: VaultId },

    /// Caller is neither the vault owner nor its operator
    NotAuthorized { caller: Address, vault_id: VaultId },

    /// Collateral removal exceeds held collateral
    InsufficientCollateral { available: u128, requested: u128 },

    /// Debt removal exceeds recorded debt
    InsufficientDebt { available: u128, requested: u128 },

    // ============ Oracle Errors ============
    /// Oracle returned a zero or otherwise unusable price
    StaleOrInvalidPrice { pool: PoolId },

    /// Requested lookback window exceeds the pool's recorded history
    PeriodTooLong { requested: u32, max: u32 },

    /// No pool registered under the given ID
    PoolNotFound { pool: PoolId },

    /// Asset is not one of the pool's token pair
    AssetNotInPool { asset: Address },

    // ============ Funding Errors ============
    /// Funding denominator (1+r)*mark - r*index was not strictly positive
    FundingComputationError { mark: u128, index: u128 },

    // ============ Token Errors ============
    /// Balance too small for the requested burn or transfer
    InsufficientBalance { available: u128, requested: u128 },

    // ============ Amount / Math Errors ============
    /// Zero amount not allowed
    ZeroAmount,

    /// Arithmetic overflow occurred
    Overflow,

    /// Arithmetic underflow occurred
    Underflow,

    /// Division by zero
    DivisionByZero,
}

impl PerpError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "E001_INVALID_ADDRESS",
            Self::AlreadyShutDown => "E010_ALREADY_SHUT_DOWN",
            Self::NotShutDown => "E011_NOT_SHUT_DOWN",
            Self::ProtocolPaused => "E012_PAUSED",
            Self::InvalidState => "E013_INVALID_STATE",
            Self::VaultNotFound { .. } => "E020_VAULT_NOT_FOUND",
            Self::Undercollateralized { .. } => "E021_UNDERCOLLATERALIZED",
            Self::NotAuthorized { .. } => "E022_NOT_AUTHORIZED",
            Self::InsufficientCollateral { .. } => "E023_INSUFFICIENT_COLLATERAL",
            Self::InsufficientDebt { .. } => "E024_INSUFFICIENT_DEBT",
            Self::StaleOrInvalidPrice { .. } => "E030_STALE_PRICE",
            Self::PeriodTooLong { .. } => "E031_PERIOD_TOO_LONG",
            Self::PoolNotFound { .. } => "E032_POOL_NOT_FOUND",
            Self::AssetNotInPool { .. } => "E033_ASSET_NOT_IN_POOL",
            Self::FundingComputationError { .. } => "E040_FUNDING_DEGENERATE",
            Self::InsufficientBalance { .. } => "E050_INSUFFICIENT_BALANCE",
            Self::ZeroAmount => "E060_ZERO_AMOUNT",
            Self::Overflow => "E061_OVERFLOW",
            Self::Underflow => "E062_UNDERFLOW",
            Self::DivisionByZero => "E063_DIV_ZERO",
        }
    }

    /// Returns true if the caller can fix the condition and retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Undercollateralized { .. } => true, // add collateral
            Self::InsufficientCollateral { .. } => true,
            Self::InsufficientDebt { .. } => true,
            Self::InsufficientBalance { .. } => true,
            Self::StaleOrInvalidPrice { .. } => true, // wait for observations
            Self::PeriodTooLong { .. } => true,       // shorten the window
            Self::ProtocolPaused => true,             // wait for unpause
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vec;
    use std::collections::BTreeSet;

    #[test]
    fn test_error_codes_unique() {
        let errors = [
            PerpError::InvalidAddress { reason: "zero" },
            PerpError::AlreadyShutDown,
            PerpError::NotShutDown,
            PerpError::ProtocolPaused,
            PerpError::InvalidState,
            PerpError::VaultNotFound { vault_id: 1 },
            PerpError::Undercollateralized { vault_id: 1 },
            PerpError::NotAuthorized { caller: [0u8; 32], vault_id: 1 },
            PerpError::InsufficientCollateral { available: 0, requested: 1 },
            PerpError::InsufficientDebt { available: 0, requested: 1 },
            PerpError::StaleOrInvalidPrice { pool: [0u8; 32] },
            PerpError::PeriodTooLong { requested: 600, max: 60 },
            PerpError::PoolNotFound { pool: [0u8; 32] },
            PerpError::AssetNotInPool { asset: [0u8; 32] },
            PerpError::FundingComputationError { mark: 1, index: 2 },
            PerpError::InsufficientBalance { available: 0, requested: 1 },
            PerpError::ZeroAmount,
            PerpError::Overflow,
            PerpError::Underflow,
            PerpError::DivisionByZero,
        ];

        let codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len(), "Error codes must be unique");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(PerpError::Undercollateralized { vault_id: 7 }.is_recoverable());
        assert!(!PerpError::AlreadyShutDown.is_recoverable());
        assert!(!PerpError::FundingComputationError { mark: 0, index: 0 }.is_recoverable());
    }
}
