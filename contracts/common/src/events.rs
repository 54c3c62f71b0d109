//! Protocol Events
//!
//! Events are collected during entrypoint execution and drained by
//! off-chain observers (indexers, UIs). Field layouts are part of the
//! wire surface: indexers decode the borsh encoding directly.

use crate::types::{Address, VaultId};
use crate::Vec;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Vault Events (0x01 - 0x1F)
    VaultOpened = 0x01,
    CollateralDeposited = 0x02,
    CollateralWithdrawn = 0x03,
    DebtMinted = 0x04,
    DebtBurned = 0x05,
    OperatorUpdated = 0x06,
    VaultLiquidated = 0x07,
    VaultClosed = 0x08,

    // Funding Events (0x20 - 0x3F)
    FundingApplied = 0x20,

    // Protocol Events (0x40 - 0x5F)
    Paused = 0x40,
    Unpaused = 0x41,
    ShutDown = 0x42,
    Donated = 0x43,
    FeesCollected = 0x44,

    // Redemption Events (0x60 - 0x7F)
    LongRedeemed = 0x60,
    ShortRedeemed = 0x61,
}

/// Main event enum containing all protocol events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum PerpEvent {
    // ============ Vault Events ============

    /// A new vault was opened and its ownership token minted
    VaultOpened {
        vault_id: VaultId,
        owner: Address,
        timestamp: u64,
    },

    /// Collateral was added to a vault
    CollateralDeposited {
        vault_id: VaultId,
        from: Address,
        amount: u128,
        new_collateral: u128,
        timestamp: u64,
    },

    /// Collateral was withdrawn from a vault
    CollateralWithdrawn {
        vault_id: VaultId,
        to: Address,
        amount: u128,
        new_collateral: u128,
        timestamp: u64,
    },

    /// Debt tokens were minted against a vault
    DebtMinted {
        vault_id: VaultId,
        to: Address,
        /// Requested notional, pre-normalization
        mint_amount: u128,
        /// Debt tokens actually minted (notional / normalization factor)
        debt_minted: u128,
        timestamp: u64,
    },

    /// Debt tokens were burned, reducing a vault's short
    DebtBurned {
        vault_id: VaultId,
        from: Address,
        debt_burned: u128,
        timestamp: u64,
    },

    /// A vault's operator was set or cleared
    OperatorUpdated {
        vault_id: VaultId,
        operator: Option<Address>,
        timestamp: u64,
    },

    /// An undercollateralized vault was liquidated
    VaultLiquidated {
        vault_id: VaultId,
        liquidator: Address,
        debt_repaid: u128,
        collateral_paid: u128,
        timestamp: u64,
    },

    /// A vault's collateral and debt both reached zero
    VaultClosed {
        vault_id: VaultId,
        timestamp: u64,
    },

    // ============ Funding Events ============

    /// Funding was applied to the normalization factor
    FundingApplied {
        old_normalization_factor: u128,
        new_normalization_factor: u128,
        timestamp: u64,
    },

    // ============ Protocol Events ============

    /// User operations were paused
    Paused { timestamp: u64 },

    /// User operations were resumed
    Unpaused { timestamp: u64 },

    /// The protocol was shut down and the settlement price frozen
    ShutDown {
        settlement_price: u128,
        timestamp: u64,
    },

    /// Unencumbered collateral was donated into the pool
    Donated {
        from: Address,
        amount: u128,
        timestamp: u64,
    },

    /// Accrued mint fees were paid out
    FeesCollected {
        to: Address,
        amount: u128,
        timestamp: u64,
    },

    // ============ Redemption Events ============

    /// Long-side redemption after shutdown
    LongRedeemed {
        redeemer: Address,
        debt_burned: u128,
        collateral_paid: u128,
        timestamp: u64,
    },

    /// Short-side redemption after shutdown
    ShortRedeemed {
        vault_id: VaultId,
        redeemer: Address,
        collateral_paid: u128,
        timestamp: u64,
    },
}

impl PerpEvent {
    /// Get the type of this event for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::VaultOpened { .. } => EventType::VaultOpened,
            Self::CollateralDeposited { .. } => EventType::CollateralDeposited,
            Self::CollateralWithdrawn { .. } => EventType::CollateralWithdrawn,
            Self::DebtMinted { .. } => EventType::DebtMinted,
            Self::DebtBurned { .. } => EventType::DebtBurned,
            Self::OperatorUpdated { .. } => EventType::OperatorUpdated,
            Self::VaultLiquidated { .. } => EventType::VaultLiquidated,
            Self::VaultClosed { .. } => EventType::VaultClosed,
            Self::FundingApplied { .. } => EventType::FundingApplied,
            Self::Paused { .. } => EventType::Paused,
            Self::Unpaused { .. } => EventType::Unpaused,
            Self::ShutDown { .. } => EventType::ShutDown,
            Self::Donated { .. } => EventType::Donated,
            Self::FeesCollected { .. } => EventType::FeesCollected,
            Self::LongRedeemed { .. } => EventType::LongRedeemed,
            Self::ShortRedeemed { .. } => EventType::ShortRedeemed,
        }
    }

    /// Get the timestamp when the event occurred
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::VaultOpened { timestamp, .. } => *timestamp,
            Self::CollateralDeposited { timestamp, .. } => *timestamp,
            Self::CollateralWithdrawn { timestamp, .. } => *timestamp,
            Self::DebtMinted { timestamp, .. } => *timestamp,
            Self::DebtBurned { timestamp, .. } => *timestamp,
            Self::OperatorUpdated { timestamp, .. } => *timestamp,
            Self::VaultLiquidated { timestamp, .. } => *timestamp,
            Self::VaultClosed { timestamp, .. } => *timestamp,
            Self::FundingApplied { timestamp, .. } => *timestamp,
            Self::Paused { timestamp } => *timestamp,
            Self::Unpaused { timestamp } => *timestamp,
            Self::ShutDown { timestamp, .. } => *timestamp,
            Self::Donated { timestamp, .. } => *timestamp,
            Self::FeesCollected { timestamp, .. } => *timestamp,
            Self::LongRedeemed { timestamp, .. } => *timestamp,
            Self::ShortRedeemed { timestamp, .. } => *timestamp,
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<PerpEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: PerpEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[PerpEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<PerpEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&PerpEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true when no events have been collected
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::scaling::WAD;

    #[test]
    fn test_event_type_and_timestamp() {
        let event = PerpEvent::VaultOpened {
            vault_id: 1,
            owner: [2u8; 32],
            timestamp: 100,
        };

        assert_eq!(event.event_type(), EventType::VaultOpened);
        assert_eq!(event.timestamp(), 100);
    }

    #[test]
    fn test_event_serialization() {
        let event = PerpEvent::VaultLiquidated {
            vault_id: 9,
            liquidator: [1u8; 32],
            debt_repaid: 5 * WAD,
            collateral_paid: WAD,
            timestamp: 200,
        };

        let bytes = event.to_bytes();
        let restored = PerpEvent::from_bytes(&bytes).unwrap();

        assert_eq!(event, restored);
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();

        log.emit(PerpEvent::VaultOpened {
            vault_id: 1,
            owner: [2u8; 32],
            timestamp: 100,
        });
        log.emit(PerpEvent::CollateralDeposited {
            vault_id: 1,
            from: [2u8; 32],
            amount: 10 * WAD,
            new_collateral: 10 * WAD,
            timestamp: 100,
        });

        assert_eq!(log.len(), 2);
        assert!(log.has_events());
        assert_eq!(log.filter_by_type(EventType::VaultOpened).len(), 1);

        log.clear();
        assert!(log.is_empty());
    }
}
