//! Debt Token Operations
//!
//! Fungible supply control for the power perpetual debt token. Mint and
//! burn are controller-only in deployment; here the capability is an
//! injected trait so the controller can be exercised against the
//! in-memory implementation.

use crate::errors::{PerpError, PerpResult};
use crate::math::safe_add;
use crate::types::{Address, ZERO_ADDRESS};
use crate::BTreeMap;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Mint/burn capability over the debt token supply
pub trait DebtToken {
    /// Mint `amount` to `to`
    fn mint(&mut self, to: Address, amount: u128) -> PerpResult<()>;

    /// Burn `amount` from `from`; fails with `InsufficientBalance` if the
    /// holder cannot cover it
    fn burn(&mut self, from: Address, amount: u128) -> PerpResult<()>;

    /// Current balance of a holder
    fn balance_of(&self, holder: Address) -> u128;

    /// Total outstanding supply
    fn total_supply(&self) -> u128;
}

/// In-memory balance-map token used by tests and single-process hosts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InMemoryDebtToken {
    balances: BTreeMap<Address, u128>,
    total_supply: u128,
}

impl InMemoryDebtToken {
    /// Empty token with zero supply
    pub fn new() -> Self {
        Self::default()
    }

    /// Move balance between holders
    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> PerpResult<()> {
        if to == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress {
                reason: "transfer to zero",
            });
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(PerpError::InsufficientBalance {
                available: from_balance,
                requested: amount,
            });
        }
        self.balances.insert(from, from_balance - amount);
        let to_balance = safe_add(self.balance_of(to), amount)?;
        self.balances.insert(to, to_balance);
        Ok(())
    }
}

impl DebtToken for InMemoryDebtToken {
    fn mint(&mut self, to: Address, amount: u128) -> PerpResult<()> {
        if to == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress {
                reason: "mint to zero",
            });
        }
        let balance = safe_add(self.balance_of(to), amount)?;
        self.total_supply = safe_add(self.total_supply, amount)?;
        self.balances.insert(to, balance);
        Ok(())
    }

    fn burn(&mut self, from: Address, amount: u128) -> PerpResult<()> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(PerpError::InsufficientBalance {
                available: balance,
                requested: amount,
            });
        }
        self.balances.insert(from, balance - amount);
        self.total_supply -= amount; // supply >= any single balance
        Ok(())
    }

    fn balance_of(&self, holder: Address) -> u128 {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::scaling::WAD;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    #[test]
    fn test_mint_and_burn() {
        let mut token = InMemoryDebtToken::new();
        token.mint(ALICE, 10 * WAD).unwrap();
        assert_eq!(token.balance_of(ALICE), 10 * WAD);
        assert_eq!(token.total_supply(), 10 * WAD);

        token.burn(ALICE, 4 * WAD).unwrap();
        assert_eq!(token.balance_of(ALICE), 6 * WAD);
        assert_eq!(token.total_supply(), 6 * WAD);
    }

    #[test]
    fn test_burn_exceeding_balance_fails() {
        let mut token = InMemoryDebtToken::new();
        token.mint(ALICE, WAD).unwrap();
        assert!(matches!(
            token.burn(ALICE, 2 * WAD),
            Err(PerpError::InsufficientBalance { available, requested })
                if available == WAD && requested == 2 * WAD
        ));
    }

    #[test]
    fn test_transfer() {
        let mut token = InMemoryDebtToken::new();
        token.mint(ALICE, 10 * WAD).unwrap();
        token.transfer(ALICE, BOB, 3 * WAD).unwrap();
        assert_eq!(token.balance_of(ALICE), 7 * WAD);
        assert_eq!(token.balance_of(BOB), 3 * WAD);
        assert_eq!(token.total_supply(), 10 * WAD);
    }

    #[test]
    fn test_mint_to_zero_rejected() {
        let mut token = InMemoryDebtToken::new();
        assert!(matches!(
            token.mint(ZERO_ADDRESS, WAD),
            Err(PerpError::InvalidAddress { .. })
        ));
    }
}
