//! Vault Ownership Registry
//!
//! The controller does not track vault owners itself: ownership lives in
//! an external registry that issues one unique token per vault. The
//! registry is injected as a capability so the controller is testable
//! against the in-memory implementation without a real ledger.

use crate::errors::{PerpError, PerpResult};
use crate::types::{Address, VaultId, ZERO_ADDRESS};
use crate::BTreeMap;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Issues and tracks vault ownership tokens. Only the controller may
/// mint or burn; end users hold and transfer the tokens themselves.
pub trait VaultOwnershipRegistry {
    /// Mint a new ownership token to `owner`, returning its ID.
    /// IDs start at 1; 0 is the open-new-vault sentinel.
    fn mint(&mut self, owner: Address) -> PerpResult<VaultId>;

    /// Burn an ownership token
    fn burn(&mut self, id: VaultId) -> PerpResult<()>;

    /// Current owner of a token, if it exists
    fn owner_of(&self, id: VaultId) -> Option<Address>;
}

/// In-memory registry used by tests and single-process hosts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct InMemoryOwnershipRegistry {
    next_id: VaultId,
    owners: BTreeMap<VaultId, Address>,
}

impl InMemoryOwnershipRegistry {
    /// Empty registry; the first minted token gets ID 1
    pub fn new() -> Self {
        Self {
            next_id: 1,
            owners: BTreeMap::new(),
        }
    }

    /// Transfer a token between holders. Transferring a vault's token
    /// transfers control of the vault.
    pub fn transfer(&mut self, from: Address, to: Address, id: VaultId) -> PerpResult<()> {
        if to == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress {
                reason: "transfer to zero",
            });
        }
        match self.owners.get_mut(&id) {
            Some(owner) if *owner == from => {
                *owner = to;
                Ok(())
            }
            Some(_) => Err(PerpError::NotAuthorized {
                caller: from,
                vault_id: id,
            }),
            None => Err(PerpError::VaultNotFound { vault_id: id }),
        }
    }

    /// Number of outstanding tokens
    pub fn total_supply(&self) -> usize {
        self.owners.len()
    }
}

impl VaultOwnershipRegistry for InMemoryOwnershipRegistry {
    fn mint(&mut self, owner: Address) -> PerpResult<VaultId> {
        if owner == ZERO_ADDRESS {
            return Err(PerpError::InvalidAddress {
                reason: "mint to zero",
            });
        }
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.owners.insert(id, owner);
        Ok(id)
    }

    fn burn(&mut self, id: VaultId) -> PerpResult<()> {
        self.owners
            .remove(&id)
            .map(|_| ())
            .ok_or(PerpError::VaultNotFound { vault_id: id })
    }

    fn owner_of(&self, id: VaultId) -> Option<Address> {
        self.owners.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = [1u8; 32];
    const BOB: Address = [2u8; 32];

    #[test]
    fn test_mint_assigns_sequential_ids() {
        let mut registry = InMemoryOwnershipRegistry::new();
        assert_eq!(registry.mint(ALICE).unwrap(), 1);
        assert_eq!(registry.mint(BOB).unwrap(), 2);
        assert_eq!(registry.owner_of(1), Some(ALICE));
        assert_eq!(registry.owner_of(2), Some(BOB));
        assert_eq!(registry.total_supply(), 2);
    }

    #[test]
    fn test_mint_to_zero_rejected() {
        let mut registry = InMemoryOwnershipRegistry::new();
        assert!(matches!(
            registry.mint(ZERO_ADDRESS),
            Err(PerpError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_transfer_moves_control() {
        let mut registry = InMemoryOwnershipRegistry::new();
        let id = registry.mint(ALICE).unwrap();

        registry.transfer(ALICE, BOB, id).unwrap();
        assert_eq!(registry.owner_of(id), Some(BOB));

        // old owner can no longer transfer
        assert!(matches!(
            registry.transfer(ALICE, BOB, id),
            Err(PerpError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_burn_removes_token() {
        let mut registry = InMemoryOwnershipRegistry::new();
        let id = registry.mint(ALICE).unwrap();
        registry.burn(id).unwrap();
        assert_eq!(registry.owner_of(id), None);
        assert!(matches!(
            registry.burn(id),
            Err(PerpError::VaultNotFound { .. })
        ));
    }
}
