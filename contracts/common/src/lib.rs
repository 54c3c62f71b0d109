//! PowerPerp Common Library
//!
//! Shared types, constants, and engine math for the power perpetual
//! protocol: a perpetual derivative whose debt token tracks the square
//! of the collateral asset's price.
//!
//! ## Modules
//!
//! - **Oracle**: geometric-mean TWAP over AMM tick observations, with
//!   max-safe-period capping for young pools
//! - **Vault Accounting**: collateral/debt invariants and the
//!   collateralization-ratio check (pure, no I/O)
//! - **Funding Engine**: normalization-factor accrual converging the
//!   mark price toward the index
//! - **Registry / Token**: injected capabilities for vault ownership
//!   tokens and debt-token supply, with in-memory implementations
//! - **Events**: structured event log consumed by off-chain indexers
//!
//! The orchestrating controller lives in the `powerperp-controller`
//! crate. This crate is `no_std` compatible when built without the
//! default `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::BTreeMap, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::BTreeMap, vec::Vec};

pub mod constants;
pub mod errors;
pub mod events;
pub mod funding;
pub mod math;
pub mod oracle;
pub mod registry;
pub mod token;
pub mod types;
pub mod vault;

#[cfg(test)]
mod integration_tests;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use events::*;
pub use funding::{apply_funding, compute_normalization_factor, get_denormalized_mark, get_index};
pub use math::*;
pub use oracle::{tick_to_price, Observation, PoolObservations, PriceOracle};
pub use registry::{InMemoryOwnershipRegistry, VaultOwnershipRegistry};
pub use token::{DebtToken, InMemoryDebtToken};
pub use types::*;
pub use vault::*;
