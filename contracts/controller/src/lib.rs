//! Controller for the Power Perpetual Protocol
//!
//! The orchestrating state machine over `powerperp-common`: vault
//! lifecycle (open, deposit, withdraw, mint, burn), liquidation of
//! undercollateralized vaults, funding application, and the one-way
//! global shutdown with long/short redemption.
//!
//! ## Execution model
//!
//! The engine targets a deterministic, serialized execution environment:
//! every entrypoint runs to completion with no partial state commit on
//! error. Entrypoints stage fallible work on local copies and commit
//! only after every check has passed, and outgoing value is reported to
//! the caller strictly after all state updates (update-then-transfer),
//! so a reentrant caller can never observe stale collateral or debt.
//!
//! ## Funding
//!
//! Every state-mutating entrypoint first brings the global normalization
//! factor up to date from fresh TWAPs, then mutates vault accounting,
//! then (for mint/withdraw/burn) re-validates solvency.

#![cfg_attr(not(feature = "std"), no_std)]

use powerperp_common::{
    apply_funding,
    constants::scaling::{INDEX_SCALE, WAD},
    errors::{PerpError, PerpResult},
    events::{EventLog, PerpEvent},
    funding::{get_denormalized_mark, get_index},
    math::{mul_div, safe_add, safe_sub, wad_mul},
    oracle::PriceOracle,
    registry::VaultOwnershipRegistry,
    token::DebtToken,
    types::{Address, ControllerConfig, ProtocolState, Vault, VaultId},
    vault as accounting, BTreeMap,
};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Outcome of a successful mint call
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct MintOutcome {
    /// The vault operated on (freshly allocated when vault_id 0 was passed)
    pub vault_id: VaultId,
    /// Debt tokens minted to the caller (notional / normalization factor)
    pub debt_minted: u128,
}

/// The power perpetual controller.
///
/// Owns the vault map, the pooled collateral ledger, and the protocol
/// state; ownership tokens and debt-token supply are injected
/// capabilities so the controller runs against any ledger backend.
#[derive(Debug, Clone)]
pub struct Controller<R: VaultOwnershipRegistry, T: DebtToken> {
    config: ControllerConfig,
    state: ProtocolState,
    vaults: BTreeMap<VaultId, Vault>,
    /// Collateral held by the controller across all vaults plus donations
    collateral_balance: u128,
    /// Mint fees accrued and not yet collected
    fees_accrued: u128,
    /// AMM price history, fed by the host
    pub oracle: PriceOracle,
    /// Vault ownership token registry
    pub registry: R,
    /// Power perpetual debt token
    pub token: T,
    /// Structured event log for off-chain observers
    pub events: EventLog,
}

impl<R: VaultOwnershipRegistry, T: DebtToken> Controller<R, T> {
    /// One-time initialization. Validates the configuration and requires
    /// both price pools to be registered with the oracle already.
    pub fn init(
        config: ControllerConfig,
        oracle: PriceOracle,
        registry: R,
        token: T,
        now: u64,
    ) -> PerpResult<Self> {
        config.validate()?;
        oracle.pool(config.collateral_quote_pool)?;
        oracle.pool(config.power_perp_pool)?;

        Ok(Self {
            config,
            state: ProtocolState::new(now),
            vaults: BTreeMap::new(),
            collateral_balance: 0,
            fees_accrued: 0,
            oracle,
            registry,
            token,
            events: EventLog::new(),
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Controller configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Global protocol state
    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    /// Current normalization factor (as of the last funding application)
    pub fn normalization_factor(&self) -> u128 {
        self.state.normalization_factor
    }

    /// A vault by ID
    pub fn vault(&self, vault_id: VaultId) -> PerpResult<&Vault> {
        self.vaults
            .get(&vault_id)
            .ok_or(PerpError::VaultNotFound { vault_id })
    }

    /// Total collateral held by the controller
    pub fn collateral_balance(&self) -> u128 {
        self.collateral_balance
    }

    /// Mint fees accrued and awaiting collection
    pub fn fees_accrued(&self) -> u128 {
        self.fees_accrued
    }

    /// Index price over the given window (collateral price squared)
    pub fn index(&self, period: u32, now: u64) -> PerpResult<u128> {
        get_index(&self.oracle, &self.config, period, now)
    }

    /// Denormalized mark price over the given window
    pub fn denormalized_mark(&self, period: u32, now: u64) -> PerpResult<u128> {
        get_denormalized_mark(
            &self.oracle,
            &self.config,
            self.state.normalization_factor,
            period,
            now,
        )
    }

    /// Whether a vault passes the collateralization check under the
    /// short liquidation lookback. View only; does not apply funding.
    pub fn is_vault_safe(&self, vault_id: VaultId, now: u64) -> PerpResult<bool> {
        let vault = self.vault(vault_id)?;
        let price = self.liquidation_price(now)?;
        accounting::is_properly_collateralized(
            vault,
            self.state.normalization_factor,
            price,
            self.config.min_collateral_ratio_bps,
        )
    }

    // ========================================================================
    // Vault lifecycle
    // ========================================================================

    /// Open a vault and/or deposit collateral and mint debt against it.
    ///
    /// Passing `vault_id` 0 opens a new vault, minting its ownership
    /// token to the caller. The deposit is applied before the mint and
    /// the solvency check runs once at the end, so a single call can add
    /// collateral and mint debt together without an intermediate
    /// failure.
    pub fn mint(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        mint_amount: u128,
        deposit_amount: u128,
    ) -> PerpResult<MintOutcome> {
        self.ensure_active()?;
        self.touch(now)?;

        let opening = vault_id == 0;
        let mut staged = if opening {
            Vault::new(0) // real ID assigned at commit
        } else {
            self.authorized_vault(caller, vault_id)?.clone()
        };

        if deposit_amount > 0 {
            accounting::add_collateral(&mut staged, deposit_amount)?;
        }

        let debt_to_mint = if mint_amount > 0 {
            mul_div(mint_amount, WAD, self.state.normalization_factor)?
        } else {
            0
        };
        let mut fee = 0u128;
        if debt_to_mint > 0 {
            accounting::add_debt(&mut staged, debt_to_mint)?;

            let price = self.solvency_price(now)?;
            if self.config.fee_bps > 0 {
                fee = self.mint_fee(debt_to_mint, price)?;
                accounting::remove_collateral(&mut staged, fee)?;
            }
            let solvent = accounting::is_properly_collateralized(
                &staged,
                self.state.normalization_factor,
                price,
                self.config.min_collateral_ratio_bps,
            )?;
            if !solvent {
                return Err(PerpError::Undercollateralized { vault_id: staged.id });
            }
            // supply headroom now, so the token mint below cannot fail
            // after other state has been committed
            self.token
                .total_supply()
                .checked_add(debt_to_mint)
                .ok_or(PerpError::Overflow)?;
        }
        let new_pool_balance = safe_add(self.collateral_balance, deposit_amount)?;
        let new_fees_accrued = safe_add(self.fees_accrued, fee)?;

        // all checks passed: commit
        let vault_id = if opening {
            let id = self.registry.mint(caller)?;
            staged.id = id;
            self.events.emit(PerpEvent::VaultOpened {
                vault_id: id,
                owner: caller,
                timestamp: now,
            });
            id
        } else {
            vault_id
        };
        if debt_to_mint > 0 {
            self.token.mint(caller, debt_to_mint)?;
        }

        if deposit_amount > 0 {
            self.collateral_balance = new_pool_balance;
            self.events.emit(PerpEvent::CollateralDeposited {
                vault_id,
                from: caller,
                amount: deposit_amount,
                new_collateral: staged.collateral,
                timestamp: now,
            });
        }
        if debt_to_mint > 0 {
            self.fees_accrued = new_fees_accrued;
            self.events.emit(PerpEvent::DebtMinted {
                vault_id,
                to: caller,
                mint_amount,
                debt_minted: debt_to_mint,
                timestamp: now,
            });
        }
        self.vaults.insert(vault_id, staged);

        Ok(MintOutcome {
            vault_id,
            debt_minted: debt_to_mint,
        })
    }

    /// Deposit collateral into an existing vault. Open to anyone: a
    /// deposit only improves vault health, so no solvency check runs.
    pub fn deposit(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        amount: u128,
    ) -> PerpResult<()> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(PerpError::ZeroAmount);
        }
        self.touch(now)?;

        let mut staged = self.vault(vault_id)?.clone();
        accounting::add_collateral(&mut staged, amount)?;
        let new_collateral = staged.collateral;

        self.collateral_balance = safe_add(self.collateral_balance, amount)?;
        self.vaults.insert(vault_id, staged);
        self.events.emit(PerpEvent::CollateralDeposited {
            vault_id,
            from: caller,
            amount,
            new_collateral,
            timestamp: now,
        });
        Ok(())
    }

    /// Withdraw collateral from a vault, leaving it properly
    /// collateralized. Returns the amount to transfer to the caller.
    pub fn withdraw(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        amount: u128,
    ) -> PerpResult<u128> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(PerpError::ZeroAmount);
        }
        self.touch(now)?;
        self.authorized_vault(caller, vault_id)?;
        self.withdraw_inner(caller, now, vault_id, amount)
    }

    /// Burn debt tokens to reduce a vault's short, optionally withdrawing
    /// collateral in the same call. Returns the collateral to transfer.
    pub fn burn(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        debt_amount: u128,
        withdraw_amount: u128,
    ) -> PerpResult<u128> {
        self.ensure_active()?;
        self.touch(now)?;

        let mut staged = self.authorized_vault(caller, vault_id)?.clone();
        if debt_amount > 0 {
            accounting::remove_debt(&mut staged, debt_amount)?;
        }
        if withdraw_amount > 0 {
            accounting::remove_collateral(&mut staged, withdraw_amount)?;
            self.ensure_pool_covers(withdraw_amount)?;
        }

        let price = self.solvency_price(now)?;
        let solvent = accounting::is_properly_collateralized(
            &staged,
            self.state.normalization_factor,
            price,
            self.config.min_collateral_ratio_bps,
        )?;
        if !solvent {
            return Err(PerpError::Undercollateralized { vault_id });
        }

        // commit
        if debt_amount > 0 {
            self.token.burn(caller, debt_amount)?;
            self.events.emit(PerpEvent::DebtBurned {
                vault_id,
                from: caller,
                debt_burned: debt_amount,
                timestamp: now,
            });
        }
        if withdraw_amount > 0 {
            self.collateral_balance -= withdraw_amount;
            self.events.emit(PerpEvent::CollateralWithdrawn {
                vault_id,
                to: caller,
                amount: withdraw_amount,
                new_collateral: staged.collateral,
                timestamp: now,
            });
        }
        self.vaults.insert(vault_id, staged);
        Ok(withdraw_amount)
    }

    /// Set or clear a vault's delegated operator
    pub fn update_operator(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        operator: Option<Address>,
    ) -> PerpResult<()> {
        if self.state.is_shut_down {
            return Err(PerpError::AlreadyShutDown);
        }
        self.touch(now)?;
        self.authorized_vault(caller, vault_id)?;

        if let Some(vault) = self.vaults.get_mut(&vault_id) {
            vault.operator = operator;
        }
        self.events.emit(PerpEvent::OperatorUpdated {
            vault_id,
            operator,
            timestamp: now,
        });
        Ok(())
    }

    // ========================================================================
    // Liquidation
    // ========================================================================

    /// Liquidate an undercollateralized vault. Callable by anyone: the
    /// liquidator burns `debt_amount` of debt token and receives its
    /// settlement value in collateral plus the configured bonus.
    ///
    /// Whether the vault's recorded debt and collateral are reduced is
    /// configurable; the default reduces both. Returns the collateral to
    /// transfer to the liquidator.
    pub fn liquidate(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        debt_amount: u128,
    ) -> PerpResult<u128> {
        self.ensure_active()?;
        if debt_amount == 0 {
            return Err(PerpError::ZeroAmount);
        }
        self.touch(now)?;

        let price = self.liquidation_price(now)?;
        let vault = self.vault(vault_id)?;
        let safe = accounting::is_properly_collateralized(
            vault,
            self.state.normalization_factor,
            price,
            self.config.min_collateral_ratio_bps,
        )?;
        if safe {
            return Err(PerpError::InvalidState);
        }

        let value = self.settlement_value(debt_amount, price)?;
        let with_bonus = mul_div(
            value,
            10_000 + self.config.liquidation_bonus_bps as u128,
            10_000,
        )?;

        let mut staged = vault.clone();
        let payout = if self.config.reduce_vault_on_liquidation {
            accounting::remove_debt(&mut staged, debt_amount)?;
            let capped = with_bonus.min(staged.collateral);
            accounting::remove_collateral(&mut staged, capped)?;
            capped
        } else {
            // source-compatible mode: the vault's books are left as-is
            // and the payout comes out of the pooled collateral
            with_bonus
        };
        self.ensure_pool_covers(payout)?;

        // commit
        self.token.burn(caller, debt_amount)?;
        self.collateral_balance -= payout;
        let closed = staged.is_empty();
        self.vaults.insert(vault_id, staged);
        self.events.emit(PerpEvent::VaultLiquidated {
            vault_id,
            liquidator: caller,
            debt_repaid: debt_amount,
            collateral_paid: payout,
            timestamp: now,
        });
        if closed {
            self.events.emit(PerpEvent::VaultClosed {
                vault_id,
                timestamp: now,
            });
        }
        Ok(payout)
    }

    // ========================================================================
    // Funding
    // ========================================================================

    /// Manually apply funding. The same update runs implicitly at the
    /// top of every state-mutating entrypoint; zero elapsed time is an
    /// exact no-op. Returns the normalization factor.
    pub fn apply_funding(&mut self, now: u64) -> PerpResult<u128> {
        if self.state.is_shut_down {
            return Err(PerpError::AlreadyShutDown);
        }
        self.touch(now)?;
        Ok(self.state.normalization_factor)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Pause user operations. Owner only; reversible.
    pub fn pause(&mut self, caller: Address, now: u64) -> PerpResult<()> {
        self.ensure_owner(caller)?;
        if self.state.is_shut_down {
            return Err(PerpError::AlreadyShutDown);
        }
        if self.state.is_paused {
            return Err(PerpError::InvalidState);
        }
        self.state.is_paused = true;
        self.events.emit(PerpEvent::Paused { timestamp: now });
        Ok(())
    }

    /// Resume user operations. Owner only.
    pub fn unpause(&mut self, caller: Address, now: u64) -> PerpResult<()> {
        self.ensure_owner(caller)?;
        if !self.state.is_paused {
            return Err(PerpError::InvalidState);
        }
        self.state.is_paused = false;
        self.events.emit(PerpEvent::Unpaused { timestamp: now });
        Ok(())
    }

    /// Shut the protocol down permanently. Owner only, one-way. Applies
    /// a final funding update, then freezes the collateral TWAP as the
    /// settlement price for all subsequent redemptions.
    pub fn shut_down(&mut self, caller: Address, now: u64) -> PerpResult<()> {
        self.ensure_owner(caller)?;
        if self.state.is_shut_down {
            return Err(PerpError::AlreadyShutDown);
        }
        self.touch(now)?;

        let snapshot = self.liquidation_price(now)?;
        self.state.is_shut_down = true;
        self.state.shutdown_price_snapshot = snapshot;
        self.events.emit(PerpEvent::ShutDown {
            settlement_price: snapshot,
            timestamp: now,
        });
        Ok(())
    }

    /// Collect accrued mint fees. Owner only. Returns the collateral to
    /// transfer to `recipient`.
    pub fn collect_fees(
        &mut self,
        caller: Address,
        now: u64,
        recipient: Address,
    ) -> PerpResult<u128> {
        self.ensure_owner(caller)?;
        let payout = self.fees_accrued;
        if payout == 0 {
            return Ok(0);
        }
        self.ensure_pool_covers(payout)?;

        self.fees_accrued = 0;
        self.collateral_balance -= payout;
        self.events.emit(PerpEvent::FeesCollected {
            to: recipient,
            amount: payout,
            timestamp: now,
        });
        Ok(payout)
    }

    /// Donate collateral into the pool with no per-vault effect; used to
    /// cover insolvency.
    pub fn donate(&mut self, caller: Address, now: u64, amount: u128) -> PerpResult<()> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(PerpError::ZeroAmount);
        }
        self.touch(now)?;

        self.collateral_balance = safe_add(self.collateral_balance, amount)?;
        self.events.emit(PerpEvent::Donated {
            from: caller,
            amount,
            timestamp: now,
        });
        Ok(())
    }

    // ========================================================================
    // Shutdown redemption
    // ========================================================================

    /// Redeem long-side exposure after shutdown: burns debt tokens and
    /// pays their settlement value at the frozen price. Returns the
    /// collateral to transfer to the caller.
    pub fn redeem_long(&mut self, caller: Address, now: u64, debt_amount: u128) -> PerpResult<u128> {
        if !self.state.is_shut_down {
            return Err(PerpError::NotShutDown);
        }
        if debt_amount == 0 {
            return Err(PerpError::ZeroAmount);
        }

        let payout = self.settlement_value(debt_amount, self.state.shutdown_price_snapshot)?;
        self.ensure_pool_covers(payout)?;

        self.token.burn(caller, debt_amount)?;
        self.collateral_balance -= payout;
        self.events.emit(PerpEvent::LongRedeemed {
            redeemer: caller,
            debt_burned: debt_amount,
            collateral_paid: payout,
            timestamp: now,
        });
        Ok(payout)
    }

    /// Redeem short-side exposure after shutdown: pays out the vault's
    /// collateral in excess of what its short owes at the frozen price,
    /// zeroing the vault. Fails with `InsufficientCollateral` when the
    /// short owes more than the vault holds; the owner receives nothing
    /// in that case. The ownership token persists.
    pub fn redeem_short(&mut self, caller: Address, now: u64, vault_id: VaultId) -> PerpResult<u128> {
        if !self.state.is_shut_down {
            return Err(PerpError::NotShutDown);
        }
        let vault = self.authorized_vault(caller, vault_id)?;

        let owed = accounting::debt_value_in_collateral(
            vault.short_amount,
            self.state.normalization_factor,
            self.state.shutdown_price_snapshot,
        )?;
        let excess = safe_sub(vault.collateral, owed).map_err(|_| {
            PerpError::InsufficientCollateral {
                available: vault.collateral,
                requested: owed,
            }
        })?;
        self.ensure_pool_covers(excess)?;

        let mut staged = vault.clone();
        staged.collateral = 0;
        staged.short_amount = 0;

        // the short's own settlement value stays in the pool backing
        // outstanding long redemptions; only the excess leaves
        self.collateral_balance -= excess;
        self.vaults.insert(vault_id, staged);
        self.events.emit(PerpEvent::ShortRedeemed {
            vault_id,
            redeemer: caller,
            collateral_paid: excess,
            timestamp: now,
        });
        self.events.emit(PerpEvent::VaultClosed {
            vault_id,
            timestamp: now,
        });
        Ok(excess)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Guard: normal operations require the active, unpaused state
    fn ensure_active(&self) -> PerpResult<()> {
        if self.state.is_shut_down {
            return Err(PerpError::AlreadyShutDown);
        }
        if self.state.is_paused {
            return Err(PerpError::ProtocolPaused);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: Address) -> PerpResult<()> {
        if caller != self.config.owner {
            return Err(PerpError::NotAuthorized {
                caller,
                vault_id: 0,
            });
        }
        Ok(())
    }

    /// Apply funding and record the factor change
    fn touch(&mut self, now: u64) -> PerpResult<()> {
        if now <= self.state.last_funding_update {
            return Ok(());
        }
        let old = self.state.normalization_factor;
        let new = apply_funding(&mut self.state, &self.oracle, &self.config, now)?;
        self.events.emit(PerpEvent::FundingApplied {
            old_normalization_factor: old,
            new_normalization_factor: new,
            timestamp: now,
        });
        Ok(())
    }

    /// Vault lookup plus owner/operator authorization
    fn authorized_vault(&self, caller: Address, vault_id: VaultId) -> PerpResult<&Vault> {
        let vault = self.vault(vault_id)?;
        let is_owner = self.registry.owner_of(vault_id) == Some(caller);
        let is_operator = vault.operator == Some(caller);
        if !is_owner && !is_operator {
            return Err(PerpError::NotAuthorized { caller, vault_id });
        }
        Ok(vault)
    }

    /// Collateral TWAP for post-operation solvency checks
    fn solvency_price(&self, now: u64) -> PerpResult<u128> {
        self.oracle.get_twap_safe(
            self.config.collateral_quote_pool,
            self.config.collateral_asset,
            self.config.quote_asset,
            self.config.solvency_period(),
            now,
        )
    }

    /// Collateral TWAP under the short lookback, used for liquidation
    /// eligibility and the shutdown settlement snapshot
    fn liquidation_price(&self, now: u64) -> PerpResult<u128> {
        self.oracle.get_twap_safe(
            self.config.collateral_quote_pool,
            self.config.collateral_asset,
            self.config.quote_asset,
            self.config.liquidation_period(),
            now,
        )
    }

    /// Settlement value of a debt amount in collateral units at the
    /// given price, rounded down (payouts never round in the payee's
    /// favor)
    fn settlement_value(&self, debt_amount: u128, price: u128) -> PerpResult<u128> {
        let normalized = wad_mul(debt_amount, self.state.normalization_factor)?;
        mul_div(normalized, price, WAD * INDEX_SCALE)
    }

    /// Fee on the collateral value of newly minted debt
    fn mint_fee(&self, debt_minted: u128, price: u128) -> PerpResult<u128> {
        let value = self.settlement_value(debt_minted, price)?;
        mul_div(value, self.config.fee_bps as u128, 10_000)
    }

    fn ensure_pool_covers(&self, amount: u128) -> PerpResult<()> {
        if self.collateral_balance < amount {
            return Err(PerpError::InsufficientBalance {
                available: self.collateral_balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Shared withdraw path: remove, re-validate, then report the payout
    fn withdraw_inner(
        &mut self,
        caller: Address,
        now: u64,
        vault_id: VaultId,
        amount: u128,
    ) -> PerpResult<u128> {
        let mut staged = self.vault(vault_id)?.clone();
        accounting::remove_collateral(&mut staged, amount)?;

        let price = self.solvency_price(now)?;
        let solvent = accounting::is_properly_collateralized(
            &staged,
            self.state.normalization_factor,
            price,
            self.config.min_collateral_ratio_bps,
        )?;
        if !solvent {
            return Err(PerpError::Undercollateralized { vault_id });
        }
        self.ensure_pool_covers(amount)?;

        let new_collateral = staged.collateral;
        self.collateral_balance -= amount;
        self.vaults.insert(vault_id, staged);
        self.events.emit(PerpEvent::CollateralWithdrawn {
            vault_id,
            to: caller,
            amount,
            new_collateral,
            timestamp: now,
        });
        Ok(amount)
    }
}
