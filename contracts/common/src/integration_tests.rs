//! Cross-module integration tests: oracle feeds driving the funding
//! engine and the vault collateralization check together.

use crate::constants::funding::FUNDING_PERIOD_SECS;
use crate::constants::ratios::MIN_COLLATERAL_RATIO_BPS;
use crate::constants::scaling::{INDEX_SCALE, WAD};
use crate::errors::PerpError;
use crate::funding::{apply_funding, get_denormalized_mark, get_index};
use crate::oracle::PriceOracle;
use crate::types::{Address, ControllerConfig, PoolId, ProtocolState, Vault};
use crate::vault;

const OWNER: Address = [1u8; 32];
const COLLATERAL: Address = [2u8; 32];
const QUOTE: Address = [3u8; 32];
const POWER_PERP: Address = [4u8; 32];
const ETH_POOL: PoolId = [5u8; 32];
const PERP_POOL: PoolId = [6u8; 32];
const T0: u64 = 1_700_000_000;

// ~2000 in ticks: ln(2000) / ln(1.0001)
const ETH_TICK: i32 = 76_013;
// parity perp tick: perp price in collateral = eth_price / INDEX_SCALE,
// and ln(10_000) / ln(1.0001) ~= 92_108
const PARITY_PERP_TICK: i32 = ETH_TICK - 92_108;

fn config() -> ControllerConfig {
    ControllerConfig::new(OWNER, COLLATERAL, QUOTE, POWER_PERP, ETH_POOL, PERP_POOL)
}

fn oracle_at_parity() -> PriceOracle {
    let mut oracle = PriceOracle::new();
    oracle.register_pool(ETH_POOL, COLLATERAL, QUOTE).unwrap();
    oracle
        .register_pool(PERP_POOL, POWER_PERP, COLLATERAL)
        .unwrap();
    oracle.record(ETH_POOL, T0, ETH_TICK).unwrap();
    oracle.record(PERP_POOL, T0, PARITY_PERP_TICK).unwrap();
    oracle
}

fn assert_close(actual: u128, expected: u128, tol_bps: u128) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff * 10_000 <= expected * tol_bps,
        "actual {actual} vs expected {expected}"
    );
}

#[test]
fn test_index_tracks_price_squared() {
    let oracle = oracle_at_parity();
    let index = get_index(&oracle, &config(), 600, T0 + 3_600).unwrap();
    // 2000^2 / 1e4 = 400 quote units
    assert_close(index, 400 * WAD, 30);
}

#[test]
fn test_mark_near_index_at_parity() {
    let oracle = oracle_at_parity();
    let config = config();
    let now = T0 + 3_600;
    let index = get_index(&oracle, &config, 600, now).unwrap();
    let mark = get_denormalized_mark(&oracle, &config, WAD, 600, now).unwrap();
    assert_close(mark, index, 30);
}

#[test]
fn test_apply_funding_at_parity_barely_moves_factor() {
    let oracle = oracle_at_parity();
    let config = config();
    let mut state = ProtocolState::new(T0);

    let factor = apply_funding(&mut state, &oracle, &config, T0 + FUNDING_PERIOD_SECS).unwrap();
    assert_close(factor, WAD, 20);
    assert_eq!(state.last_funding_update, T0 + FUNDING_PERIOD_SECS);
}

#[test]
fn test_apply_funding_twice_same_instant_is_noop() {
    let oracle = oracle_at_parity();
    let config = config();
    let mut state = ProtocolState::new(T0);

    let now = T0 + 3_600;
    let first = apply_funding(&mut state, &oracle, &config, now).unwrap();
    let second = apply_funding(&mut state, &oracle, &config, now).unwrap();
    assert_eq!(first, second);
    assert_eq!(state.normalization_factor, second);
}

#[test]
fn test_apply_funding_without_history_fails() {
    let mut oracle = PriceOracle::new();
    oracle.register_pool(ETH_POOL, COLLATERAL, QUOTE).unwrap();
    oracle
        .register_pool(PERP_POOL, POWER_PERP, COLLATERAL)
        .unwrap();
    let config = config();
    let mut state = ProtocolState::new(T0);

    assert!(matches!(
        apply_funding(&mut state, &oracle, &config, T0 + 60),
        Err(PerpError::StaleOrInvalidPrice { .. })
    ));
    // state untouched on failure
    assert_eq!(state.last_funding_update, T0);
}

#[test]
fn test_funding_window_capped_to_pool_history() {
    // pools born one minute ago, funding gap of a week: the lookback is
    // capped instead of erroring
    let mut oracle = PriceOracle::new();
    oracle.register_pool(ETH_POOL, COLLATERAL, QUOTE).unwrap();
    oracle
        .register_pool(PERP_POOL, POWER_PERP, COLLATERAL)
        .unwrap();
    let born = T0 + 7 * 86_400 - 60;
    oracle.record(ETH_POOL, born, ETH_TICK).unwrap();
    oracle.record(PERP_POOL, born, PARITY_PERP_TICK).unwrap();

    let config = config();
    let mut state = ProtocolState::new(T0);
    let factor = apply_funding(&mut state, &oracle, &config, T0 + 7 * 86_400).unwrap();
    // seven days at parity: still hugs 1.0
    assert_close(factor, WAD, 100);
}

#[test]
fn test_vault_solvency_with_live_oracle_price() {
    let oracle = oracle_at_parity();
    let config = config();
    let now = T0 + 3_600;
    let price = oracle
        .get_twap_safe(ETH_POOL, COLLATERAL, QUOTE, 600, now)
        .unwrap();

    // debt value per unit = price / INDEX_SCALE ~= 0.2 collateral;
    // 10 collateral at 150% supports ~33 short
    let mut vault = Vault::new(1);
    vault.collateral = 10 * WAD;
    vault.short_amount = 30 * WAD;
    assert!(
        vault::is_properly_collateralized(&vault, WAD, price, MIN_COLLATERAL_RATIO_BPS).unwrap()
    );

    vault.short_amount = 35 * WAD;
    assert!(
        !vault::is_properly_collateralized(&vault, WAD, price, MIN_COLLATERAL_RATIO_BPS).unwrap()
    );
}

#[test]
fn test_index_scale_constant_matches_tick_offset() {
    // the parity tick offset hard-coded above must match INDEX_SCALE
    let offset_price = crate::oracle::tick_to_price(92_108).unwrap();
    assert_close(offset_price, INDEX_SCALE * WAD, 10);
}
