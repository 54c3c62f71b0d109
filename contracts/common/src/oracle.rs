//! Price Oracle
//!
//! Wraps AMM-style price history and serves geometric-mean time-weighted
//! average prices (TWAP) over a requested trailing window. Averaging over
//! a window defeats single-observation manipulation; the max-safe-period
//! query lets callers avoid requesting windows a young pool cannot serve.
//!
//! Pools record `(timestamp, tick)` observations where the instantaneous
//! exchange rate of token1 per token0 is `1.0001^tick`. Averaging ticks
//! (log-space) and exponentiating yields the geometric mean price.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::constants::oracle::{MAX_OBSERVATIONS, MAX_TICK, TICK_BASE_WAD};
use crate::constants::scaling::WAD;
use crate::errors::{PerpError, PerpResult};
use crate::math::{mul_div, wad_pow};
use crate::types::{Address, PoolId, ZERO_ADDRESS};
use crate::{BTreeMap, Vec};

/// A single recorded price observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Observation {
    /// Observation timestamp (seconds)
    pub timestamp: u64,
    /// Tick in force from this observation until the next one
    pub tick: i32,
    /// Running tick-seconds accumulator as of `timestamp`
    pub tick_cumulative: i64,
}

/// Recorded price history of one AMM pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PoolObservations {
    /// First asset of the pair; the tick prices token1 in units of token0
    pub token0: Address,
    /// Second asset of the pair
    pub token1: Address,
    observations: Vec<Observation>,
}

impl PoolObservations {
    /// New empty history for a token pair
    pub fn new(token0: Address, token1: Address) -> Self {
        Self {
            token0,
            token1,
            observations: Vec::new(),
        }
    }

    /// Record a new observation. Non-monotonic timestamps are ignored;
    /// ticks beyond `MAX_TICK` are rejected so derived prices stay
    /// representable.
    pub fn record(&mut self, timestamp: u64, tick: i32) -> PerpResult<()> {
        if tick.unsigned_abs() > MAX_TICK as u32 {
            return Err(PerpError::InvalidState);
        }

        let cumulative = match self.observations.last() {
            None => 0,
            Some(last) => {
                if timestamp <= last.timestamp {
                    return Ok(()); // ignore duplicate or past timestamps
                }
                let elapsed = (timestamp - last.timestamp) as i64;
                last.tick_cumulative + last.tick as i64 * elapsed
            }
        };

        self.observations.push(Observation {
            timestamp,
            tick,
            tick_cumulative: cumulative,
        });
        if self.observations.len() > MAX_OBSERVATIONS {
            self.observations.remove(0);
        }
        Ok(())
    }

    /// Timestamp of the oldest retained observation
    pub fn oldest_timestamp(&self) -> Option<u64> {
        self.observations.first().map(|o| o.timestamp)
    }

    /// Number of retained observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// True when no observations have been recorded
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Tick-seconds accumulator at an arbitrary time at or after the
    /// oldest observation. Interpolates inside the history and
    /// extrapolates past the newest observation with its tick.
    fn tick_cumulative_at(&self, at: u64) -> Option<i64> {
        let oldest = self.oldest_timestamp()?;
        if at < oldest {
            return None;
        }
        // last observation with timestamp <= at
        let idx = match self
            .observations
            .binary_search_by_key(&at, |o| o.timestamp)
        {
            Ok(i) => i,
            Err(i) => i - 1, // i >= 1 because at >= oldest
        };
        let obs = &self.observations[idx];
        let elapsed = (at - obs.timestamp) as i64;
        Some(obs.tick_cumulative + obs.tick as i64 * elapsed)
    }

    /// Time-weighted mean tick over `[from, to]`, rounded toward
    /// negative infinity (Uniswap convention).
    fn mean_tick(&self, from: u64, to: u64) -> Option<i32> {
        if to <= from {
            return None;
        }
        let delta = self.tick_cumulative_at(to)? - self.tick_cumulative_at(from)?;
        let span = (to - from) as i64;
        let mut tick = delta / span;
        if delta < 0 && delta % span != 0 {
            tick -= 1;
        }
        Some(tick as i32)
    }
}

/// Converts a tick to a WAD price of token1 in units of token0
pub fn tick_to_price(tick: i32) -> PerpResult<u128> {
    let magnitude = wad_pow(TICK_BASE_WAD, tick.unsigned_abs())?;
    if tick >= 0 {
        Ok(magnitude)
    } else {
        mul_div(WAD, WAD, magnitude)
    }
}

/// Oracle over a set of registered AMM pools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct PriceOracle {
    pools: BTreeMap<PoolId, PoolObservations>,
}

impl PriceOracle {
    /// New oracle with no registered pools
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
        }
    }

    /// Register a pool's token pair. Registering the same pool twice is
    /// rejected rather than silently clearing its history.
    pub fn register_pool(
        &mut self,
        pool: PoolId,
        token0: Address,
        token1: Address,
    ) -> PerpResult<()> {
        if token0 == ZERO_ADDRESS || token1 == ZERO_ADDRESS || token0 == token1 {
            return Err(PerpError::InvalidAddress {
                reason: "pool token pair invalid",
            });
        }
        if self.pools.contains_key(&pool) {
            return Err(PerpError::InvalidState);
        }
        self.pools.insert(pool, PoolObservations::new(token0, token1));
        Ok(())
    }

    /// Feed a new observation into a pool's history
    pub fn record(&mut self, pool: PoolId, timestamp: u64, tick: i32) -> PerpResult<()> {
        self.pools
            .get_mut(&pool)
            .ok_or(PerpError::PoolNotFound { pool })?
            .record(timestamp, tick)
    }

    /// Access a pool's recorded history
    pub fn pool(&self, pool: PoolId) -> PerpResult<&PoolObservations> {
        self.pools.get(&pool).ok_or(PerpError::PoolNotFound { pool })
    }

    /// Longest lookback window the pool can currently serve, in seconds
    pub fn get_max_period(&self, pool: PoolId, now: u64) -> PerpResult<u32> {
        let history = self.pool(pool)?;
        let oldest = match history.oldest_timestamp() {
            Some(ts) => ts,
            None => return Ok(0),
        };
        let span = now.saturating_sub(oldest);
        Ok(span.min(u32::MAX as u64) as u32)
    }

    /// Geometric-mean TWAP of `base` priced in `quote`, WAD-scaled, over
    /// the trailing `period` seconds ending at `now`. Fails with
    /// `PeriodTooLong` if the pool's history cannot cover the window and
    /// `StaleOrInvalidPrice` if the computation yields zero.
    pub fn get_twap(
        &self,
        pool: PoolId,
        base: Address,
        quote: Address,
        period: u32,
        now: u64,
    ) -> PerpResult<u128> {
        if period == 0 {
            return Err(PerpError::StaleOrInvalidPrice { pool });
        }
        let max = self.get_max_period(pool, now)?;
        if period > max {
            return Err(PerpError::PeriodTooLong {
                requested: period,
                max,
            });
        }
        self.twap_inner(pool, base, quote, period, now)
    }

    /// As `get_twap`, but caps `period` to what the pool's history
    /// supports instead of failing on a too-long window.
    pub fn get_twap_safe(
        &self,
        pool: PoolId,
        base: Address,
        quote: Address,
        period: u32,
        now: u64,
    ) -> PerpResult<u128> {
        let max = self.get_max_period(pool, now)?;
        let capped = period.min(max);
        if capped == 0 {
            return Err(PerpError::StaleOrInvalidPrice { pool });
        }
        self.twap_inner(pool, base, quote, capped, now)
    }

    fn twap_inner(
        &self,
        pool: PoolId,
        base: Address,
        quote: Address,
        period: u32,
        now: u64,
    ) -> PerpResult<u128> {
        let history = self.pool(pool)?;

        if base != history.token0 && base != history.token1 {
            return Err(PerpError::AssetNotInPool { asset: base });
        }
        if quote != history.token0 && quote != history.token1 || quote == base {
            return Err(PerpError::AssetNotInPool { asset: quote });
        }

        let from = now.saturating_sub(period as u64);
        let tick = history
            .mean_tick(from, now)
            .ok_or(PerpError::StaleOrInvalidPrice { pool })?;

        // tick prices token1 in token0; invert when base is token1
        let price = if base == history.token0 {
            tick_to_price(tick)?
        } else {
            tick_to_price(-tick)?
        };

        if price == 0 {
            return Err(PerpError::StaleOrInvalidPrice { pool });
        }
        Ok(price)
    }
}
