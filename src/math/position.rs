//! Concentrated-liquidity position model.
//!
//! Given a pool snapshot and a tick range, computes the token ratio required
//! to mint a position and converts between liquidity and token amounts at the
//! pool's current price.

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::PositionError;
use crate::math::fraction::Fraction;
use crate::math::uniswap_v3::{
    amount0_delta, amount1_delta, get_sqrt_ratio_at_tick, q96, PoolState, MAX_TICK, MIN_TICK,
};

/// Liquidity quantum used to express the required ratio: 1e18.
pub fn ratio_precision() -> BigInt {
    BigInt::from(10u64).pow(18)
}

/// A validated `[tick_lower, tick_upper)` range.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickRange {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl TickRange {
    /// # Errors
    ///
    /// [`PositionError::InvalidRange`] when `tick_lower >= tick_upper`, a tick
    /// lies outside `[MIN_TICK, MAX_TICK]`, or a tick is not a multiple of
    /// `tick_spacing`.
    pub fn new(tick_lower: i32, tick_upper: i32, tick_spacing: i32) -> Result<Self, PositionError> {
        let invalid = |reason| PositionError::InvalidRange { lower: tick_lower, upper: tick_upper, reason };
        if tick_lower >= tick_upper {
            return Err(invalid("tick_lower must be below tick_upper"));
        }
        if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(invalid("tick outside the representable range"));
        }
        if tick_spacing <= 0 || tick_lower % tick_spacing != 0 || tick_upper % tick_spacing != 0 {
            return Err(invalid("tick not aligned to the pool's tick spacing"));
        }
        Ok(Self { tick_lower, tick_upper })
    }

    /// Re-validates against a specific pool.
    pub fn validate_for(&self, pool: &PoolState) -> Result<Self, PositionError> {
        Self::new(self.tick_lower, self.tick_upper, pool.key.tick_spacing)
    }

    fn sqrt_bounds(&self) -> Result<(BigInt, BigInt), PositionError> {
        Ok((get_sqrt_ratio_at_tick(self.tick_lower)?, get_sqrt_ratio_at_tick(self.tick_upper)?))
    }
}

/// Token amounts needed per `ratio_precision()` units of liquidity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionRatio {
    pub amount0_per_unit_liquidity: BigInt,
    pub amount1_per_unit_liquidity: BigInt,
}

/// Where the current price sits relative to the range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSide {
    /// Price at or below the range: the position holds only token0.
    Below,
    InRange,
    /// Price at or above the range: the position holds only token1.
    Above,
}

impl PositionRatio {
    pub fn side(&self) -> RangeSide {
        match (self.amount0_per_unit_liquidity.is_zero(), self.amount1_per_unit_liquidity.is_zero()) {
            (false, true) => RangeSide::Below,
            (true, false) => RangeSide::Above,
            _ => RangeSide::InRange,
        }
    }

    pub fn is_single_sided(&self) -> bool {
        self.side() != RangeSide::InRange
    }

    /// token0 per token1; `None` when the position holds no token1.
    pub fn as_fraction(&self) -> Option<Fraction> {
        Fraction::new(self.amount0_per_unit_liquidity.clone(), self.amount1_per_unit_liquidity.clone())
    }
}

/// Ratio required to mint liquidity in `range` at the pool's current price.
pub fn required_ratio(pool: &PoolState, range: &TickRange) -> Result<PositionRatio, PositionError> {
    let range = range.validate_for(pool)?;
    required_ratio_at(&pool.sqrt_price_x96, &range)
}

/// Same as [`required_ratio`] at an arbitrary sqrt price, used to re-target
/// after a swap has moved the pool.
pub fn required_ratio_at(sqrt_price_x96: &BigInt, range: &TickRange) -> Result<PositionRatio, PositionError> {
    let (amount0, amount1) = amounts_at_sqrt_price(sqrt_price_x96, range, &ratio_precision(), true)?;
    Ok(PositionRatio {
        amount0_per_unit_liquidity: amount0,
        amount1_per_unit_liquidity: amount1,
    })
}

/// Token amounts consumed by `liquidity` in `range` at the pool's current
/// price, rounded up as a mint would.
pub fn amounts_for_liquidity(
    pool: &PoolState,
    range: &TickRange,
    liquidity: &BigInt,
) -> Result<(BigInt, BigInt), PositionError> {
    let range = range.validate_for(pool)?;
    amounts_for_liquidity_at(&pool.sqrt_price_x96, &range, liquidity)
}

/// Same as [`amounts_for_liquidity`] at an arbitrary sqrt price.
pub fn amounts_for_liquidity_at(
    sqrt_price_x96: &BigInt,
    range: &TickRange,
    liquidity: &BigInt,
) -> Result<(BigInt, BigInt), PositionError> {
    amounts_at_sqrt_price(sqrt_price_x96, range, liquidity, true)
}

fn amounts_at_sqrt_price(
    sqrt_price_x96: &BigInt,
    range: &TickRange,
    liquidity: &BigInt,
    round_up: bool,
) -> Result<(BigInt, BigInt), PositionError> {
    let (sa, sb) = range.sqrt_bounds()?;
    let sp = sqrt_price_x96;
    if sp <= &sa {
        Ok((amount0_delta(&sa, &sb, liquidity, round_up), BigInt::zero()))
    } else if sp >= &sb {
        Ok((BigInt::zero(), amount1_delta(&sa, &sb, liquidity, round_up)))
    } else {
        Ok((
            amount0_delta(sp, &sb, liquidity, round_up),
            amount1_delta(&sa, sp, liquidity, round_up),
        ))
    }
}

/// Largest liquidity mintable from `amount0`/`amount1` at `sqrt_price_x96`.
pub fn liquidity_for_amounts(
    sqrt_price_x96: &BigInt,
    range: &TickRange,
    amount0: &BigInt,
    amount1: &BigInt,
) -> Result<BigInt, PositionError> {
    let (sa, sb) = range.sqrt_bounds()?;
    let sp = sqrt_price_x96;
    let q = q96();

    // L0 = amount0 * floor(s * sb / Q96) / (sb - s),  s = max(sp, sa)
    let liquidity0 = |s: &BigInt| -> BigInt {
        let denom = &sb - s;
        if !denom.is_positive() {
            return BigInt::zero();
        }
        let intermediate = (s * &sb) / &q;
        (amount0 * intermediate) / denom
    };
    // L1 = amount1 * Q96 / (s - sa),  s = min(sp, sb)
    let liquidity1 = |s: &BigInt| -> BigInt {
        let denom = s - &sa;
        if !denom.is_positive() { BigInt::zero() } else { (amount1 * &q) / denom }
    };

    let l = if sp <= &sa {
        liquidity0(&sa)
    } else if sp >= &sb {
        liquidity1(&sb)
    } else {
        // the limiting side so both tokens are respected
        let (l0, l1) = (liquidity0(sp), liquidity1(sp));
        if l0 < l1 { l0 } else { l1 }
    };
    Ok(if l.is_negative() { BigInt::zero() } else { l })
}

/// [`liquidity_for_amounts`] checked against the mint: the returned
/// liquidity never needs more than `amount0`/`amount1` once
/// [`amounts_for_liquidity_at`] rounds up.
pub fn mintable_liquidity(
    sqrt_price_x96: &BigInt,
    range: &TickRange,
    amount0: &BigInt,
    amount1: &BigInt,
) -> Result<BigInt, PositionError> {
    let mut liquidity = liquidity_for_amounts(sqrt_price_x96, range, amount0, amount1)?;
    let mut backoff = BigInt::one();
    while liquidity.is_positive() {
        let (need0, need1) = amounts_for_liquidity_at(sqrt_price_x96, range, &liquidity)?;
        if &need0 <= amount0 && &need1 <= amount1 {
            break;
        }
        liquidity -= &backoff;
        backoff = &backoff * BigInt::from(2);
    }
    Ok(if liquidity.is_negative() { BigInt::zero() } else { liquidity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::uniswap_v3::pool_with_liquidity_band;
    use ethers::types::Address;

    fn addr(x: u8) -> Address { Address::from([x; 20]) }

    fn e18(v: u64) -> BigInt { BigInt::from(v) * ratio_precision() }

    fn pool_at(tick: i32) -> PoolState {
        pool_with_liquidity_band(addr(1), addr(2), 3000, 60, tick, e18(1_000_000), 60_000).unwrap()
    }

    #[test]
    fn invalid_ranges_rejected() {
        assert!(matches!(TickRange::new(60, 60, 60), Err(PositionError::InvalidRange { .. })));
        assert!(matches!(TickRange::new(120, 60, 60), Err(PositionError::InvalidRange { .. })));
        assert!(matches!(TickRange::new(-887_280, 60, 60), Err(PositionError::InvalidRange { .. })));
        assert!(matches!(TickRange::new(-50, 60, 60), Err(PositionError::InvalidRange { .. })));
        assert!(TickRange::new(-60, 60, 60).is_ok());
    }

    #[test]
    fn range_checked_against_pool_spacing() {
        let pool = pool_at(0);
        let range = TickRange { tick_lower: -10, tick_upper: 10 };
        assert!(required_ratio(&pool, &range).is_err());
    }

    #[test]
    fn required_ratio_is_idempotent() {
        let pool = pool_at(42);
        let range = TickRange::new(-600, 600, 60).unwrap();
        let a = required_ratio(&pool, &range).unwrap();
        let b = required_ratio(&pool, &range).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn symmetric_range_at_unit_price_is_balanced() {
        let pool = pool_at(0);
        let range = TickRange::new(-600, 600, 60).unwrap();
        let r = required_ratio(&pool, &range).unwrap();
        assert_eq!(r.side(), RangeSide::InRange);
        let ratio = r.as_fraction().unwrap();
        let err = (&ratio - &Fraction::one()).abs();
        assert!(err < Fraction::new(BigInt::from(1), BigInt::from(1_000_000)).unwrap(), "ratio {}", ratio);
    }

    #[test]
    fn single_sided_ranges() {
        let range = TickRange::new(600, 1200, 60).unwrap();
        let below = required_ratio(&pool_at(0), &range).unwrap();
        assert_eq!(below.side(), RangeSide::Below);
        assert!(below.amount1_per_unit_liquidity.is_zero());
        assert!(below.as_fraction().is_none());

        let range = TickRange::new(-1200, -600, 60).unwrap();
        let above = required_ratio(&pool_at(0), &range).unwrap();
        assert_eq!(above.side(), RangeSide::Above);
        assert!(above.amount0_per_unit_liquidity.is_zero());
    }

    #[test]
    fn liquidity_and_amounts_are_consistent() {
        let pool = pool_at(120);
        let range = TickRange::new(-600, 1200, 60).unwrap();
        let (a0, a1) = amounts_for_liquidity(&pool, &range, &e18(10)).unwrap();
        assert!(a0.is_positive() && a1.is_positive());

        // the inverse lands within a few units either side of the original
        let l = liquidity_for_amounts(&pool.sqrt_price_x96, &range, &a0, &a1).unwrap();
        assert!((&l - e18(10)).abs() <= BigInt::from(1_000), "liquidity {}", l);

        let m = mintable_liquidity(&pool.sqrt_price_x96, &range, &a0, &a1).unwrap();
        assert!(m <= l);
        assert!((&m - e18(10)).abs() <= BigInt::from(1_000));
        let (b0, b1) = amounts_for_liquidity(&pool, &range, &m).unwrap();
        assert!(b0 <= a0 && b1 <= a1);
    }

    #[test]
    fn mintable_liquidity_fits_odd_balances() {
        let range = TickRange::new(-600, 1200, 60).unwrap();
        for tick in [-900, -300, 0, 120, 1199, 1500] {
            let pool = pool_at(tick);
            for (a0, a1) in [(7u64, 3u64), (1, 1_000_000), (123_456_789, 987_654_321), (0, 5)] {
                let (a0, a1) = (BigInt::from(a0) * BigInt::from(1_000_003u64), BigInt::from(a1) * BigInt::from(999_983u64));
                let m = mintable_liquidity(&pool.sqrt_price_x96, &range, &a0, &a1).unwrap();
                assert!(!m.is_negative());
                let (n0, n1) = amounts_for_liquidity(&pool, &range, &m).unwrap();
                assert!(n0 <= a0 && n1 <= a1, "tick {} needs ({}, {}) of ({}, {})", tick, n0, n1, a0, a1);
            }
        }
    }

    #[test]
    fn one_sided_balances_mint_nothing_in_range() {
        let pool = pool_at(0);
        let range = TickRange::new(-600, 600, 60).unwrap();
        let l = liquidity_for_amounts(&pool.sqrt_price_x96, &range, &e18(100), &BigInt::zero()).unwrap();
        assert!(l.is_zero());
    }
}
