// BigInt Uniswap v3 concentrated-liquidity math + exact-input swap simulator
// --------------------------------------------------------------------------
// Notes:
// - BigInt end-to-end to avoid overflow/rounding bugs. Rounding semantics match
//   Uniswap (two-step ceil for token0).
// - Pools are immutable snapshots; simulate_swap never mutates its input.
// - Amount signs in results: negative = spent, positive = received.

use std::cmp::min;
use std::collections::BTreeMap;

use ethers::abi::{self, Token as AbiToken};
use ethers::types::{Address, H256, U256};
use ethers::utils::keccak256;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::error::MathError;
use crate::math::fraction::Fraction;

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;
const FEE_DENOMINATOR_PPM: i64 = 1_000_000; // ppm
const Q96_U128: u128 = 1u128 << 96;

// --------------------------------- Helpers ---------------------------------

#[inline]
fn bi(v: i64) -> BigInt { BigInt::from(v) }

#[inline]
pub(crate) fn q96() -> BigInt { BigInt::from(Q96_U128) }

#[inline]
pub(crate) fn ceil_div(a: &BigInt, b: &BigInt) -> BigInt {
    // assumes a>=0, b>0
    if a.is_zero() { return BigInt::zero(); }
    (a + (b - BigInt::one())) / b
}

#[inline]
fn max_bi(a: &BigInt, b: &BigInt) -> BigInt { if a > b { a.clone() } else { b.clone() } }

#[inline]
fn min_bi(a: &BigInt, b: &BigInt) -> BigInt { if a < b { a.clone() } else { b.clone() } }

// -------------------------------- Tick Math --------------------------------

/// Exact TickMath.getSqrtRatioAtTick (Q64.96 integer).
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<BigInt, MathError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(MathError::TickOutOfRange(tick));
    }
    let abs_tick = tick.unsigned_abs();

    // ratio is Q128.128
    let mut ratio = if abs_tick & 0x1 != 0 {
        hex_const("fffcb933bd6fad37aa2d162d1a594001")
    } else {
        BigInt::one() << 128
    };

    macro_rules! ms {
        ($hex:literal, $cond:expr) => {
            if $cond {
                ratio = (&ratio * hex_const($hex)) >> 128;
            }
        };
    }

    ms!("fff97272373d413259a46990580e213a", (abs_tick & 0x2)     != 0);
    ms!("fff2e50f5f656932ef12357cf3c7fdcc", (abs_tick & 0x4)     != 0);
    ms!("ffe5caca7e10e4e61c3624eaa0941cd0", (abs_tick & 0x8)     != 0);
    ms!("ffcb9843d60f6159c9db58835c926644", (abs_tick & 0x10)    != 0);
    ms!("ff973b41fa98c081472e6896dfb254c0", (abs_tick & 0x20)    != 0);
    ms!("ff2ea16466c96a3843ec78b326b52861", (abs_tick & 0x40)    != 0);
    ms!("fe5dee046a99a2a811c461f1969c3053", (abs_tick & 0x80)    != 0);
    ms!("fcbe86c7900a88aedcffc83b479aa3a4", (abs_tick & 0x100)   != 0);
    ms!("f987a7253ac413176f2b074cf7815e54", (abs_tick & 0x200)   != 0);
    ms!("f3392b0822b70005940c7a398e4b70f3", (abs_tick & 0x400)   != 0);
    ms!("e7159475a2c29b7443b29c7fa6e889d9", (abs_tick & 0x800)   != 0);
    ms!("d097f3bdfd2022b8845ad8f792aa5825", (abs_tick & 0x1000)  != 0);
    ms!("a9f746462d870fdf8a65dc1f90e061e5", (abs_tick & 0x2000)  != 0);
    ms!("70d869a156d2a1b890bb3df62baf32f7", (abs_tick & 0x4000)  != 0);
    ms!("31be135f97d08fd981231505542fcfa6", (abs_tick & 0x8000)  != 0);
    ms!("09aa508b5b7a84e1c677de54f3e99bc9", (abs_tick & 0x10000) != 0);
    ms!("05d6af8dedb81196699c329225ee604",  (abs_tick & 0x20000) != 0);
    ms!("2216e584f5fa1ea926041bedfe98",     (abs_tick & 0x40000) != 0);
    ms!("48a170391f7dc42444e8fa2",          (abs_tick & 0x80000) != 0);

    if tick > 0 {
        let max = (BigInt::one() << 256) - 1;
        ratio = max / ratio;
    }
    // round-up shift by 32 (Q128.128 -> Q64.96)
    Ok((&ratio + ((BigInt::one() << 32) - 1)) >> 32)
}

fn hex_const(hex: &str) -> BigInt {
    BigInt::parse_bytes(hex.as_bytes(), 16).expect("Failed to parse BigInt constant")
}

/// Binary search inverse of get_sqrt_ratio_at_tick (exact on-grid).
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: &BigInt) -> Result<i32, MathError> {
    let mut lo = MIN_TICK;
    let mut hi = MAX_TICK;
    while lo < hi {
        let mid = lo + ((hi - lo + 1) / 2);
        if get_sqrt_ratio_at_tick(mid)? <= *sqrt_price_x96 { lo = mid; } else { hi = mid - 1; }
    }
    Ok(lo)
}

// --------------------------- SqrtPriceMath deltas ---------------------------

/// Uniswap-exact rounding:
///   round_up: ceil( ceil( (L << 96) * (sb - sa) / sb ) / sa )
///   else:     floor( floor( (L << 96) * (sb - sa) / sb ) / sa )
pub fn amount0_delta(
    sqrt_ratio_a_x96: &BigInt,
    sqrt_ratio_b_x96: &BigInt,
    liquidity: &BigInt,
    round_up: bool,
) -> BigInt {
    if liquidity.is_zero() { return BigInt::zero(); }
    let (sa, sb) = if sqrt_ratio_a_x96 < sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    } else {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    if sa.is_zero() || sa == sb { return BigInt::zero(); }

    let numerator1 = liquidity << 96;
    let numerator2 = sb - sa;

    if round_up {
        let t = ceil_div(&(&numerator1 * &numerator2), sb);
        ceil_div(&t, sa)
    } else {
        ((&numerator1 * &numerator2) / sb) / sa
    }
}

/// Uniswap-exact rounding:
///   round_up: ceil( L * (sb - sa) / Q96 )
///   else:     floor( L * (sb - sa) / Q96 )
pub fn amount1_delta(
    sqrt_ratio_a_x96: &BigInt,
    sqrt_ratio_b_x96: &BigInt,
    liquidity: &BigInt,
    round_up: bool,
) -> BigInt {
    if liquidity.is_zero() { return BigInt::zero(); }
    let (sa, sb) = if sqrt_ratio_a_x96 < sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    } else {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    if sa == sb { return BigInt::zero(); }

    let num = liquidity * (sb - sa);
    let den = q96();
    if round_up { ceil_div(&num, &den) } else { num / den }
}

// ----------------------------- Next price helpers -----------------------------

fn default_limit(direction: SwapDirection) -> Result<BigInt, MathError> {
    match direction {
        SwapDirection::ZeroForOne => get_sqrt_ratio_at_tick(MIN_TICK + 1),
        SwapDirection::OneForZero => get_sqrt_ratio_at_tick(MAX_TICK - 1),
    }
}

#[inline]
fn next_sqrt_from_input_zero_for_one(
    liquidity: &BigInt,
    sqrt_p_x96: &BigInt,
    amount_in_net: &BigInt,
) -> BigInt {
    // getNextSqrtPriceFromAmount0RoundingUp
    // sqrtQ = ceil( ( (L<<96) * sqrtP ) / ( (L<<96) + amountIn * sqrtP ) )
    if amount_in_net.is_zero() || liquidity.is_zero() { return sqrt_p_x96.clone(); }

    let numerator1 = liquidity << 96;
    let numerator = &numerator1 * sqrt_p_x96;
    let denominator = &numerator1 + amount_in_net * sqrt_p_x96;

    ceil_div(&numerator, &denominator)
}

#[inline]
fn next_sqrt_from_input_one_for_zero(liquidity: &BigInt, sqrt_p_x96: &BigInt, amount_in_net: &BigInt) -> BigInt {
    // sqrtQ = P + floor( amountIn * Q96 / L )
    if amount_in_net.is_zero() || liquidity.is_zero() { return sqrt_p_x96.clone(); }
    sqrt_p_x96 + (amount_in_net * q96()) / liquidity
}

// ------------------------------- Data types ----------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolKey {
    pub token0: Address,
    pub token1: Address,
    pub fee_ppm: u32,
    pub tick_spacing: i32,
}

impl PoolKey {
    /// keccak256(abi.encode(token0, token1, fee)), the factory's CREATE2 salt.
    pub fn pool_id(&self) -> H256 {
        let tokens = vec![
            AbiToken::Address(self.token0),
            AbiToken::Address(self.token1),
            AbiToken::Uint(U256::from(self.fee_ppm)),
        ];
        H256::from(keccak256(abi::encode(&tokens)))
    }
}

#[derive(Clone, Debug)]
pub struct TickInfo {
    pub tick: i32,
    pub liquidity_net: BigInt, // signed
}

#[derive(Clone, Debug)]
pub struct PoolState {
    pub key: PoolKey,
    pub sqrt_price_x96: BigInt,
    pub tick: i32,
    pub liquidity: BigInt, // non-negative
    pub ticks: BTreeMap<i32, TickInfo>, // initialized ticks
}

impl PoolState {
    /// Spot price as token1 per token0 in raw units: (sqrtP / 2^96)^2.
    pub fn token0_price(&self) -> Fraction {
        let num = &self.sqrt_price_x96 * &self.sqrt_price_x96;
        let den = BigInt::one() << 192;
        Fraction::new(num, den).unwrap_or_else(Fraction::zero)
    }

    /// Spot price as token0 per token1 in raw units.
    pub fn token1_price(&self) -> Fraction {
        self.token0_price().invert().unwrap_or_else(Fraction::zero)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwapDirection { ZeroForOne, OneForZero }

impl SwapDirection {
    pub fn for_input(pool_token0: Address, token_in: Address) -> Self {
        if pool_token0 == token_in { SwapDirection::ZeroForOne } else { SwapDirection::OneForZero }
    }
}

#[derive(Clone, Debug)]
pub struct SwapParams {
    pub direction: SwapDirection,
    pub amount_specified: BigInt,     // exact input (>0)
    pub sqrt_price_limit_x96: BigInt, // bound
    pub fee_ppm: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SwapResult {
    pub amount0: BigInt,        // negative if spent
    pub amount1: BigInt,        // positive if received
    pub sqrt_price_x96: BigInt,
    pub tick: i32,
    pub liquidity: BigInt,
    pub crossed_ticks: usize,
    /// Input left over when liquidity or the price limit ran out.
    pub amount_remaining: BigInt,
}

impl SwapResult {
    pub fn is_complete(&self) -> bool {
        !self.amount_remaining.is_positive()
    }

    pub fn amount_in(&self, direction: SwapDirection) -> BigInt {
        match direction {
            SwapDirection::ZeroForOne => -self.amount0.clone(),
            SwapDirection::OneForZero => -self.amount1.clone(),
        }
    }

    pub fn amount_out(&self, direction: SwapDirection) -> BigInt {
        match direction {
            SwapDirection::ZeroForOne => self.amount1.clone(),
            SwapDirection::OneForZero => self.amount0.clone(),
        }
    }
}

// ------------------------------- Swap math step -------------------------------

fn compute_swap_step(
    sqrt_price_x96: &BigInt,
    sqrt_price_target_x96: &BigInt,
    liquidity: &BigInt,
    amount_remaining: &BigInt,
    fee_ppm: u32,
    zero_for_one: bool,
) -> (BigInt /*sqrtQ*/, BigInt /*amountIn*/, BigInt /*amountOut*/, BigInt /*fee*/) {
    let denom = bi(FEE_DENOMINATOR_PPM);
    let fee_complement = &denom - bi(fee_ppm as i64);

    let amount_remaining_less_fee = (amount_remaining * &fee_complement) / &denom;

    let amount_in_to_target = if zero_for_one {
        amount0_delta(sqrt_price_target_x96, sqrt_price_x96, liquidity, true)
    } else {
        amount1_delta(sqrt_price_x96, sqrt_price_target_x96, liquidity, true)
    };
    let gross_to_target = ceil_div(&(&amount_in_to_target * &denom), &fee_complement);

    if &gross_to_target <= amount_remaining {
        let amount_out = if zero_for_one {
            amount1_delta(sqrt_price_target_x96, sqrt_price_x96, liquidity, false)
        } else {
            amount0_delta(sqrt_price_x96, sqrt_price_target_x96, liquidity, false)
        };
        let fee_amt = &gross_to_target - &amount_in_to_target;
        return (sqrt_price_target_x96.clone(), amount_in_to_target, amount_out, fee_amt);
    }

    // partial move inside the current range
    let (sqrt_q, amount_in_used, amount_out_recv) = if zero_for_one {
        let q = next_sqrt_from_input_zero_for_one(liquidity, sqrt_price_x96, &amount_remaining_less_fee);
        let used = amount0_delta(&q, sqrt_price_x96, liquidity, true);
        let out = amount1_delta(&q, sqrt_price_x96, liquidity, false);
        (q, used, out)
    } else {
        let q = next_sqrt_from_input_one_for_zero(liquidity, sqrt_price_x96, &amount_remaining_less_fee);
        let used = amount1_delta(sqrt_price_x96, &q, liquidity, true);
        let out = amount0_delta(sqrt_price_x96, &q, liquidity, false);
        (q, used, out)
    };
    // the whole remainder is consumed; what is not input is fee
    let fee_amt = amount_remaining - &amount_in_used;
    (sqrt_q, amount_in_used, amount_out_recv, fee_amt)
}

// -------------------------------- Simulator ---------------------------------

fn next_initialized_tick(
    ticks: &BTreeMap<i32, TickInfo>,
    current_tick: i32,
    direction: SwapDirection,
) -> (i32, bool) {
    match direction {
        SwapDirection::ZeroForOne => {
            if let Some((&t, _)) = ticks.range(..=current_tick).next_back() { (t, true) } else { (MIN_TICK, false) }
        }
        SwapDirection::OneForZero => {
            if let Some((&t, _)) = ticks.range(current_tick + 1..).next() { (t, true) } else { (MAX_TICK, false) }
        }
    }
}

pub fn simulate_swap(pool: &PoolState, params: &SwapParams) -> Result<SwapResult, MathError> {
    if !params.amount_specified.is_positive() {
        return Err(MathError::NonPositiveAmount);
    }

    let mut amount_remaining = params.amount_specified.clone();
    let mut sqrt_price = pool.sqrt_price_x96.clone();
    let mut liquidity = pool.liquidity.clone();
    let mut current_tick = pool.tick;

    let mut amount0_total = BigInt::zero();
    let mut amount1_total = BigInt::zero();
    let mut ticks_crossed = 0usize;

    match params.direction {
        SwapDirection::ZeroForOne => {
            if params.sqrt_price_limit_x96 >= sqrt_price {
                return Err(MathError::InvalidPriceLimit("must be < current sqrt for ZeroForOne"));
            }
        }
        SwapDirection::OneForZero => {
            if params.sqrt_price_limit_x96 <= sqrt_price {
                return Err(MathError::InvalidPriceLimit("must be > current sqrt for OneForZero"));
            }
        }
    }

    let fee_ppm = min((FEE_DENOMINATOR_PPM - 1) as u32, params.fee_ppm);
    let zero_for_one = matches!(params.direction, SwapDirection::ZeroForOne);

    // Zero-liquidity gaps are walked through: the step moves the price to the
    // next initialized tick at zero cost.
    while amount_remaining.is_positive() {
        let (next_tick, has_next) = next_initialized_tick(&pool.ticks, current_tick, params.direction);
        let sqrt_next = if has_next { get_sqrt_ratio_at_tick(next_tick)? } else { default_limit(params.direction)? };

        let sqrt_target_bound = match params.direction {
            SwapDirection::ZeroForOne => max_bi(&params.sqrt_price_limit_x96, &sqrt_next),
            SwapDirection::OneForZero => min_bi(&params.sqrt_price_limit_x96, &sqrt_next),
        };

        let (sqrt_q, used_in, got_out, fee_amt) =
            compute_swap_step(&sqrt_price, &sqrt_target_bound, &liquidity, &amount_remaining, fee_ppm, zero_for_one);

        if zero_for_one {
            amount0_total -= &used_in + &fee_amt;
            amount1_total += &got_out;
        } else {
            amount1_total -= &used_in + &fee_amt;
            amount0_total += &got_out;
        }
        amount_remaining -= &used_in + &fee_amt;
        sqrt_price = sqrt_q;

        let crossed = has_next && sqrt_price == sqrt_next;
        if crossed {
            ticks_crossed += 1;
            if let Some(ti) = pool.ticks.get(&next_tick) {
                match params.direction {
                    // moving left: liquidity -= liquidityNet
                    SwapDirection::ZeroForOne => liquidity -= &ti.liquidity_net,
                    // moving right: liquidity += liquidityNet
                    SwapDirection::OneForZero => liquidity += &ti.liquidity_net,
                }
            }
            if liquidity.is_negative() {
                liquidity = BigInt::zero();
            }
            current_tick = match params.direction {
                SwapDirection::ZeroForOne => next_tick - 1,
                SwapDirection::OneForZero => next_tick,
            };
        } else {
            current_tick = get_tick_at_sqrt_ratio(&sqrt_price)?;
            break;
        }
    }

    Ok(SwapResult {
        amount0: amount0_total,
        amount1: amount1_total,
        sqrt_price_x96: sqrt_price,
        tick: current_tick,
        liquidity,
        crossed_ticks: ticks_crossed,
        amount_remaining,
    })
}

/// Exact-input swap of `amount_in` raw units with the pool's own fee and no
/// price limit.
pub fn simulate_exact_in(
    pool: &PoolState,
    direction: SwapDirection,
    amount_in: &BigInt,
) -> Result<SwapResult, MathError> {
    let params = SwapParams {
        direction,
        amount_specified: amount_in.clone(),
        sqrt_price_limit_x96: default_limit(direction)?,
        fee_ppm: pool.key.fee_ppm,
    };
    simulate_swap(pool, &params)
}

// ------------------------------ Pool builders --------------------------------

/// Build a snapshot from on-chain style data.
#[allow(clippy::too_many_arguments)]
pub fn create_pool_with_real_data(
    token0: Address,
    token1: Address,
    fee_ppm: u32,
    tick_spacing: i32,
    sqrt_price_x96: BigInt,
    current_tick: i32,
    liquidity: BigInt,
    tick_data: Vec<(i32, BigInt)>, // Vec of (tick, liquidityNet)
) -> PoolState {
    let ticks = tick_data
        .into_iter()
        .map(|(tick, liquidity_net)| (tick, TickInfo { tick, liquidity_net }))
        .collect();

    PoolState {
        key: PoolKey { token0, token1, fee_ppm, tick_spacing },
        sqrt_price_x96,
        tick: current_tick,
        liquidity,
        ticks,
    }
}

/// A pool priced exactly at `current_tick` with `liquidity` active over
/// `current_tick ± half_width` (rounded out to the tick spacing).
pub fn pool_with_liquidity_band(
    token0: Address,
    token1: Address,
    fee_ppm: u32,
    tick_spacing: i32,
    current_tick: i32,
    liquidity: BigInt,
    half_width: i32,
) -> Result<PoolState, MathError> {
    let lower = ((current_tick - half_width).div_euclid(tick_spacing)) * tick_spacing;
    let upper = ((current_tick + half_width).div_euclid(tick_spacing) + 1) * tick_spacing;
    let lower = lower.max(MIN_TICK - MIN_TICK % tick_spacing);
    let upper = upper.min(MAX_TICK - MAX_TICK % tick_spacing);
    let sqrt_price_x96 = get_sqrt_ratio_at_tick(current_tick)?;

    Ok(create_pool_with_real_data(
        token0,
        token1,
        fee_ppm,
        tick_spacing,
        sqrt_price_x96,
        current_tick,
        liquidity.clone(),
        vec![(lower, liquidity.clone()), (upper, -liquidity)],
    ))
}

// ---------------------------------- Tests ------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(x: u8) -> Address { Address::from([x; 20]) }

    fn e18(v: u64) -> BigInt { BigInt::from(v) * BigInt::from(10u64).pow(18) }

    fn deep_pool(fee_ppm: u32) -> PoolState {
        pool_with_liquidity_band(addr(1), addr(2), fee_ppm, 60, 0, e18(1_000_000), 6_000).unwrap()
    }

    #[test]
    fn tick_math_bounds() {
        assert!(get_sqrt_ratio_at_tick(MIN_TICK - 1).is_err());
        assert!(get_sqrt_ratio_at_tick(MAX_TICK + 1).is_err());
        assert_eq!(get_sqrt_ratio_at_tick(0).unwrap(), q96());
        let min = get_sqrt_ratio_at_tick(MIN_TICK).unwrap();
        let max = get_sqrt_ratio_at_tick(MAX_TICK).unwrap();
        assert_eq!(min, BigInt::from(4295128739u64));
        assert_eq!(max, BigInt::parse_bytes(b"1461446703485210103287273052203988822378723970342", 10).unwrap());
    }

    #[test]
    fn tick_math_is_monotone_across_every_bit() {
        // each power of two switches one multiplier of the table on
        for bit in 0..20 {
            let t = 1i32 << bit;
            for tick in [t, -t] {
                let below = get_sqrt_ratio_at_tick(tick - 1).unwrap();
                let at = get_sqrt_ratio_at_tick(tick).unwrap();
                let above = get_sqrt_ratio_at_tick(tick + 1).unwrap();
                assert!(below < at && at < above, "tick {}", tick);
            }
        }
        for t in [-300_000, 262_144, 500_000, MIN_TICK + 1, MAX_TICK - 1] {
            let s = get_sqrt_ratio_at_tick(t).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(&s).unwrap(), t);
        }
    }

    #[test]
    fn tick_round_trip() {
        for t in [-200_000, -60, -1, 0, 1, 59, 123_456] {
            let s = get_sqrt_ratio_at_tick(t).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(&s).unwrap(), t);
        }
    }

    #[test]
    fn basic_swap_zero_for_one() {
        let p = deep_pool(500);
        let res = simulate_exact_in(&p, SwapDirection::ZeroForOne, &e18(10)).unwrap();
        assert!(res.is_complete());
        assert_eq!(res.amount_in(SwapDirection::ZeroForOne), e18(10));
        let out = res.amount_out(SwapDirection::ZeroForOne);
        // price 1, fee 5 bps, negligible impact
        assert!(out < e18(10) && out > e18(10) * 999 / 1000, "out {}", out);
        assert!(res.sqrt_price_x96 < p.sqrt_price_x96);
    }

    #[test]
    fn basic_swap_one_for_zero_moves_price_up() {
        let p = deep_pool(3000);
        let res = simulate_exact_in(&p, SwapDirection::OneForZero, &e18(1_000)).unwrap();
        assert!(res.is_complete());
        assert!(res.sqrt_price_x96 > p.sqrt_price_x96);
        assert!(res.amount_out(SwapDirection::OneForZero) < e18(1_000));
    }

    #[test]
    fn swap_past_liquidity_leaves_remainder() {
        let p = pool_with_liquidity_band(addr(1), addr(2), 3000, 60, 0, e18(10), 60).unwrap();
        let res = simulate_exact_in(&p, SwapDirection::ZeroForOne, &e18(1_000)).unwrap();
        assert!(!res.is_complete());
        assert!(res.crossed_ticks >= 1);
        assert!(res.liquidity.is_zero());
    }

    #[test]
    fn rejects_non_positive_amount() {
        let p = deep_pool(500);
        assert_eq!(
            simulate_exact_in(&p, SwapDirection::ZeroForOne, &BigInt::zero()).unwrap_err(),
            MathError::NonPositiveAmount
        );
    }

    #[test]
    fn pool_id_is_order_sensitive_and_stable() {
        let p = deep_pool(500);
        let mut other = p.key.clone();
        assert_eq!(p.key.pool_id(), other.pool_id());
        other.fee_ppm = 3000;
        assert_ne!(p.key.pool_id(), other.pool_id());
    }
}
