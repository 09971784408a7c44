// Constant-product (x*y=k) pair math with an input fee
// ----------------------------------------------------
// Notes:
// - All math is done in raw token units (integers). No floating point.
// - Fee is expressed in basis points (bps). γ = (10_000 - fee_bps) / 10_000.
// - Token order is never assumed. Direction is explicit and reserves are mapped accordingly.

use std::cmp::min;

use ethers::types::{Address, U256};
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::MathError;
use crate::math::uniswap_v3::SwapDirection;

// ------------------------------- Data types ----------------------------------

/// Constant-product pair snapshot.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairState {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256, // raw units
    pub reserve1: U256, // raw units
    pub fee_bps: u32,   // e.g. 30 for 0.3%
}

impl PairState {
    #[inline]
    pub fn is_zero_liquidity(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }
}

/// Outcome of an exact-input swap against a pair.
#[derive(Clone, Debug)]
pub struct PairSwapResult {
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    pub reserve0_after: U256,
    pub reserve1_after: U256,
}

// ------------------------------- Core math -----------------------------------

/// out = ( (in * γ) * R_out ) / ( R_in + (in * γ) )
#[inline]
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::zero();
    }
    let fee_bps = min(fee_bps, 9_999); // avoid γ=0 edge
    let num = U256::from(10_000u32 - fee_bps);
    let den = U256::from(10_000u32);

    // widen to BigInt: in * γ * R_out can exceed 256 bits for large reserves
    let a = u256_to_bigint(amount_in) * u256_to_bigint(num);
    let numerator = &a * u256_to_bigint(reserve_out);
    let denominator = u256_to_bigint(reserve_in) * u256_to_bigint(den) + a;
    bigint_to_u256(&(numerator / denominator)).unwrap_or_else(U256::zero)
}

/// Map direction to (reserve_in, reserve_out).
#[inline]
pub fn map_direction(pair: &PairState, direction: SwapDirection) -> (U256, U256) {
    match direction {
        SwapDirection::ZeroForOne => (pair.reserve0, pair.reserve1),
        SwapDirection::OneForZero => (pair.reserve1, pair.reserve0),
    }
}

/// Exact-input swap. The full input enters the pool, fee included.
pub fn simulate_exact_in(
    pair: &PairState,
    direction: SwapDirection,
    amount_in: &BigInt,
) -> Result<PairSwapResult, MathError> {
    if !amount_in.is_positive() {
        return Err(MathError::NonPositiveAmount);
    }
    let amount_in_u = bigint_to_u256(amount_in).ok_or(MathError::NonPositiveAmount)?;
    let (rin, rout) = map_direction(pair, direction);
    let out = amount_out(amount_in_u, rin, rout, pair.fee_bps);

    let (reserve0_after, reserve1_after) = match direction {
        SwapDirection::ZeroForOne => (pair.reserve0.saturating_add(amount_in_u), pair.reserve1 - out),
        SwapDirection::OneForZero => (pair.reserve0 - out, pair.reserve1.saturating_add(amount_in_u)),
    };

    Ok(PairSwapResult {
        amount_in: amount_in.clone(),
        amount_out: u256_to_bigint(out),
        reserve0_after,
        reserve1_after,
    })
}

// -------------------------------- Conversions --------------------------------

pub fn u256_to_bigint(v: U256) -> BigInt {
    let mut buf = [0u8; 32];
    v.to_big_endian(&mut buf);
    BigInt::from_bytes_be(Sign::Plus, &buf)
}

/// `None` for negative values or values wider than 256 bits.
pub fn bigint_to_u256(v: &BigInt) -> Option<U256> {
    if v.is_negative() {
        return None;
    }
    if v.is_zero() {
        return Some(U256::zero());
    }
    let (_, bytes) = v.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    Some(U256::from_big_endian(&bytes))
}

// ---------------------------------- Tests ------------------------------------
