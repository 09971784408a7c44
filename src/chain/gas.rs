// src/chain/gas.rs
//
// Gas heuristics for routed swaps.
// - Units are estimated per hop from the protocol and ticks crossed
// - Costs are converted to the output token with exact rationals for ranking
// - USD figures are lossy f64, reporting only

use ethers::types::U256;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::Config;
use crate::math::constant_product::u256_to_bigint;
use crate::math::fraction::Fraction;
use crate::models::{PoolGraph, Token};

/// Per-protocol gas constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCosts {
    pub v3_base_swap: u64,
    pub v3_per_hop: u64,
    pub v3_per_init_tick: u64,
    pub v2_base_swap: u64,
    pub v2_per_extra_hop: u64,
}

impl Default for GasCosts {
    fn default() -> Self {
        Self {
            v3_base_swap: 2_000,
            v3_per_hop: 80_000,
            v3_per_init_tick: 31_000,
            v2_base_swap: 135_000,
            v2_per_extra_hop: 50_000,
        }
    }
}

impl GasCosts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            v3_base_swap: config.gas_v3_base_swap,
            v3_per_hop: config.gas_v3_per_hop,
            v3_per_init_tick: config.gas_v3_per_init_tick,
            v2_base_swap: config.gas_v2_base_swap,
            v2_per_extra_hop: config.gas_v2_per_extra_hop,
        }
    }

    /// Units for one path.
    pub fn path_gas(&self, hops: &[HopGas]) -> u64 {
        let mut v3_hops = 0u64;
        let mut v3_ticks = 0u64;
        let mut v2_hops = 0u64;
        for hop in hops {
            match hop {
                HopGas::V3 { ticks_crossed } => {
                    v3_hops += 1;
                    v3_ticks += *ticks_crossed as u64;
                }
                HopGas::V2 => v2_hops += 1,
            }
        }
        let mut total = 0u64;
        if v3_hops > 0 {
            total += self.v3_base_swap + self.v3_per_hop * v3_hops + self.v3_per_init_tick * v3_ticks;
        }
        if v2_hops > 0 {
            total += self.v2_base_swap + self.v2_per_extra_hop * (v2_hops - 1);
        }
        total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopGas {
    V3 { ticks_crossed: usize },
    V2,
}

/// Result DTO for a gas estimate
#[derive(Debug, Clone)]
pub struct GasEstimate {
    pub gas_limit: U256,
    pub gas_price: U256,
    pub total_wei: U256,
    pub total_eth: f64,
    pub total_usd: f64,
}

/// Fast convert U256 wei -> f64 ETH (lossy, for reporting)
#[inline]
pub fn wei_to_eth_f64_fast(v: U256) -> f64 {
    u256_to_bigint(v).to_f64().unwrap_or(f64::MAX) / 1e18
}

/// Snapshot-bound gas pricing.
#[derive(Debug, Clone)]
pub struct GasModel {
    pub costs: GasCosts,
    pub gas_price_wei: U256,
    pub native_usd_price: Decimal,
}

impl GasModel {
    pub fn new(costs: GasCosts, gas_price_wei: U256, native_usd_price: Decimal) -> Self {
        Self { costs, gas_price_wei, native_usd_price }
    }

    pub fn for_graph(costs: GasCosts, graph: &PoolGraph) -> Self {
        Self::new(costs, graph.gas_price_wei, graph.native_usd_price)
    }

    pub fn estimate(&self, gas_units: u64) -> GasEstimate {
        let gas_limit = U256::from(gas_units);
        let total_wei = self.gas_price_wei.checked_mul(gas_limit).unwrap_or_default();
        let total_eth = wei_to_eth_f64_fast(total_wei);
        let total_usd = total_eth * self.native_usd_price.to_f64().unwrap_or(0.0);
        GasEstimate { gas_limit, gas_price: self.gas_price_wei, total_wei, total_eth, total_usd }
    }

    /// Cost of `gas_units` in raw units of `token`, exact.
    ///
    /// `None` when `token` carries no USD price and is not the native token.
    pub fn cost_in_token(&self, gas_units: u64, token: &Token, wrapped_native: &Token) -> Option<Fraction> {
        let total_wei = u256_to_bigint(self.gas_price_wei) * BigInt::from(gas_units);
        let wei = Fraction::from_integer(total_wei);
        if token.address == wrapped_native.address {
            return Some(wei);
        }
        let token_usd = token.usd_price.filter(|p| p.is_sign_positive() && !p.is_zero())?;
        // wei * nativeUsd / 1e18 / tokenUsd * 10^decimals
        let native_usd = Fraction::from_decimal(self.native_usd_price);
        let scale = Fraction::new(
            BigInt::from(10u8).pow(u32::from(token.decimals)),
            BigInt::from(10u8).pow(u32::from(wrapped_native.decimals)),
        )?;
        let price_ratio = &native_usd / &Fraction::from_decimal(token_usd);
        Some(&(&wei * &price_ratio) * &scale)
    }
}

#[cfg(test)]
pub fn create_test_gas_model(gas_price_gwei: u64, eth_price_usd: u64) -> GasModel {
    let gas_price = U256::from(gas_price_gwei).checked_mul(U256::from(1_000_000_000u64)).unwrap_or_default();
    GasModel::new(GasCosts::default(), gas_price, Decimal::from(eth_price_usd))
}
