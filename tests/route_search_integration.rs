// tests/route_search_integration.rs
// ===================================
// Multi-path route search over mixed V3 / V2 pool graphs

use std::sync::Arc;

use ethers::types::{Address, U256};
use num_bigint::BigInt;
use num_traits::Signed;
use rust_decimal::Decimal;

use ratio_router::chain::gas::{GasCosts, HopGas};
use ratio_router::engine::router::{PoolGraphRouter, RouteSearch, RoutingConfig};
use ratio_router::error::RouteError;
use ratio_router::math::constant_product::{self, PairState};
use ratio_router::math::uniswap_v3::pool_with_liquidity_band;
use ratio_router::models::{Pool, PoolEntry, PoolGraph, Token};

fn addr(x: u8) -> Address { Address::from([x; 20]) }

fn e18(v: u64) -> BigInt { BigInt::from(v) * BigInt::from(10u64).pow(18) }

fn token(x: u8, usd: Option<i64>) -> Token {
    Token { address: addr(x), symbol: format!("T{}", x), decimals: 18, usd_price: usd.map(Decimal::from) }
}

fn v3(a: u8, b: u8, fee: u32, liquidity: BigInt, tvl: f64) -> PoolEntry {
    let pool = pool_with_liquidity_band(addr(a), addr(b), fee, 60, 0, liquidity, 6_000).unwrap();
    PoolEntry { pool: Pool::V3(pool), tvl_usd: tvl }
}

fn v2(a: u8, b: u8, reserve: u64, tvl: f64) -> PoolEntry {
    let r = U256::from(reserve) * U256::exp10(18);
    PoolEntry {
        pool: Pool::V2(PairState { token0: addr(a), token1: addr(b), reserve0: r, reserve1: r, fee_bps: 30 }),
        tvl_usd: tvl,
    }
}

/// Tokens 1 and 2 priced at $1, token 3 is the wrapped native token at $2000.
fn graph(pools: Vec<PoolEntry>) -> Arc<PoolGraph> {
    Arc::new(PoolGraph {
        block_number: 19_000_000,
        tokens: vec![token(1, Some(1)), token(2, Some(1)), token(3, Some(2000))],
        base_tokens: vec![addr(3)],
        wrapped_native: addr(3),
        gas_price_wei: U256::from(10_000_000_000u64),
        native_usd_price: Decimal::from(2000),
        pools,
    })
}

#[test]
fn test_multi_hop_through_base_token() {
    println!("=== MULTI-HOP THROUGH BASE TOKEN ===");
    // no direct 1-2 pool: 1 -> 3 on V3, 3 -> 2 on V2
    let router = PoolGraphRouter::new(
        graph(vec![v3(1, 3, 3000, e18(1_000_000), 50.0), v2(2, 3, 1_000_000, 40.0)]),
        GasCosts::default(),
    );
    let quote = router.search(addr(1), addr(2), &e18(1_000), &RoutingConfig::default()).unwrap();

    assert_eq!(quote.routes.len(), 1);
    let leg = &quote.routes[0];
    println!("  path: {:?}", leg.pools);
    println!("  out: {}  gas units: {}", quote.amount_out, quote.estimated_gas_used);
    assert_eq!(leg.pools, vec![0, 1]);
    assert_eq!(leg.token_path, vec![addr(1), addr(3), addr(2)]);
    assert_eq!(quote.amount_in, e18(1_000));

    // two fee layers and a little impact
    assert!(quote.amount_out < e18(1_000));
    assert!(quote.amount_out > e18(990));

    let expected_gas = GasCosts::default().path_gas(&[HopGas::V3 { ticks_crossed: leg.ticks_crossed }, HopGas::V2]);
    assert_eq!(quote.estimated_gas_used, expected_gas);
    assert_eq!(quote.estimated_gas_used, leg.gas_units);

    // gas priced in the output token through USD prices
    assert!(quote.gas_cost_in_token_out.is_positive());
    assert_eq!(quote.gas_adjusted_amount_out, &quote.amount_out - &quote.gas_cost_in_token_out);
    let expected_usd = expected_gas as f64 * 10e9 / 1e18 * 2000.0;
    assert!((quote.gas_cost_usd - expected_usd).abs() < 1e-6);
    println!("✅ routed through base token");
}

#[test]
fn test_hop_limit_removes_indirect_routes() {
    let router = PoolGraphRouter::new(
        graph(vec![v3(1, 3, 3000, e18(1_000_000), 50.0), v2(2, 3, 1_000_000, 40.0)]),
        GasCosts::default(),
    );
    let config = RoutingConfig { max_swaps_per_path: 1, ..RoutingConfig::default() };
    let err = router.search(addr(1), addr(2), &e18(1), &config).unwrap_err();
    assert!(matches!(err, RouteError::NoRoute { max_hops: 1, .. }));
}

#[test]
fn test_single_pair_matches_constant_product_formula() {
    let router = PoolGraphRouter::new(graph(vec![v2(1, 2, 5_000, 10.0)]), GasCosts::default());
    let config = RoutingConfig { max_splits: 1, ..RoutingConfig::default() };
    let amount = e18(12);
    let quote = router.search(addr(1), addr(2), &amount, &config).unwrap();

    let reserve = U256::from(5_000u64) * U256::exp10(18);
    let expected = constant_product::amount_out(U256::from(12u64) * U256::exp10(18), reserve, reserve, 30);
    assert_eq!(quote.amount_out, constant_product::u256_to_bigint(expected));
    assert_eq!(quote.routes[0].gas_units, GasCosts::default().v2_base_swap);
}

#[test]
fn test_min_splits_forces_parallel_legs() {
    println!("=== FORCED SPLIT ===");
    let router = PoolGraphRouter::new(
        graph(vec![v3(1, 2, 500, e18(1_000_000), 20.0), v3(1, 2, 3000, e18(1_000_000), 10.0)]),
        GasCosts::default(),
    );
    let config = RoutingConfig { min_splits: 2, max_splits: 2, distribution_percent: 10, ..RoutingConfig::default() };
    let quote = router.search(addr(1), addr(2), &e18(10), &config).unwrap();

    for leg in &quote.routes {
        println!("  {}% via pool {:?}", leg.percent, leg.pools);
    }
    assert_eq!(quote.routes.len(), 2);
    assert_eq!(quote.percent_total(), 100);
    assert_ne!(quote.routes[0].pools, quote.routes[1].pools);
    let total_in: BigInt = quote.routes.iter().map(|r| r.amount_in.clone()).sum();
    assert_eq!(total_in, e18(10));
    assert!(quote.touches_pool(0) && quote.touches_pool(1));
    println!("✅ split honored");
}

#[test]
fn test_unfillable_amount_has_no_route() {
    // tiny pool cannot absorb the trade at any percentage
    let router = PoolGraphRouter::new(graph(vec![v3(1, 2, 3000, BigInt::from(1_000u64), 1.0)]), GasCosts::default());
    let err = router.search(addr(1), addr(2), &e18(1_000_000), &RoutingConfig::default()).unwrap_err();
    assert!(matches!(err, RouteError::NoRoute { .. }));
}

#[test]
fn test_min_splits_falls_back_to_single_pool() {
    // only one pool: two disjoint legs are impossible, the direct route still fills
    let router = PoolGraphRouter::new(graph(vec![v3(1, 2, 500, e18(1_000_000), 20.0)]), GasCosts::default());
    let config = RoutingConfig { min_splits: 2, ..RoutingConfig::default() };
    let quote = router.search(addr(1), addr(2), &e18(10), &config).unwrap();
    assert_eq!(quote.routes.len(), 1);
    assert_eq!(quote.percent_total(), 100);
    assert_eq!(quote.amount_in, e18(10));
}

#[test]
fn test_uneven_distribution_step_still_routes() {
    println!("=== DISTRIBUTION STEP 30% ===");
    let router = PoolGraphRouter::new(graph(vec![v3(1, 2, 500, e18(1_000_000), 20.0)]), GasCosts::default());
    let config = RoutingConfig { distribution_percent: 30, ..RoutingConfig::default() };
    let quote = router.search(addr(1), addr(2), &e18(10), &config).unwrap();
    assert_eq!(quote.percent_total(), 100);
    assert_eq!(quote.routes[0].amount_in, e18(10));
    println!("✅ whole amount routed");
}
