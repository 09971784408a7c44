// tests/quote_service_integration.rs
// ===================================
// End-to-end swap-to-ratio quotes against the USDC/WETH snapshot fixture

use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ethers::types::Address;
use num_traits::Signed;
use rust_decimal::Decimal;

use ratio_router::bootstrap::AppState;
use ratio_router::chain::snapshot::{PoolProvider, SnapshotPoolProvider};
use ratio_router::config::Config;
use ratio_router::engine::ratio_solver::SwapToRatioStatus;
use ratio_router::engine::router::RoutingConfig;
use ratio_router::engine::service::{quote_to_ratio, quote_to_ratio_async, RatioQuoteParams};
use ratio_router::error::SolveError;
use ratio_router::models::V2_FEE_FLAG;

const SNAPSHOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/usdc_weth_snapshot.json");
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const RECIPIENT: &str = "0x000000000000000000000000000000000000dead";

fn state() -> AppState {
    let config = Config::with_defaults(SNAPSHOT);
    let provider = SnapshotPoolProvider::from_file(SNAPSHOT).expect("fixture snapshot loads");
    AppState::with_provider(&config, provider)
}

/// WETH is passed first on purpose: the service sorts the pair itself.
fn params(eth: &str, usdc: &str, tick_lower: i32, tick_upper: i32) -> RatioQuoteParams {
    RatioQuoteParams {
        token0: "ETH".to_string(),
        token1: "USDC".to_string(),
        fee_amount: 500,
        token0_balance: eth.to_string(),
        token1_balance: usdc.to_string(),
        recipient: RECIPIENT.to_string(),
        tick_lower,
        tick_upper,
        error_tolerance: None,
        max_iterations: None,
        slippage_tolerance: None,
        deadline_secs: None,
        routing: RoutingConfig::default(),
    }
}

#[test]
fn test_usdc_only_balance_is_swapped_toward_the_range_ratio() {
    println!("=== USDC -> USDC/WETH POSITION ===");
    let app = state();
    let quote = quote_to_ratio(app.provider.as_ref(), app.gas_costs, &app.config, &params("0", "10000", 195_000, 197_500), None)
        .expect("quote succeeds");

    assert_eq!(quote.block_number, 19_000_000);
    assert_eq!(quote.token0.symbol, "USDC");
    assert_eq!(quote.token1.symbol, "WETH");

    let route = match &quote.status {
        SwapToRatioStatus::Success(route) => route,
        other => panic!("expected SUCCESS, got {:?}", other),
    };
    println!("  iterations: {}", route.iterations);
    println!("  swap {} USDC raw -> {} wei", route.quote.amount_in, route.quote.amount_out);
    println!("  ratio error: {:.6}", route.ratio_error.to_f64());

    assert_eq!(route.token_in, Address::from_str(USDC).unwrap());
    assert!(route.ratio_error.to_f64().abs() <= 0.01);
    assert!(route.iterations <= 6);
    assert!(route.final_balance0.is_positive() && route.final_balance1.is_positive());
    assert!(route.mintable_liquidity.is_positive());

    let method = quote.method_parameters.as_ref().expect("execution parameters for a successful solve");
    assert_eq!(method.recipient, Address::from_str(RECIPIENT).unwrap());
    assert_eq!(method.calls.len(), route.quote.routes.len());
    for (call, leg) in method.calls.iter().zip(&route.quote.routes) {
        // single hop: token | fee | token
        assert_eq!(call.path.len(), 43);
        let fee = u32::from_be_bytes([0, call.path[20], call.path[21], call.path[22]]);
        assert!(fee == 500 || fee == V2_FEE_FLAG);
        assert_eq!(call.amount_in, leg.amount_in);
        assert!(call.amount_out_minimum <= leg.amount_out);
        assert!(call.amount_out_minimum.is_positive());
    }
    println!("✅ SUCCESS with {} leg(s)", method.calls.len());
}

#[test]
fn test_empty_balances_need_no_swap() {
    let app = state();
    let quote = quote_to_ratio(app.provider.as_ref(), app.gas_costs, &app.config, &params("0", "0", 195_000, 197_500), None).unwrap();
    assert!(matches!(quote.status, SwapToRatioStatus::NoSwapNeeded));
    assert!(quote.method_parameters.is_none());
}

#[test]
fn test_fatal_input_errors() {
    let app = state();
    let run = |p: RatioQuoteParams| quote_to_ratio(app.provider.as_ref(), app.gas_costs, &app.config, &p, None);

    let mut unknown = params("1", "0", 195_000, 197_500);
    unknown.token1 = "DAI".to_string();
    let err = run(unknown).unwrap_err();
    assert!(format!("{:#}", err).contains("unknown token"));

    let err = run(params("1", "0", 195_005, 197_500)).unwrap_err();
    assert!(format!("{:#}", err).contains("invalid tick range"));

    let err = run(params("1.0000000000000000001", "0", 195_000, 197_500)).unwrap_err();
    assert!(format!("{:#}", err).contains("fractional digits"));

    let mut no_pool = params("1", "0", 195_000, 197_500);
    no_pool.fee_amount = 3000;
    assert!(run(no_pool).is_err());

    let mut bad_slippage = params("1", "0", 195_000, 197_500);
    bad_slippage.slippage_tolerance = Some(Decimal::ONE);
    assert!(run(bad_slippage).is_err());
}

#[test]
fn test_cancelled_solve_surfaces_as_error() {
    let app = state();
    let flag = Arc::new(AtomicBool::new(true));
    let err = quote_to_ratio(app.provider.as_ref(), app.gas_costs, &app.config, &params("0", "10000", 195_000, 197_500), Some(flag))
        .unwrap_err();
    assert_eq!(err.downcast_ref::<SolveError>(), Some(&SolveError::Cancelled { iterations: 0 }));
}

#[tokio::test]
async fn test_async_quote_runs_on_blocking_pool() {
    let app = state();
    let provider: Arc<dyn PoolProvider> = app.provider.clone();
    let quote = quote_to_ratio_async(provider, app.gas_costs, app.config.clone(), params("2", "0", 195_000, 197_500))
        .await
        .expect("async quote succeeds");

    match quote.status {
        SwapToRatioStatus::Success(route) => {
            // WETH is token1 and the only balance
            assert_eq!(route.token_out, Address::from_str(USDC).unwrap());
            assert!(route.quote.amount_in.is_positive());
        }
        other => panic!("expected SUCCESS, got {:?}", other),
    }
}

#[test]
fn test_async_and_sync_quotes_agree() {
    let app = state();
    let p = params("0", "2500", 195_000, 197_500);
    let sync = quote_to_ratio(app.provider.as_ref(), app.gas_costs, &app.config, &p, None).unwrap();
    let provider: Arc<dyn PoolProvider> = app.provider.clone();
    let asynced = tokio_test::block_on(quote_to_ratio_async(provider, app.gas_costs, app.config.clone(), p)).unwrap();

    match (sync.status, asynced.status) {
        (SwapToRatioStatus::Success(a), SwapToRatioStatus::Success(b)) => {
            assert_eq!(a.quote.amount_in, b.quote.amount_in);
            assert_eq!(a.quote.amount_out, b.quote.amount_out);
            assert_eq!(a.iterations, b.iterations);
        }
        (a, b) => assert_eq!(a.label(), b.label()),
    }
}
