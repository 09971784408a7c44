use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ethers::types::Address;
use rust_decimal::Decimal;

use crate::chain::execution::{build_method_parameters, MethodParameters};
use crate::chain::gas::GasCosts;
use crate::chain::snapshot::PoolProvider;
use crate::config::Config;
use crate::engine::ratio_solver::{RatioSolver, SolverConfig, SwapToRatioStatus};
use crate::engine::router::{PoolGraphRouter, RoutingConfig};
use crate::error::ParseError;
use crate::math::fraction::Fraction;
use crate::math::position::TickRange;
use crate::models::{PoolGraph, Token, TokenBalance};

/// Caller input for one swap-to-ratio quote, still in its textual form.
#[derive(Debug, Clone)]
pub struct RatioQuoteParams {
    pub token0: String,
    pub token1: String,
    /// Fee tier in parts per million (500, 3000, 10000, ...).
    pub fee_amount: u32,
    pub token0_balance: String,
    pub token1_balance: String,
    pub recipient: String,
    pub tick_lower: i32,
    pub tick_upper: i32,

    // Optional overrides of the configured defaults
    pub error_tolerance: Option<Decimal>,
    pub max_iterations: Option<u32>,
    pub slippage_tolerance: Option<Decimal>,
    pub deadline_secs: Option<u64>,
    pub routing: RoutingConfig,
}

/// Everything a caller needs to present or execute a solve.
#[derive(Debug, Clone)]
pub struct RatioQuote {
    pub status: SwapToRatioStatus,
    pub token0: Token,
    pub token1: Token,
    pub block_number: u64,
    pub method_parameters: Option<MethodParameters>,
    pub graph: Arc<PoolGraph>,
}

/// Decimal in `[0, 1)` as an exact fraction.
fn unit_fraction(value: Decimal) -> Result<Fraction, ParseError> {
    if value.is_sign_negative() || value >= Decimal::ONE {
        return Err(ParseError::MalformedFraction(value.to_string()));
    }
    Ok(Fraction::from_decimal(value))
}

/// Resolves tokens, the target pool and balances from the snapshot, runs the
/// solver and, on success, builds execution parameters.
///
/// Fatal input errors (unknown token or pool, malformed amounts, invalid
/// range) come back as `Err`; no-route and non-convergence are statuses.
pub fn quote_to_ratio(
    provider: &dyn PoolProvider,
    costs: GasCosts,
    config: &Config,
    params: &RatioQuoteParams,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RatioQuote> {
    let tokens = provider.get_tokens(&[params.token0.as_str(), params.token1.as_str()])?;
    let token_a = tokens
        .get(&params.token0)
        .cloned()
        .ok_or_else(|| ParseError::UnknownToken(params.token0.clone()))?;
    let token_b = tokens
        .get(&params.token1)
        .cloned()
        .ok_or_else(|| ParseError::UnknownToken(params.token1.clone()))?;
    if token_a.address == token_b.address {
        return Err(anyhow!("token0 and token1 resolve to the same token {:?}", token_a.address));
    }

    let balance_a = TokenBalance::new(token_a.address, token_a.parse_amount(&params.token0_balance)?);
    let balance_b = TokenBalance::new(token_b.address, token_b.parse_amount(&params.token1_balance)?);
    let recipient =
        Address::from_str(params.recipient.trim()).map_err(|_| ParseError::MalformedAddress(params.recipient.clone()))?;

    let error_tolerance = unit_fraction(params.error_tolerance.unwrap_or(config.default_error_tolerance))?;
    let slippage = unit_fraction(params.slippage_tolerance.unwrap_or(config.default_slippage_tolerance))?;
    let solver_config = SolverConfig {
        error_tolerance,
        max_iterations: params.max_iterations.unwrap_or(config.default_max_iterations),
    };

    let pools = provider
        .get_pools(&[(token_a.address, token_b.address, params.fee_amount)], None)
        .context("failed to load pools")?;
    let (target_index, pool) = pools
        .get_pool(token_a.address, token_b.address, params.fee_amount)
        .ok_or_else(|| {
            anyhow!(
                "no concentrated-liquidity pool for {}/{} at fee {}",
                token_a.symbol,
                token_b.symbol,
                params.fee_amount
            )
        })?;
    let range = TickRange::new(params.tick_lower, params.tick_upper, pool.key.tick_spacing)?;

    let (token0, token1) = if token_a.sorts_before(&token_b) { (token_a, token_b) } else { (token_b, token_a) };
    log::info!(
        "Quote to ratio: {}/{} fee {} range [{}, {}] at block {}",
        token0.symbol,
        token1.symbol,
        params.fee_amount,
        range.tick_lower,
        range.tick_upper,
        pools.graph().block_number
    );

    let graph = pools.graph();
    let router = PoolGraphRouter::new(graph.clone(), costs);
    let mut solver = RatioSolver::new(&router, params.routing.normalized(), solver_config);
    if let Some(flag) = cancel {
        solver = solver.with_cancellation(flag);
    }
    let status = solver.solve(&balance_a, &balance_b, pool, Some(target_index), &range)?;

    let method_parameters = match &status {
        SwapToRatioStatus::Success(route) => {
            let deadline = params.deadline_secs.unwrap_or(config.default_deadline_secs);
            let built = build_method_parameters(&graph, &route.quote, recipient, deadline, &slippage);
            if built.is_none() {
                log::warn!("Could not encode execution paths for the chosen route");
            }
            built
        }
        _ => None,
    };

    Ok(RatioQuote {
        status,
        token0,
        token1,
        block_number: graph.block_number,
        method_parameters,
        graph,
    })
}

/// Runs [`quote_to_ratio`] on the blocking pool so request handlers stay
/// responsive while the solver iterates.
pub async fn quote_to_ratio_async(
    provider: Arc<dyn PoolProvider>,
    costs: GasCosts,
    config: Config,
    params: RatioQuoteParams,
) -> Result<RatioQuote> {
    tokio::task::spawn_blocking(move || quote_to_ratio(provider.as_ref(), costs, &config, &params, None))
        .await
        .context("solver task panicked")?
}
