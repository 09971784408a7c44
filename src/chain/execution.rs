// Execution parameters for a routed swap: packed paths, minimum outputs and
// deadline. Nothing here signs or submits.

use chrono::Utc;
use ethers::types::{Address, Bytes};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::engine::router::{RouteAmount, RouteQuote};
use crate::math::fraction::Fraction;
use crate::models::PoolGraph;

#[derive(Debug, Clone)]
pub struct PathCall {
    /// token(20) | fee(3) | token(20) | ...
    pub path: Bytes,
    pub amount_in: BigInt,
    pub amount_out_minimum: BigInt,
}

#[derive(Debug, Clone)]
pub struct MethodParameters {
    pub recipient: Address,
    /// Unix seconds.
    pub deadline: u64,
    pub slippage_tolerance: Fraction,
    pub calls: Vec<PathCall>,
}

/// Packs a route's token path with the fee of each hop between tokens.
pub fn encode_path(graph: &PoolGraph, route: &RouteAmount) -> Option<Bytes> {
    if route.token_path.len() != route.pools.len() + 1 {
        return None;
    }
    let mut out = Vec::with_capacity(20 + route.pools.len() * 23);
    out.extend_from_slice(route.token_path[0].as_bytes());
    for (hop, &pool_index) in route.pools.iter().enumerate() {
        let fee = graph.pool(pool_index)?.path_fee();
        out.extend_from_slice(&fee.to_be_bytes()[1..]);
        out.extend_from_slice(route.token_path[hop + 1].as_bytes());
    }
    Some(Bytes::from(out))
}

/// `amount_out * (1 - slippage)`, floored.
pub fn minimum_out(amount_out: &BigInt, slippage: &Fraction) -> BigInt {
    let keep = &Fraction::one() - slippage;
    if keep.is_negative() {
        return BigInt::zero();
    }
    keep.mul_int(amount_out).floor()
}

pub fn build_method_parameters(
    graph: &PoolGraph,
    quote: &RouteQuote,
    recipient: Address,
    deadline_secs: u64,
    slippage_tolerance: &Fraction,
) -> Option<MethodParameters> {
    let calls = quote
        .routes
        .iter()
        .map(|route| {
            Some(PathCall {
                path: encode_path(graph, route)?,
                amount_in: route.amount_in.clone(),
                amount_out_minimum: minimum_out(&route.amount_out, slippage_tolerance),
            })
        })
        .collect::<Option<Vec<_>>>()?;
    let now = Utc::now().timestamp().max(0) as u64;
    Some(MethodParameters {
        recipient,
        deadline: now.saturating_add(deadline_secs),
        slippage_tolerance: slippage_tolerance.clone(),
        calls,
    })
}
