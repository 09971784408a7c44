// Path enumeration over candidate pools and exact per-path quoting.
//
// Paths are expanded breadth-first from token in. Each queued prefix is a node
// in an arena that points at its parent, so a path is recovered by walking
// parents and expansion never recurses.

use std::collections::VecDeque;

use ethers::types::Address;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::chain::gas::HopGas;
use crate::math::{constant_product, uniswap_v3};
use crate::math::uniswap_v3::SwapDirection;
use crate::models::{Pool, PoolGraph};

/// A simple path: no pool and no token repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePath {
    pub pools: Vec<usize>,
    pub token_path: Vec<Address>,
}

impl CandidatePath {
    pub fn shares_pool_with(&self, other: &CandidatePath) -> bool {
        self.pools.iter().any(|p| other.pools.contains(p))
    }
}

struct PathNode {
    pool: usize,
    token: Address,
    parent: Option<usize>,
    depth: usize,
}

fn on_path(arena: &[PathNode], mut node: Option<usize>, pool: usize, token: Address) -> bool {
    while let Some(i) = node {
        if arena[i].pool == pool || arena[i].token == token {
            return true;
        }
        node = arena[i].parent;
    }
    false
}

fn rebuild(arena: &[PathNode], leaf: usize, token_in: Address) -> CandidatePath {
    let mut pools = Vec::with_capacity(arena[leaf].depth);
    let mut tokens = Vec::with_capacity(arena[leaf].depth + 1);
    let mut node = Some(leaf);
    while let Some(i) = node {
        pools.push(arena[i].pool);
        tokens.push(arena[i].token);
        node = arena[i].parent;
    }
    tokens.push(token_in);
    pools.reverse();
    tokens.reverse();
    CandidatePath { pools, token_path: tokens }
}

/// All simple paths from `token_in` to `token_out` through `candidates`,
/// at most `max_hops` long, shortest first.
pub fn enumerate_paths(
    graph: &PoolGraph,
    candidates: &[usize],
    token_in: Address,
    token_out: Address,
    max_hops: usize,
) -> Vec<CandidatePath> {
    let mut arena: Vec<PathNode> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    let mut paths = Vec::new();
    if token_in == token_out || max_hops == 0 {
        return paths;
    }

    for &p in candidates {
        if let Some(next) = graph.pool(p).and_then(|pool| pool.other(token_in)) {
            arena.push(PathNode { pool: p, token: next, parent: None, depth: 1 });
            queue.push_back(arena.len() - 1);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let (token, depth) = (arena[idx].token, arena[idx].depth);
        if token == token_out {
            paths.push(rebuild(&arena, idx, token_in));
            continue;
        }
        if depth >= max_hops {
            continue;
        }
        for &p in candidates {
            let Some(next) = graph.pool(p).and_then(|pool| pool.other(token)) else { continue };
            if next == token_in || on_path(&arena, Some(idx), p, next) {
                continue;
            }
            arena.push(PathNode { pool: p, token: next, parent: Some(idx), depth: depth + 1 });
            queue.push_back(arena.len() - 1);
        }
    }

    log::debug!(
        "Enumerated {} paths {:?} -> {:?} (max {} hops, {} nodes)",
        paths.len(),
        token_in,
        token_out,
        max_hops,
        arena.len()
    );
    paths
}

/// Exact-input result of pushing an amount through one path.
#[derive(Debug, Clone)]
pub struct PathQuote {
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    /// (pool index, sqrt price after the swap) for every V3 hop.
    pub sqrt_prices_after: Vec<(usize, BigInt)>,
    pub ticks_crossed: usize,
    pub hops: Vec<HopGas>,
}

/// `None` when any hop cannot fill its input completely or yields nothing.
pub fn quote_path(graph: &PoolGraph, path: &CandidatePath, amount_in: &BigInt) -> Option<PathQuote> {
    if !amount_in.is_positive() {
        return None;
    }
    let mut amount = amount_in.clone();
    let mut sqrt_prices_after = Vec::new();
    let mut ticks_crossed = 0usize;
    let mut hops = Vec::with_capacity(path.pools.len());

    for (hop, &pool_index) in path.pools.iter().enumerate() {
        let token_in = path.token_path[hop];
        amount = match graph.pool(pool_index)? {
            Pool::V3(pool) => {
                let direction = SwapDirection::for_input(pool.key.token0, token_in);
                let res = uniswap_v3::simulate_exact_in(pool, direction, &amount).ok()?;
                if !res.is_complete() {
                    return None;
                }
                ticks_crossed += res.crossed_ticks;
                hops.push(HopGas::V3 { ticks_crossed: res.crossed_ticks });
                sqrt_prices_after.push((pool_index, res.sqrt_price_x96.clone()));
                res.amount_out(direction)
            }
            Pool::V2(pair) => {
                if pair.is_zero_liquidity() {
                    return None;
                }
                let direction = SwapDirection::for_input(pair.token0, token_in);
                let res = constant_product::simulate_exact_in(pair, direction, &amount).ok()?;
                hops.push(HopGas::V2);
                res.amount_out
            }
        };
        if amount.is_zero() || amount.is_negative() {
            return None;
        }
    }

    Some(PathQuote {
        amount_in: amount_in.clone(),
        amount_out: amount,
        sqrt_prices_after,
        ticks_crossed,
        hops,
    })
}
