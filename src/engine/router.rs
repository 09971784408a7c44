use std::collections::BTreeMap;
use std::sync::Arc;

use ethers::types::{Address, U256};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::chain::gas::{GasCosts, GasModel};
use crate::engine::candidate_pools::select_candidate_pools;
use crate::engine::route_finder::{enumerate_paths, quote_path, CandidatePath};
use crate::engine::splits::{amount_for_percent, best_split, percent_grid, QuotedRoute};
use crate::error::RouteError;
use crate::math::fraction::Fraction;
use crate::models::PoolGraph;

/// Route search tuning. Every field can be overridden per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutingConfig {
    pub top_n: usize,
    pub top_n_direct_swaps: usize,
    pub top_n_token_in_out: usize,
    pub top_n_second_hop: usize,
    pub top_n_with_each_base_token: usize,
    pub top_n_with_base_token: usize,
    pub top_n_with_base_token_in_set: bool,
    pub max_swaps_per_path: usize,
    pub min_splits: usize,
    pub max_splits: usize,
    pub distribution_percent: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            top_n: 2,
            top_n_direct_swaps: 2,
            top_n_token_in_out: 3,
            top_n_second_hop: 1,
            top_n_with_each_base_token: 3,
            top_n_with_base_token: 5,
            top_n_with_base_token_in_set: false,
            max_swaps_per_path: 3,
            min_splits: 1,
            max_splits: 3,
            distribution_percent: 5,
        }
    }
}

impl RoutingConfig {
    /// Clamps bounds into a searchable shape.
    pub fn normalized(&self) -> Self {
        let max_splits = self.max_splits.max(1);
        Self {
            max_swaps_per_path: self.max_swaps_per_path.max(1),
            max_splits,
            min_splits: self.min_splits.clamp(1, max_splits),
            distribution_percent: self.distribution_percent.clamp(1, 100),
            ..self.clone()
        }
    }
}

/// One path of a (possibly split) route.
#[derive(Debug, Clone)]
pub struct RouteAmount {
    pub pools: Vec<usize>,
    pub token_path: Vec<Address>,
    pub percent: u32,
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    pub sqrt_prices_after: Vec<(usize, BigInt)>,
    pub ticks_crossed: usize,
    pub gas_units: u64,
}

#[derive(Debug, Clone)]
pub struct RouteQuote {
    pub block_number: u64,
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    pub gas_adjusted_amount_out: BigInt,
    pub estimated_gas_used: u64,
    pub gas_cost_in_token_out: BigInt,
    pub gas_cost_usd: f64,
    pub gas_price_wei: U256,
    pub routes: Vec<RouteAmount>,
}

impl RouteQuote {
    pub fn touches_pool(&self, pool_index: usize) -> bool {
        self.routes.iter().any(|r| r.pools.contains(&pool_index))
    }

    /// Post-swap sqrt price of a V3 pool the route went through.
    pub fn sqrt_price_after(&self, pool_index: usize) -> Option<&BigInt> {
        self.routes
            .iter()
            .flat_map(|r| r.sqrt_prices_after.iter())
            .find(|(p, _)| *p == pool_index)
            .map(|(_, s)| s)
    }

    pub fn percent_total(&self) -> u32 {
        self.routes.iter().map(|r| r.percent).sum()
    }
}

/// Prices an exact-input swap. Implementations hold no state across calls.
pub trait RouteSearch: Send + Sync {
    fn search(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &BigInt,
        config: &RoutingConfig,
    ) -> Result<RouteQuote, RouteError>;
}

/// Route search over an in-memory pool graph.
#[derive(Debug, Clone)]
pub struct PoolGraphRouter {
    graph: Arc<PoolGraph>,
    gas: GasModel,
}

impl PoolGraphRouter {
    pub fn new(graph: Arc<PoolGraph>, costs: GasCosts) -> Self {
        let gas = GasModel::for_graph(costs, &graph);
        Self { graph, gas }
    }

    pub fn graph(&self) -> &PoolGraph {
        &self.graph
    }

    fn gas_cost(&self, gas_units: u64, token_out: Address) -> Fraction {
        let graph = &self.graph;
        match (graph.token(token_out), graph.token(graph.wrapped_native)) {
            (Some(out), Some(native)) => self.gas.cost_in_token(gas_units, out, native).unwrap_or_else(Fraction::zero),
            _ => Fraction::zero(),
        }
    }

    fn to_route_amount(&self, path: &CandidatePath, q: &QuotedRoute) -> RouteAmount {
        RouteAmount {
            pools: path.pools.clone(),
            token_path: path.token_path.clone(),
            percent: q.percent,
            amount_in: q.quote.amount_in.clone(),
            amount_out: q.quote.amount_out.clone(),
            sqrt_prices_after: q.quote.sqrt_prices_after.clone(),
            ticks_crossed: q.quote.ticks_crossed,
            gas_units: q.gas_units,
        }
    }

    fn price(&self, paths: &[CandidatePath], index: usize, percent: u32, amount: &BigInt, token_out: Address) -> Option<QuotedRoute> {
        let quote = quote_path(&self.graph, &paths[index], amount)?;
        let gas_units = self.gas.costs.path_gas(&quote.hops);
        Some(QuotedRoute {
            path_index: index,
            percent,
            gas_cost: self.gas_cost(gas_units, token_out),
            quote,
            gas_units,
        })
    }
}

impl RouteSearch for PoolGraphRouter {
    fn search(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: &BigInt,
        config: &RoutingConfig,
    ) -> Result<RouteQuote, RouteError> {
        if !amount_in.is_positive() {
            return Err(RouteError::InvalidAmount);
        }
        for t in [token_in, token_out] {
            if self.graph.token(t).is_none() {
                return Err(RouteError::UnknownToken(t));
            }
        }
        let config = config.normalized();
        let no_route = || RouteError::NoRoute { token_in, token_out, max_hops: config.max_swaps_per_path };

        let candidates = select_candidate_pools(&self.graph, token_in, token_out, &config);
        let paths = enumerate_paths(&self.graph, &candidates.selected, token_in, token_out, config.max_swaps_per_path);
        if paths.is_empty() {
            return Err(no_route());
        }

        let mut by_percent: BTreeMap<u32, Vec<QuotedRoute>> = BTreeMap::new();
        for percent in percent_grid(config.distribution_percent) {
            let amount = amount_for_percent(amount_in, percent);
            if amount.is_zero() {
                continue;
            }
            let quotes: Vec<QuotedRoute> = (0..paths.len())
                .filter_map(|i| self.price(&paths, i, percent, &amount, token_out))
                .collect();
            if !quotes.is_empty() {
                by_percent.insert(percent, quotes);
            }
        }
        log::debug!(
            "Priced {} paths at {} percentages for {} in",
            paths.len(),
            by_percent.len(),
            amount_in
        );

        let mut chosen = best_split(&by_percent, &paths, config.min_splits, config.max_splits).ok_or_else(no_route)?;

        // flooring per percent leaves dust; the largest leg takes it
        let allocated: BigInt = chosen.iter().map(|q| q.quote.amount_in.clone()).sum();
        let dust = amount_in - &allocated;
        if dust.is_positive() {
            if let Some(leg) = chosen.iter_mut().max_by_key(|q| q.percent) {
                let topped_up = &leg.quote.amount_in + &dust;
                if let Some(requoted) = self.price(&paths, leg.path_index, leg.percent, &topped_up, token_out) {
                    *leg = requoted;
                }
            }
        }

        let routes: Vec<RouteAmount> = chosen.iter().map(|q| self.to_route_amount(&paths[q.path_index], q)).collect();
        let total_in: BigInt = routes.iter().map(|r| r.amount_in.clone()).sum();
        let total_out: BigInt = routes.iter().map(|r| r.amount_out.clone()).sum();
        let gas_units: u64 = routes.iter().map(|r| r.gas_units).sum();
        let gas_cost = chosen.iter().fold(Fraction::zero(), |acc, q| &acc + &q.gas_cost);
        let gas_cost_in_token_out = gas_cost.floor();
        let estimate = self.gas.estimate(gas_units);

        Ok(RouteQuote {
            block_number: self.graph.block_number,
            gas_adjusted_amount_out: &total_out - &gas_cost_in_token_out,
            amount_in: total_in,
            amount_out: total_out,
            estimated_gas_used: gas_units,
            gas_cost_in_token_out,
            gas_cost_usd: estimate.total_usd,
            gas_price_wei: self.graph.gas_price_wei,
            routes,
        })
    }
}
