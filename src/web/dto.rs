use num_bigint::BigInt;
use rocket::serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use crate::chain::execution::MethodParameters;
use crate::engine::ratio_solver::SwapToRatioStatus;
use crate::engine::router::{RouteAmount, RoutingConfig};
use crate::engine::service::{RatioQuote, RatioQuoteParams};
use crate::models::{format_amount, Pool, PoolGraph};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteToRatioRequest {
    pub token0: String,
    pub token1: String,
    pub fee_amount: u32,
    pub token0_balance: String,
    pub token1_balance: String,
    pub recipient: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    #[serde(default)]
    pub error_tolerance: Option<Decimal>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub slippage_tolerance: Option<Decimal>,
    #[serde(default)]
    pub deadline: Option<u64>,
    #[serde(default)]
    pub routing: RoutingConfig,
}

impl QuoteToRatioRequest {
    pub fn into_params(self) -> RatioQuoteParams {
        RatioQuoteParams {
            token0: self.token0,
            token1: self.token1,
            fee_amount: self.fee_amount,
            token0_balance: self.token0_balance,
            token1_balance: self.token1_balance,
            recipient: self.recipient,
            tick_lower: self.tick_lower,
            tick_upper: self.tick_upper,
            error_tolerance: self.error_tolerance,
            max_iterations: self.max_iterations,
            slippage_tolerance: self.slippage_tolerance,
            deadline_secs: self.deadline,
            routing: self.routing,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolHop {
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,         // V3 only
    pub token0: String,
    pub token1: String,
    pub fee: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub percent: u32,
    pub amount_in: String,
    pub amount_out: String,
    pub token_path: Vec<String>,   // symbols
    pub pools: Vec<PoolHop>,
    pub ticks_crossed: usize,
    pub gas_units: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCallDetails {
    pub path: String,              // 0x-prefixed packed path
    pub amount_in: String,
    pub amount_out_minimum: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodParametersDetails {
    pub recipient: String,
    pub deadline: u64,
    pub slippage_tolerance: String,
    pub calls: Vec<PathCallDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapToRatioDetails {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,                 // human units of token in
    pub quote: String,                     // human units of token out
    pub quote_gas_adjusted: String,
    pub estimated_gas_used: u64,
    pub estimated_gas_used_quote_token: String,
    pub estimated_gas_used_usd: f64,
    pub gas_price_wei: String,
    pub final_token0_balance: String,
    pub final_token1_balance: String,
    pub optimal_ratio: Option<f64>,        // token0 per token1, raw units
    pub post_swap_target_pool_sqrt_price_x96: String,
    pub ratio_error: f64,
    pub iterations: u32,
    pub mintable_liquidity: String,
    pub route: Vec<RouteLeg>,
    pub method_parameters: Option<MethodParametersDetails>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteToRatioResponse {
    pub status: String,
    pub timestamp_utc: String,
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SwapToRatioDetails>,
}

fn symbol(graph: &PoolGraph, address: ethers::types::Address) -> String {
    graph.token(address).map(|t| t.symbol.clone()).unwrap_or_else(|| format!("{:?}", address))
}

fn amount(graph: &PoolGraph, address: ethers::types::Address, raw: &BigInt) -> String {
    match graph.token(address) {
        Some(t) => format_amount(raw, t.decimals),
        None => raw.to_string(),
    }
}

fn route_leg(graph: &PoolGraph, leg: &RouteAmount) -> RouteLeg {
    let token_in = leg.token_path.first().copied().unwrap_or_default();
    let token_out = leg.token_path.last().copied().unwrap_or_default();
    let pools = leg
        .pools
        .iter()
        .filter_map(|&i| graph.pool(i))
        .map(|pool| PoolHop {
            protocol: format!("{:?}", pool.protocol()),
            pool_id: match pool {
                Pool::V3(p) => Some(format!("{:?}", p.key.pool_id())),
                Pool::V2(_) => None,
            },
            token0: symbol(graph, pool.token0()),
            token1: symbol(graph, pool.token1()),
            fee: match pool {
                Pool::V3(p) => p.key.fee_ppm,
                Pool::V2(p) => p.fee_bps * 100,
            },
        })
        .collect();
    RouteLeg {
        percent: leg.percent,
        amount_in: amount(graph, token_in, &leg.amount_in),
        amount_out: amount(graph, token_out, &leg.amount_out),
        token_path: leg.token_path.iter().map(|&t| symbol(graph, t)).collect(),
        pools,
        ticks_crossed: leg.ticks_crossed,
        gas_units: leg.gas_units,
    }
}

fn method_parameters(params: &MethodParameters) -> MethodParametersDetails {
    MethodParametersDetails {
        recipient: format!("{:?}", params.recipient),
        deadline: params.deadline,
        slippage_tolerance: params.slippage_tolerance.to_string(),
        calls: params
            .calls
            .iter()
            .map(|c| PathCallDetails {
                path: format!("0x{}", hex::encode(&c.path)),
                amount_in: c.amount_in.to_string(),
                amount_out_minimum: c.amount_out_minimum.to_string(),
            })
            .collect(),
    }
}

impl QuoteToRatioResponse {
    pub fn from_quote(quote: &RatioQuote) -> Self {
        let graph = quote.graph.as_ref();
        let (reason, result) = match &quote.status {
            SwapToRatioStatus::Success(route) => {
                let q = &route.quote;
                let details = SwapToRatioDetails {
                    token_in: symbol(graph, route.token_in),
                    token_out: symbol(graph, route.token_out),
                    amount_in: amount(graph, route.token_in, &q.amount_in),
                    quote: amount(graph, route.token_out, &q.amount_out),
                    quote_gas_adjusted: amount(graph, route.token_out, &q.gas_adjusted_amount_out),
                    estimated_gas_used: q.estimated_gas_used,
                    estimated_gas_used_quote_token: amount(graph, route.token_out, &q.gas_cost_in_token_out),
                    estimated_gas_used_usd: q.gas_cost_usd,
                    gas_price_wei: q.gas_price_wei.to_string(),
                    final_token0_balance: format_amount(&route.final_balance0, quote.token0.decimals),
                    final_token1_balance: format_amount(&route.final_balance1, quote.token1.decimals),
                    optimal_ratio: route.optimal_ratio.as_ref().map(|r| r.to_f64()),
                    post_swap_target_pool_sqrt_price_x96: route.post_swap_sqrt_price_x96.to_string(),
                    ratio_error: route.ratio_error.to_f64(),
                    iterations: route.iterations,
                    mintable_liquidity: route.mintable_liquidity.to_string(),
                    route: q.routes.iter().map(|leg| route_leg(graph, leg)).collect(),
                    method_parameters: quote.method_parameters.as_ref().map(method_parameters),
                };
                (None, Some(details))
            }
            SwapToRatioStatus::NoRouteFound { reason } => (Some(reason.clone()), None),
            SwapToRatioStatus::NoSwapNeeded => (None, None),
        };
        QuoteToRatioResponse {
            status: quote.status.label().to_string(),
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            block_number: Some(quote.block_number),
            reason,
            result,
        }
    }

    pub fn error(message: String) -> Self {
        QuoteToRatioResponse {
            status: "ERROR".to_string(),
            timestamp_utc: chrono::Utc::now().to_rfc3339(),
            block_number: None,
            reason: Some(message),
            result: None,
        }
    }
}
