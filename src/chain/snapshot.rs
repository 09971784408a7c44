// Pool/token metadata from a JSON market snapshot.
//
// Big integers travel as decimal strings; USD figures as decimal strings or
// numbers. One snapshot is one block: every solve reads a single immutable
// view of it.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use ethers::types::{Address, U256};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::math::constant_product::PairState;
use crate::math::uniswap_v3::{create_pool_with_real_data, PoolState};
use crate::models::{Pool, PoolEntry, PoolGraph, Token};

// ------ File format ------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    pub block_number: u64,
    pub gas_price_wei: String,
    pub native_usd_price: Decimal,
    pub wrapped_native: Address,
    #[serde(default)]
    pub base_tokens: Vec<Address>,
    pub tokens: Vec<Token>,
    pub pools: Vec<PoolRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum PoolRecord {
    #[serde(rename_all = "camelCase")]
    V3 {
        token0: Address,
        token1: Address,
        fee: u32,
        tick_spacing: i32,
        sqrt_price_x96: String,
        tick: i32,
        liquidity: String,
        #[serde(default)]
        ticks: Vec<TickRecord>,
        #[serde(default)]
        tvl_usd: f64,
    },
    #[serde(rename_all = "camelCase")]
    V2 {
        token0: Address,
        token1: Address,
        reserve0: String,
        reserve1: String,
        #[serde(default = "default_v2_fee_bps")]
        fee_bps: u32,
        #[serde(default)]
        tvl_usd: f64,
    },
}

fn default_v2_fee_bps() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRecord {
    pub index: i32,
    pub liquidity_net: String,
}

fn big(field: &str, v: &str) -> Result<BigInt> {
    BigInt::from_str(v.trim()).map_err(|_| anyhow!("{} is not a decimal integer: '{}'", field, v))
}

fn u256(field: &str, v: &str) -> Result<U256> {
    U256::from_dec_str(v.trim()).map_err(|e| anyhow!("{} is not a decimal integer: '{}' ({})", field, v, e))
}

impl PoolRecord {
    fn into_entry(self) -> Result<PoolEntry> {
        match self {
            PoolRecord::V3 { token0, token1, fee, tick_spacing, sqrt_price_x96, tick, liquidity, ticks, tvl_usd } => {
                if token0 >= token1 {
                    bail!("pool {:?}/{:?}: token0 must sort before token1", token0, token1);
                }
                if tick_spacing <= 0 {
                    bail!("pool {:?}/{:?}: tick spacing must be positive", token0, token1);
                }
                let tick_data = ticks
                    .into_iter()
                    .map(|t| Ok((t.index, big("liquidityNet", &t.liquidity_net)?)))
                    .collect::<Result<Vec<_>>>()?;
                let pool: PoolState = create_pool_with_real_data(
                    token0,
                    token1,
                    fee,
                    tick_spacing,
                    big("sqrtPriceX96", &sqrt_price_x96)?,
                    tick,
                    big("liquidity", &liquidity)?,
                    tick_data,
                );
                Ok(PoolEntry { pool: Pool::V3(pool), tvl_usd })
            }
            PoolRecord::V2 { token0, token1, reserve0, reserve1, fee_bps, tvl_usd } => {
                if token0 >= token1 {
                    bail!("pair {:?}/{:?}: token0 must sort before token1", token0, token1);
                }
                let pair = PairState {
                    token0,
                    token1,
                    reserve0: u256("reserve0", &reserve0)?,
                    reserve1: u256("reserve1", &reserve1)?,
                    fee_bps,
                };
                Ok(PoolEntry { pool: Pool::V2(pair), tvl_usd })
            }
        }
    }
}

impl SnapshotFile {
    pub fn into_graph(self) -> Result<PoolGraph> {
        let gas_price_wei = u256("gasPriceWei", &self.gas_price_wei)?;
        let pools = self
            .pools
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.into_entry().with_context(|| format!("pool #{}", i)))
            .collect::<Result<Vec<_>>>()?;
        let graph = PoolGraph {
            block_number: self.block_number,
            tokens: self.tokens,
            base_tokens: self.base_tokens,
            wrapped_native: self.wrapped_native,
            gas_price_wei,
            native_usd_price: self.native_usd_price,
            pools,
        };
        if graph.token(graph.wrapped_native).is_none() {
            bail!("wrapped native token {:?} missing from token list", graph.wrapped_native);
        }
        for entry in &graph.pools {
            for t in [entry.pool.token0(), entry.pool.token1()] {
                if graph.token(t).is_none() {
                    bail!("pool references unknown token {:?}", t);
                }
            }
        }
        Ok(graph)
    }
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<PoolGraph> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading pool snapshot {}", path.display()))?;
    parse_snapshot(&raw).with_context(|| format!("parsing pool snapshot {}", path.display()))
}

pub fn parse_snapshot(json: &str) -> Result<PoolGraph> {
    let file: SnapshotFile = serde_json::from_str(json)?;
    let graph = file.into_graph()?;
    log::info!(
        "Loaded snapshot at block {}: {} tokens, {} pools",
        graph.block_number,
        graph.tokens.len(),
        graph.pools.len()
    );
    Ok(graph)
}

// ------ Provider contracts ------

/// Tokens resolved from caller identifiers.
#[derive(Debug, Clone, Default)]
pub struct TokenAccessor {
    by_identifier: HashMap<String, Token>,
}

impl TokenAccessor {
    pub fn get(&self, identifier: &str) -> Option<&Token> {
        self.by_identifier.get(&identifier.trim().to_ascii_lowercase())
    }
}

/// Pools resolved for requested (tokenA, tokenB, fee) triples, plus the full
/// snapshot for route search.
#[derive(Debug, Clone)]
pub struct PoolAccessor {
    graph: Arc<PoolGraph>,
    requested: Vec<(Address, Address, u32, usize)>,
}

impl PoolAccessor {
    pub fn get_pool(&self, a: Address, b: Address, fee_ppm: u32) -> Option<(usize, &PoolState)> {
        let (_, _, _, index) = self
            .requested
            .iter()
            .find(|(x, y, f, _)| *f == fee_ppm && ((*x == a && *y == b) || (*x == b && *y == a)))?;
        match self.graph.pool(*index) {
            Some(Pool::V3(p)) => Some((*index, p)),
            _ => None,
        }
    }

    pub fn graph(&self) -> Arc<PoolGraph> {
        self.graph.clone()
    }
}

pub trait PoolProvider: Send + Sync {
    fn get_tokens(&self, identifiers: &[&str]) -> Result<TokenAccessor, ParseError>;

    /// `block_number` pins the view; a provider that cannot serve that block
    /// fails instead of answering from another one.
    fn get_pools(&self, candidates: &[(Address, Address, u32)], block_number: Option<u64>) -> Result<PoolAccessor>;
}

/// Serves a single in-memory snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotPoolProvider {
    graph: Arc<PoolGraph>,
}

impl SnapshotPoolProvider {
    pub fn new(graph: PoolGraph) -> Self {
        Self { graph: Arc::new(graph) }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(load_snapshot(path)?))
    }

    pub fn block_number(&self) -> u64 {
        self.graph.block_number
    }

    pub fn graph(&self) -> Arc<PoolGraph> {
        self.graph.clone()
    }
}

impl PoolProvider for SnapshotPoolProvider {
    fn get_tokens(&self, identifiers: &[&str]) -> Result<TokenAccessor, ParseError> {
        let mut by_identifier = HashMap::new();
        for id in identifiers {
            let token = self
                .graph
                .find_token(id)
                .ok_or_else(|| ParseError::UnknownToken(id.to_string()))?;
            by_identifier.insert(id.trim().to_ascii_lowercase(), token.clone());
        }
        Ok(TokenAccessor { by_identifier })
    }

    fn get_pools(&self, candidates: &[(Address, Address, u32)], block_number: Option<u64>) -> Result<PoolAccessor> {
        if let Some(block) = block_number {
            if block != self.graph.block_number {
                bail!("snapshot is at block {}, requested {}", self.graph.block_number, block);
            }
        }
        let requested = candidates
            .iter()
            .filter_map(|&(a, b, fee)| self.graph.find_v3_pool(a, b, fee).map(|(i, _)| (a, b, fee, i)))
            .collect();
        Ok(PoolAccessor { graph: self.graph.clone(), requested })
    }
}
