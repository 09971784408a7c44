use std::str::FromStr;

use ethers::types::{Address, U256};
use num_bigint::BigInt;
use num_traits::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::math::constant_product::PairState;
use crate::math::uniswap_v3::PoolState;

/// Fee flag marking a constant-product hop in packed paths.
pub const V2_FEE_FLAG: u32 = 0x80_0000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub usd_price: Option<Decimal>,
}

impl Token {
    /// `self` is token0 of any pool it shares with `other`.
    pub fn sorts_before(&self, other: &Token) -> bool {
        self.address < other.address
    }

    pub fn parse_amount(&self, value: &str) -> Result<BigInt, ParseError> {
        parse_amount(value, self)
    }
}

/// A raw balance of one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub token: Address,
    pub amount: BigInt,
}

impl TokenBalance {
    pub fn new(token: Address, amount: BigInt) -> Self {
        Self { token, amount }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    V2,
    V3,
}

#[derive(Debug, Clone)]
pub enum Pool {
    V3(PoolState),
    V2(PairState),
}

impl Pool {
    pub fn token0(&self) -> Address {
        match self {
            Pool::V3(p) => p.key.token0,
            Pool::V2(p) => p.token0,
        }
    }

    pub fn token1(&self) -> Address {
        match self {
            Pool::V3(p) => p.key.token1,
            Pool::V2(p) => p.token1,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Pool::V3(_) => Protocol::V3,
            Pool::V2(_) => Protocol::V2,
        }
    }

    /// Fee as it appears in a packed path: ppm for V3, the V2 flag otherwise.
    pub fn path_fee(&self) -> u32 {
        match self {
            Pool::V3(p) => p.key.fee_ppm,
            Pool::V2(_) => V2_FEE_FLAG,
        }
    }

    pub fn involves(&self, token: Address) -> bool {
        self.token0() == token || self.token1() == token
    }

    /// The counterpart of `token`, if the pool holds it.
    pub fn other(&self, token: Address) -> Option<Address> {
        if self.token0() == token {
            Some(self.token1())
        } else if self.token1() == token {
            Some(self.token0())
        } else {
            None
        }
    }
}

/// A pool plus the figure candidate selection ranks by.
#[derive(Debug, Clone)]
pub struct PoolEntry {
    pub pool: Pool,
    pub tvl_usd: f64,
}

/// Immutable per-solve market snapshot. Pools are addressed by their index
/// into `pools`.
#[derive(Debug, Clone)]
pub struct PoolGraph {
    pub block_number: u64,
    pub tokens: Vec<Token>,
    pub base_tokens: Vec<Address>,
    pub wrapped_native: Address,
    pub gas_price_wei: U256,
    pub native_usd_price: Decimal,
    pub pools: Vec<PoolEntry>,
}

impl PoolGraph {
    pub fn token(&self, address: Address) -> Option<&Token> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Resolves an address, a symbol (case-insensitive) or `ETH`.
    pub fn find_token(&self, identifier: &str) -> Option<&Token> {
        let id = identifier.trim();
        if id.eq_ignore_ascii_case("ETH") {
            return self.token(self.wrapped_native);
        }
        if let Ok(address) = Address::from_str(id) {
            return self.token(address);
        }
        self.tokens.iter().find(|t| t.symbol.eq_ignore_ascii_case(id))
    }

    pub fn pool(&self, index: usize) -> Option<&Pool> {
        self.pools.get(index).map(|e| &e.pool)
    }

    /// The V3 pool for an unordered pair and fee tier.
    pub fn find_v3_pool(&self, a: Address, b: Address, fee_ppm: u32) -> Option<(usize, &PoolState)> {
        self.pools.iter().enumerate().find_map(|(i, e)| match &e.pool {
            Pool::V3(p)
                if p.key.fee_ppm == fee_ppm
                    && ((p.key.token0 == a && p.key.token1 == b) || (p.key.token0 == b && p.key.token1 == a)) =>
            {
                Some((i, p))
            }
            _ => None,
        })
    }
}

// ------ Amount parsing / formatting ------

/// Decimal string -> raw fixed-point units of `token`.
pub fn parse_amount(value: &str, token: &Token) -> Result<BigInt, ParseError> {
    let trimmed = value.trim();
    let d = Decimal::from_str(trimmed).map_err(|_| ParseError::MalformedAmount(value.to_string()))?;
    if d.is_sign_negative() && !d.is_zero() {
        return Err(ParseError::NegativeAmount(value.to_string()));
    }
    let d = d.normalize();
    let scale = d.scale();
    if scale > u32::from(token.decimals) {
        return Err(ParseError::TooPrecise { value: value.to_string(), decimals: token.decimals });
    }
    let raw = BigInt::from(d.mantissa()) * BigInt::from(10u8).pow(u32::from(token.decimals) - scale);
    Ok(raw.abs())
}

/// Raw units -> human decimal string, trailing zeros trimmed.
pub fn format_amount(raw: &BigInt, decimals: u8) -> String {
    let negative = raw.is_negative();
    let digits = raw.abs().to_string();
    let decimals = decimals as usize;
    let (int_part, frac_part) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };
    let frac_part = frac_part.trim_end_matches('0');
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::uniswap_v3::pool_with_liquidity_band;

    fn token(decimals: u8) -> Token {
        Token { address: Address::from([1; 20]), symbol: "TKN".into(), decimals, usd_price: None }
    }

    #[test]
    fn parse_amount_scales_to_raw_units() {
        let t = token(6);
        assert_eq!(parse_amount("1.5", &t).unwrap(), BigInt::from(1_500_000));
        assert_eq!(parse_amount("100", &t).unwrap(), BigInt::from(100_000_000));
        assert_eq!(parse_amount("0.000001", &t).unwrap(), BigInt::from(1));
        assert_eq!(parse_amount(" 2.50 ", &t).unwrap(), BigInt::from(2_500_000));
    }

    #[test]
    fn parse_amount_rejects_bad_input() {
        let t = token(6);
        assert!(matches!(parse_amount("abc", &t), Err(ParseError::MalformedAmount(_))));
        assert!(matches!(parse_amount("", &t), Err(ParseError::MalformedAmount(_))));
        assert!(matches!(parse_amount("-1", &t), Err(ParseError::NegativeAmount(_))));
        assert!(matches!(parse_amount("0.0000001", &t), Err(ParseError::TooPrecise { .. })));
    }

    #[test]
    fn format_amount_inverts_parse() {
        let t = token(18);
        let raw = parse_amount("1234.000567", &t).unwrap();
        assert_eq!(format_amount(&raw, 18), "1234.000567");
        assert_eq!(format_amount(&BigInt::from(5), 3), "0.005");
        assert_eq!(format_amount(&BigInt::from(5000), 3), "5");
    }

    #[test]
    fn graph_lookups() {
        let a = Address::from([1; 20]);
        let b = Address::from([2; 20]);
        let pool = pool_with_liquidity_band(a, b, 500, 10, 0, BigInt::from(1_000_000u64), 100).unwrap();
        let graph = PoolGraph {
            block_number: 1,
            tokens: vec![
                Token { address: a, symbol: "WETH".into(), decimals: 18, usd_price: None },
                Token { address: b, symbol: "USDC".into(), decimals: 6, usd_price: None },
            ],
            base_tokens: vec![a],
            wrapped_native: a,
            gas_price_wei: U256::zero(),
            native_usd_price: Decimal::ZERO,
            pools: vec![PoolEntry { pool: Pool::V3(pool), tvl_usd: 1.0 }],
        };
        assert_eq!(graph.find_token("eth").map(|t| t.address), Some(a));
        assert_eq!(graph.find_token("usdc").map(|t| t.address), Some(b));
        assert_eq!(graph.find_token(&format!("{:?}", b)).map(|t| t.address), Some(b));
        assert!(graph.find_token("DAI").is_none());
        assert!(graph.find_v3_pool(b, a, 500).is_some());
        assert!(graph.find_v3_pool(a, b, 3000).is_none());
        assert_eq!(graph.pool(0).and_then(|p| p.other(a)), Some(b));
    }
}
