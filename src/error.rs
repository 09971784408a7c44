use ethers::types::Address;
use thiserror::Error;

/// Failures of the pure pool math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("tick {0} outside [MIN_TICK, MAX_TICK]")]
    TickOutOfRange(i32),
    #[error("amount_specified must be positive (exact input)")]
    NonPositiveAmount,
    #[error("price limit {0}")]
    InvalidPriceLimit(&'static str),
    #[error("division by zero")]
    DivisionByZero,
}

/// Malformed tick range for a position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("invalid tick range [{lower}, {upper}]: {reason}")]
    InvalidRange {
        lower: i32,
        upper: i32,
        reason: &'static str,
    },
    #[error(transparent)]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no route from {token_in:?} to {token_out:?} within {max_hops} hops")]
    NoRoute {
        token_in: Address,
        token_out: Address,
        max_hops: usize,
    },
    #[error("amount in must be positive")]
    InvalidAmount,
    #[error("unknown token {0:?}")]
    UnknownToken(Address),
}

/// Malformed caller input; never reaches the solver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed amount '{0}'")]
    MalformedAmount(String),
    #[error("negative amount '{0}'")]
    NegativeAmount(String),
    #[error("amount '{value}' has more than {decimals} fractional digits")]
    TooPrecise { value: String, decimals: u8 },
    #[error("unknown token '{0}'")]
    UnknownToken(String),
    #[error("malformed address '{0}'")]
    MalformedAddress(String),
    #[error("malformed decimal fraction '{0}'")]
    MalformedFraction(String),
}

/// Fatal solver failures. Route failures and non-convergence are terminal
/// statuses, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error(transparent)]
    InvalidRange(#[from] PositionError),
    #[error("solve cancelled after {iterations} iterations")]
    Cancelled { iterations: u32 },
    #[error("balance belongs to {found:?}, expected {expected:?}")]
    TokenMismatch { expected: Address, found: Address },
}
