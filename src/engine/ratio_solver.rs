// Ratio convergence solver
// ------------------------
// Finds the swap that turns two balances into the proportion a
// concentrated-liquidity position needs.
//
// Phases: Init -> Pricing -> Evaluating -> { Converged | Refining -> Pricing }
// -> Terminal. Every Pricing phase is exactly one route search, and the
// budget is checked before each one.
//
// All ratio comparisons are exact (cross-multiplied BigInt). Floats only
// appear in log lines.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use ethers::types::Address;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::engine::router::{RouteQuote, RouteSearch, RoutingConfig};
use crate::error::SolveError;
use crate::math::fraction::Fraction;
use crate::math::position::{
    mintable_liquidity, required_ratio, required_ratio_at, PositionRatio, RangeSide, TickRange,
};
use crate::math::uniswap_v3::{PoolState, SwapDirection};
use crate::models::TokenBalance;

/// Upper bound on step halvings applied in one refinement.
pub const MAX_STEP_HALVINGS: u32 = 4;

pub const NO_ROUTE_REASON: &str = "no route found";
pub const NOT_CONVERGED_REASON: &str = "did not converge within iteration budget";

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Converged when `|ratio error| <= error_tolerance`.
    pub error_tolerance: Fraction,
    /// Maximum number of route searches per solve.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            error_tolerance: Fraction::new(BigInt::one(), BigInt::from(100)).unwrap_or_else(Fraction::zero),
            max_iterations: 6,
        }
    }
}

/// A converged swap and the position-ready balances it leaves.
#[derive(Debug, Clone)]
pub struct SwapToRatioRoute {
    pub quote: RouteQuote,
    pub token_in: Address,
    pub token_out: Address,
    pub final_balance0: BigInt,
    pub final_balance1: BigInt,
    /// token0 per token1 the position needed at the final evaluation; `None`
    /// for single-sided positions.
    pub optimal_ratio: Option<Fraction>,
    pub post_swap_sqrt_price_x96: BigInt,
    pub iterations: u32,
    pub ratio_error: Fraction,
    pub mintable_liquidity: BigInt,
}

#[derive(Debug, Clone)]
pub enum SwapToRatioStatus {
    Success(Box<SwapToRatioRoute>),
    NoRouteFound { reason: String },
    NoSwapNeeded,
}

impl SwapToRatioStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SwapToRatioStatus::Success(_) => "SUCCESS",
            SwapToRatioStatus::NoRouteFound { .. } => "NO_ROUTE_FOUND",
            SwapToRatioStatus::NoSwapNeeded => "NO_SWAP_NEEDED",
        }
    }
}

/// Working state of one solve. Owned by the solve, never shared.
#[derive(Debug, Clone)]
pub struct ConvergenceState {
    pub iteration: u32,
    pub balance0: BigInt,
    pub balance1: BigInt,
    pub best_route: Option<RouteQuote>,
    pub ratio_error: Option<Fraction>,
}

// ------------------------------ Ratio helpers ------------------------------

/// Signed relative deviation of `b0/b1` from the target `t0/t1`:
/// `(b0*t1 - b1*t0) / (b1*t0)`. `None` when `b1*t0 == 0`.
pub fn ratio_error(b0: &BigInt, b1: &BigInt, target: &PositionRatio) -> Option<Fraction> {
    let t0 = &target.amount0_per_unit_liquidity;
    let t1 = &target.amount1_per_unit_liquidity;
    Fraction::new(b0 * t1 - b1 * t0, b1 * t0)
}

/// `Greater` when token0 is in excess of the target.
fn excess(b0: &BigInt, b1: &BigInt, target: &PositionRatio) -> Ordering {
    (b0 * &target.amount1_per_unit_liquidity).cmp(&(b1 * &target.amount0_per_unit_liquidity))
}

pub fn within_tolerance(error: Option<&Fraction>, tolerance: &Fraction) -> bool {
    matches!(error, Some(e) if e.abs() <= *tolerance)
}

/// Amount of input that equalizes the ratio at a constant exchange rate:
/// `(I - r*O) / (r*rate + 1)`, with `r` input-per-output required by the
/// position and `rate` output per input.
pub fn linear_estimate(input_balance: &BigInt, output_balance: &BigInt, r: &Fraction, rate: &Fraction) -> BigInt {
    let num = &Fraction::from_integer(input_balance.clone()) - &r.mul_int(output_balance);
    let den = &(r * rate) + &Fraction::one();
    if !den.numerator().is_positive() {
        return BigInt::zero();
    }
    (&num / &den).floor()
}

/// Known bracket on the amount in: `lo` under-swaps, `hi` over-swaps (or is
/// the whole balance while no overshoot has been seen).
#[derive(Debug, Clone)]
pub struct StepBounds {
    pub lo: BigInt,
    pub hi: BigInt,
    pub max: BigInt,
    pub last_step: Option<BigInt>,
}

impl StepBounds {
    pub fn new(max: BigInt) -> Self {
        Self { lo: BigInt::zero(), hi: max.clone(), max, last_step: None }
    }
}

/// Damps a proposed amount. Steps never grow: a step longer than the
/// previous one is halved, and a step that reverses direction (the error
/// changed sign) is halved at least once and kept to half the previous
/// length. At most `MAX_STEP_HALVINGS` halvings apply, after which the step
/// is clamped. Anything outside the bracket falls back to its midpoint,
/// subject to the same limit. The result is in `[1, max]`.
pub fn damped_amount(current: &BigInt, proposed: &BigInt, bounds: &mut StepBounds) -> BigInt {
    let two = BigInt::from(2);
    let mut step = proposed - current;
    let limit = bounds.last_step.as_ref().map(|last| {
        let reverses = !last.is_zero() && !step.is_zero() && last.is_negative() != step.is_negative();
        (reverses, if reverses { last.abs() / &two } else { last.abs() })
    });

    if let Some((reverses, limit)) = &limit {
        let mut halvings = 0;
        if *reverses {
            step = &step / &two;
            halvings += 1;
        }
        while step.abs() > *limit && halvings < MAX_STEP_HALVINGS {
            step = &step / &two;
            halvings += 1;
        }
    }

    let mut next = current + &step;
    if next <= bounds.lo || next >= bounds.hi {
        next = (&bounds.lo + &bounds.hi) / &two;
    }
    if let Some((_, limit)) = &limit {
        let taken = &next - current;
        if taken.abs() > *limit {
            next = if taken.is_negative() { current - limit } else { current + limit };
        }
    }
    if next < BigInt::one() {
        next = BigInt::one();
    }
    if next > bounds.max {
        next = bounds.max.clone();
    }
    bounds.last_step = Some(&next - current);
    next
}

// --------------------------------- Solver ----------------------------------

enum Phase {
    Init,
    Pricing { amount_in: BigInt },
    Evaluating { amount_in: BigInt, quote: RouteQuote },
    Refining { amount_in: BigInt, quote: RouteQuote, target: PositionRatio },
    Terminal(SwapToRatioStatus),
}

/// Immutable inputs of one solve, balances already in token order.
struct SolveContext<'p> {
    pool: &'p PoolState,
    target_pool: Option<usize>,
    range: TickRange,
    balance0: BigInt,
    balance1: BigInt,
    initial_target: PositionRatio,
    direction: SwapDirection,
    single_sided: bool,
}

impl SolveContext<'_> {
    fn token_in(&self) -> Address {
        match self.direction {
            SwapDirection::ZeroForOne => self.pool.key.token0,
            SwapDirection::OneForZero => self.pool.key.token1,
        }
    }

    fn token_out(&self) -> Address {
        match self.direction {
            SwapDirection::ZeroForOne => self.pool.key.token1,
            SwapDirection::OneForZero => self.pool.key.token0,
        }
    }

    fn input_balance(&self) -> &BigInt {
        match self.direction {
            SwapDirection::ZeroForOne => &self.balance0,
            SwapDirection::OneForZero => &self.balance1,
        }
    }

    fn output_balance(&self) -> &BigInt {
        match self.direction {
            SwapDirection::ZeroForOne => &self.balance1,
            SwapDirection::OneForZero => &self.balance0,
        }
    }

    /// Input per output the position needs; `None` when it wants none of
    /// the output token.
    fn required_in_per_out(&self, target: &PositionRatio) -> Option<Fraction> {
        let (t_in, t_out) = match self.direction {
            SwapDirection::ZeroForOne => (&target.amount0_per_unit_liquidity, &target.amount1_per_unit_liquidity),
            SwapDirection::OneForZero => (&target.amount1_per_unit_liquidity, &target.amount0_per_unit_liquidity),
        };
        Fraction::new(t_in.clone(), t_out.clone())
    }

    fn balances_after(&self, quote: &RouteQuote) -> (BigInt, BigInt) {
        match self.direction {
            SwapDirection::ZeroForOne => (&self.balance0 - &quote.amount_in, &self.balance1 + &quote.amount_out),
            SwapDirection::OneForZero => (&self.balance0 + &quote.amount_out, &self.balance1 - &quote.amount_in),
        }
    }

    /// True when balances are still on the input-heavy side of `target`.
    fn undershoots(&self, b0: &BigInt, b1: &BigInt, target: &PositionRatio) -> bool {
        match self.direction {
            SwapDirection::ZeroForOne => excess(b0, b1, target) == Ordering::Greater,
            SwapDirection::OneForZero => excess(b0, b1, target) == Ordering::Less,
        }
    }

    fn post_swap_sqrt_price<'q>(&self, quote: &'q RouteQuote) -> Option<&'q BigInt> {
        self.target_pool.and_then(|i| quote.sqrt_price_after(i))
    }
}

pub struct RatioSolver<'a> {
    router: &'a dyn RouteSearch,
    routing: RoutingConfig,
    config: SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> RatioSolver<'a> {
    pub fn new(router: &'a dyn RouteSearch, routing: RoutingConfig, config: SolverConfig) -> Self {
        Self { router, routing, config, cancel: None }
    }

    /// The solve stops with [`SolveError::Cancelled`] at the next iteration
    /// boundary after `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map_or(false, |f| f.load(AtomicOrdering::SeqCst))
    }

    /// Solves for the swap that lets `balance0`/`balance1` mint a position in
    /// `range` on `pool`. Balances may come in either token order.
    /// `target_pool` is the pool's index in the route graph, used to notice
    /// routes that move the target's own price.
    pub fn solve(
        &self,
        balance0: &TokenBalance,
        balance1: &TokenBalance,
        pool: &PoolState,
        target_pool: Option<usize>,
        range: &TickRange,
    ) -> Result<SwapToRatioStatus, SolveError> {
        let (token0, token1) = (pool.key.token0, pool.key.token1);
        let (b0, b1) = if balance0.token == token0 && balance1.token == token1 {
            (balance0.amount.clone(), balance1.amount.clone())
        } else if balance0.token == token1 && balance1.token == token0 {
            (balance1.amount.clone(), balance0.amount.clone())
        } else if balance0.token != token0 && balance0.token != token1 {
            return Err(SolveError::TokenMismatch { expected: token0, found: balance0.token });
        } else {
            return Err(SolveError::TokenMismatch { expected: token1, found: balance1.token });
        };

        let range = range.validate_for(pool)?;
        let target = required_ratio(pool, &range)?;
        let side = target.side();
        let single_sided = target.is_single_sided();
        let direction = match side {
            // only token0 wanted: sell token1
            RangeSide::Below => SwapDirection::OneForZero,
            RangeSide::Above => SwapDirection::ZeroForOne,
            RangeSide::InRange => {
                if excess(&b0, &b1, &target) == Ordering::Less {
                    SwapDirection::OneForZero
                } else {
                    SwapDirection::ZeroForOne
                }
            }
        };

        let ctx = SolveContext {
            pool,
            target_pool,
            range,
            balance0: b0.clone(),
            balance1: b1.clone(),
            initial_target: target,
            direction,
            single_sided,
        };
        let mut state = ConvergenceState {
            iteration: 0,
            ratio_error: ratio_error(&b0, &b1, &ctx.initial_target),
            balance0: b0,
            balance1: b1,
            best_route: None,
        };
        let mut bounds = StepBounds::new(ctx.input_balance().clone());

        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init => self.init(&ctx, &state),
                Phase::Pricing { amount_in } => self.pricing(&ctx, &mut state, amount_in)?,
                Phase::Evaluating { amount_in, quote } => self.evaluate(&ctx, &mut state, amount_in, quote)?,
                Phase::Refining { amount_in, quote, target } => Phase::Pricing {
                    amount_in: self.refine(&ctx, &amount_in, &quote, &target, &mut bounds),
                },
                Phase::Terminal(status) => {
                    log::info!(
                        "Swap-to-ratio finished: {} after {} iteration(s)",
                        status.label(),
                        state.iteration
                    );
                    return Ok(status);
                }
            };
        }
    }

    fn init(&self, ctx: &SolveContext<'_>, state: &ConvergenceState) -> Phase {
        let target = &ctx.initial_target;
        if ctx.single_sided {
            // no partial ratio exists: sell all of the unwanted token
            let unwanted = ctx.input_balance().clone();
            if !unwanted.is_positive() {
                return Phase::Terminal(SwapToRatioStatus::NoSwapNeeded);
            }
            return Phase::Pricing { amount_in: unwanted };
        }

        if excess(&state.balance0, &state.balance1, target) == Ordering::Equal
            || within_tolerance(state.ratio_error.as_ref(), &self.config.error_tolerance)
        {
            return Phase::Terminal(SwapToRatioStatus::NoSwapNeeded);
        }

        let spot = match ctx.direction {
            SwapDirection::ZeroForOne => ctx.pool.token0_price(),
            SwapDirection::OneForZero => ctx.pool.token1_price(),
        };
        let amount = match ctx.required_in_per_out(target) {
            Some(r) => linear_estimate(ctx.input_balance(), ctx.output_balance(), &r, &spot),
            None => ctx.input_balance().clone(),
        };
        if !amount.is_positive() {
            log::debug!("Imbalance below one raw unit; nothing to swap");
            return Phase::Terminal(SwapToRatioStatus::NoSwapNeeded);
        }
        let amount = if &amount > ctx.input_balance() { ctx.input_balance().clone() } else { amount };
        Phase::Pricing { amount_in: amount }
    }

    fn pricing(&self, ctx: &SolveContext<'_>, state: &mut ConvergenceState, amount_in: BigInt) -> Result<Phase, SolveError> {
        if self.cancelled() {
            log::info!("Swap-to-ratio cancelled after {} iteration(s)", state.iteration);
            return Err(SolveError::Cancelled { iterations: state.iteration });
        }
        if state.iteration >= self.config.max_iterations {
            return Ok(Phase::Terminal(SwapToRatioStatus::NoRouteFound { reason: NOT_CONVERGED_REASON.to_string() }));
        }
        state.iteration += 1;
        match self.router.search(ctx.token_in(), ctx.token_out(), &amount_in, &self.routing) {
            Ok(quote) => Ok(Phase::Evaluating { amount_in, quote }),
            Err(e) => {
                log::info!("Route search failed at iteration {}: {}", state.iteration, e);
                Ok(Phase::Terminal(SwapToRatioStatus::NoRouteFound { reason: format!("{}: {}", NO_ROUTE_REASON, e) }))
            }
        }
    }

    fn evaluate(
        &self,
        ctx: &SolveContext<'_>,
        state: &mut ConvergenceState,
        amount_in: BigInt,
        quote: RouteQuote,
    ) -> Result<Phase, SolveError> {
        let (b0, b1) = ctx.balances_after(&quote);
        let target = match ctx.post_swap_sqrt_price(&quote) {
            Some(sqrt) => required_ratio_at(sqrt, &ctx.range)?,
            None => ctx.initial_target.clone(),
        };
        let error = ratio_error(&b0, &b1, &target);
        log::debug!(
            "iteration {}: in {} out {} ratio error {}",
            state.iteration,
            quote.amount_in,
            quote.amount_out,
            error.as_ref().map_or(f64::INFINITY, |e| e.to_f64())
        );

        state.balance0 = b0;
        state.balance1 = b1;
        state.ratio_error = error;
        state.best_route = Some(quote.clone());

        if ctx.single_sided || within_tolerance(state.ratio_error.as_ref(), &self.config.error_tolerance) {
            let route = self.assemble(ctx, state, quote, &target)?;
            return Ok(Phase::Terminal(SwapToRatioStatus::Success(Box::new(route))));
        }
        if state.iteration >= self.config.max_iterations {
            return Ok(Phase::Terminal(SwapToRatioStatus::NoRouteFound { reason: NOT_CONVERGED_REASON.to_string() }));
        }
        Ok(Phase::Refining { amount_in, quote, target })
    }

    fn refine(
        &self,
        ctx: &SolveContext<'_>,
        amount_in: &BigInt,
        quote: &RouteQuote,
        target: &PositionRatio,
        bounds: &mut StepBounds,
    ) -> BigInt {
        let (b0, b1) = ctx.balances_after(quote);
        if ctx.undershoots(&b0, &b1, target) {
            if *amount_in > bounds.lo {
                bounds.lo = amount_in.clone();
            }
        } else if *amount_in < bounds.hi {
            bounds.hi = amount_in.clone();
        }

        // secant-style refresh: re-solve the linear equation at the rate the
        // last quote actually achieved
        let proposed = match (
            ctx.required_in_per_out(target),
            Fraction::new(quote.amount_out.clone(), quote.amount_in.clone()),
        ) {
            (Some(r), Some(rate)) => linear_estimate(ctx.input_balance(), ctx.output_balance(), &r, &rate),
            _ => (&bounds.lo + &bounds.hi) / BigInt::from(2),
        };
        let next = damped_amount(amount_in, &proposed, bounds);
        log::debug!("refine: proposed {} -> next {} (bracket {}..{})", proposed, next, bounds.lo, bounds.hi);
        next
    }

    fn assemble(
        &self,
        ctx: &SolveContext<'_>,
        state: &ConvergenceState,
        quote: RouteQuote,
        target: &PositionRatio,
    ) -> Result<SwapToRatioRoute, SolveError> {
        let sqrt_after = ctx.post_swap_sqrt_price(&quote).cloned().unwrap_or_else(|| ctx.pool.sqrt_price_x96.clone());
        let (b0, b1) = (&state.balance0, &state.balance1);

        let liquidity = mintable_liquidity(&sqrt_after, &ctx.range, b0, b1)?;

        let ratio_error = if ctx.single_sided {
            Fraction::zero()
        } else {
            state.ratio_error.clone().unwrap_or_else(Fraction::zero)
        };

        Ok(SwapToRatioRoute {
            token_in: ctx.token_in(),
            token_out: ctx.token_out(),
            final_balance0: b0.clone(),
            final_balance1: b1.clone(),
            optimal_ratio: target.as_fraction(),
            post_swap_sqrt_price_x96: sqrt_after,
            iterations: state.iteration,
            ratio_error,
            mintable_liquidity: liquidity,
            quote,
        })
    }
}
