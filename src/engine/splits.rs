// Split allocation: distributes the input across up to `max_splits` paths on
// a `distribution_percent` grid, keeping the combination with the highest
// gas-adjusted output. Combinations are grown one layer per split from a queue
// of partial allocations; two paths of one combination never share a pool.

use std::collections::{BTreeMap, VecDeque};

use num_bigint::BigInt;

use crate::engine::route_finder::{CandidatePath, PathQuote};
use crate::math::fraction::Fraction;

/// One path priced at one percentage of the input.
#[derive(Debug, Clone)]
pub struct QuotedRoute {
    pub path_index: usize,
    pub percent: u32,
    pub quote: PathQuote,
    pub gas_units: u64,
    /// Gas cost in raw output-token units.
    pub gas_cost: Fraction,
}

impl QuotedRoute {
    pub fn gas_adjusted(&self) -> Fraction {
        &Fraction::from_integer(self.quote.amount_out.clone()) - &self.gas_cost
    }
}

/// `step, 2*step, ...` up to 100. 100 is always on the grid, so a single
/// route can take the whole amount even when `step` does not divide it.
pub fn percent_grid(step: u32) -> Vec<u32> {
    let step = step.clamp(1, 100);
    let mut grid: Vec<u32> = (1..=100 / step).map(|i| i * step).collect();
    if grid.last() != Some(&100) {
        grid.push(100);
    }
    grid
}

/// `amount * percent / 100`, floored.
pub fn amount_for_percent(amount: &BigInt, percent: u32) -> BigInt {
    amount * BigInt::from(percent) / BigInt::from(100u32)
}

struct Partial {
    routes: Vec<usize>, // indexes into the flat quote list
    remaining: u32,
    percent_index: usize,
}

/// Best combination of quoted routes whose percents sum to 100.
///
/// `by_percent` maps each percent to its quotes; they are ranked here.
/// Combinations with fewer than `min_splits` routes are only returned when
/// no pool-disjoint combination of `min_splits` or more exists.
pub fn best_split(
    by_percent: &BTreeMap<u32, Vec<QuotedRoute>>,
    paths: &[CandidatePath],
    min_splits: usize,
    max_splits: usize,
) -> Option<Vec<QuotedRoute>> {
    let max_splits = max_splits.max(1);
    let min_splits = min_splits.clamp(1, max_splits);
    match best_split_of_at_least(by_percent, paths, min_splits, max_splits) {
        None if min_splits > 1 => {
            log::debug!("No combination of {} or more routes; allowing fewer", min_splits);
            best_split_of_at_least(by_percent, paths, 1, max_splits)
        }
        found => found,
    }
}

fn best_split_of_at_least(
    by_percent: &BTreeMap<u32, Vec<QuotedRoute>>,
    paths: &[CandidatePath],
    min_splits: usize,
    max_splits: usize,
) -> Option<Vec<QuotedRoute>> {

    // flatten so partial combinations can hold plain indexes
    let mut flat: Vec<&QuotedRoute> = Vec::new();
    let mut sorted: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (&percent, quotes) in by_percent {
        let mut idx: Vec<usize> = quotes
            .iter()
            .map(|q| {
                flat.push(q);
                flat.len() - 1
            })
            .collect();
        idx.sort_by(|&a, &b| flat[b].gas_adjusted().cmp(&flat[a].gas_adjusted()));
        sorted.insert(percent, idx);
    }
    let percents: Vec<u32> = sorted.keys().copied().collect();

    let total = |routes: &[usize]| -> Fraction {
        routes.iter().fold(Fraction::zero(), |acc, &r| &acc + &flat[r].gas_adjusted())
    };

    let mut best: Option<(Vec<usize>, Fraction)> = None;
    let mut consider = |routes: Vec<usize>| {
        let value = total(&routes);
        if best.as_ref().map_or(true, |(_, b)| value > *b) {
            best = Some((routes, value));
        }
    };

    if min_splits <= 1 {
        if let Some(&top) = sorted.get(&100).and_then(|v| v.first()) {
            consider(vec![top]);
        }
    }

    let shares_pool = |chosen: &[usize], candidate: usize| {
        let path = &paths[flat[candidate].path_index];
        chosen.iter().any(|&c| paths[flat[c].path_index].shares_pool_with(path))
    };

    // seeds: the two best routes at every partial percent
    let mut queue: VecDeque<Partial> = VecDeque::new();
    for (i, &p) in percents.iter().enumerate().rev() {
        if p >= 100 {
            continue;
        }
        for &r in sorted[&p].iter().take(2) {
            queue.push_back(Partial { routes: vec![r], remaining: 100 - p, percent_index: i });
        }
    }

    let mut splits = 1;
    while !queue.is_empty() && splits < max_splits {
        splits += 1;
        let layer = queue.len();
        for _ in 0..layer {
            let Some(partial) = queue.pop_front() else { break };
            for i in (0..=partial.percent_index).rev() {
                let p = percents[i];
                if p > partial.remaining {
                    continue;
                }
                let Some(&next) = sorted[&p].iter().find(|&&c| !shares_pool(&partial.routes, c)) else {
                    continue;
                };
                let mut routes = partial.routes.clone();
                routes.push(next);
                let remaining = partial.remaining - p;
                if remaining == 0 {
                    if splits >= min_splits {
                        consider(routes);
                    }
                } else if splits < max_splits {
                    queue.push_back(Partial { routes, remaining, percent_index: i });
                }
            }
        }
    }

    let (routes, value) = best?;
    log::debug!("Best split: {} route(s), gas-adjusted {}", routes.len(), value.floor());
    Some(routes.into_iter().map(|r| flat[r].clone()).collect())
}
