// Candidate pool selection: prunes the snapshot to the pools worth expanding
// paths through, stage by stage, ranked by TVL.

use std::collections::HashSet;

use ethers::types::Address;

use crate::engine::router::RoutingConfig;
use crate::models::PoolGraph;

/// Indices of selected pools, in selection order, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct CandidatePools {
    pub selected: Vec<usize>,
    pub direct: Vec<usize>,
    pub by_token_in: Vec<usize>,
    pub by_token_out: Vec<usize>,
    pub second_hop: Vec<usize>,
    pub with_base_token: Vec<usize>,
}

struct Selection {
    selected: Vec<usize>,
    seen: HashSet<usize>,
}

impl Selection {
    fn add(&mut self, index: usize) -> bool {
        if self.seen.insert(index) {
            self.selected.push(index);
            true
        } else {
            false
        }
    }
}

pub fn select_candidate_pools(
    graph: &PoolGraph,
    token_in: Address,
    token_out: Address,
    config: &RoutingConfig,
) -> CandidatePools {
    // highest TVL first, ties by snapshot order
    let mut ranked: Vec<usize> = (0..graph.pools.len()).collect();
    ranked.sort_by(|&a, &b| {
        graph.pools[b]
            .tvl_usd
            .partial_cmp(&graph.pools[a].tvl_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let pool = |i: usize| &graph.pools[i].pool;
    let mut sel = Selection { selected: Vec::new(), seen: HashSet::new() };
    let mut out = CandidatePools::default();

    // direct swaps
    for &i in ranked.iter().filter(|&&i| pool(i).involves(token_in) && pool(i).involves(token_out)) {
        if out.direct.len() >= config.top_n_direct_swaps {
            break;
        }
        if sel.add(i) {
            out.direct.push(i);
        }
    }

    // top overall
    let mut taken = 0;
    for &i in &ranked {
        if taken >= config.top_n {
            break;
        }
        if sel.add(i) {
            taken += 1;
        }
    }

    // top by token in / token out
    for &i in ranked.iter().filter(|&&i| pool(i).involves(token_in)) {
        if out.by_token_in.len() >= config.top_n_token_in_out {
            break;
        }
        if sel.add(i) {
            out.by_token_in.push(i);
        }
    }
    for &i in ranked.iter().filter(|&&i| pool(i).involves(token_out)) {
        if out.by_token_out.len() >= config.top_n_token_in_out {
            break;
        }
        if sel.add(i) {
            out.by_token_out.push(i);
        }
    }

    // second hops from the partner tokens of the first/last hops
    let mut partners: Vec<Address> = Vec::new();
    for &i in out.by_token_in.iter().chain(out.direct.iter()) {
        if let Some(t) = pool(i).other(token_in) {
            if t != token_out && !partners.contains(&t) {
                partners.push(t);
            }
        }
    }
    for &i in out.by_token_out.iter().chain(out.direct.iter()) {
        if let Some(t) = pool(i).other(token_out) {
            if t != token_in && !partners.contains(&t) {
                partners.push(t);
            }
        }
    }
    for partner in partners {
        let mut taken = 0;
        for &i in ranked.iter().filter(|&&i| pool(i).involves(partner)) {
            if taken >= config.top_n_second_hop {
                break;
            }
            if sel.add(i) {
                out.second_hop.push(i);
                taken += 1;
            }
        }
    }

    // pools pairing a base token with token in or token out
    let mut base_candidates: Vec<usize> = Vec::new();
    for &base in graph.base_tokens.iter().filter(|&&b| b != token_in && b != token_out) {
        for end in [token_in, token_out] {
            let mut taken = 0;
            for &i in ranked
                .iter()
                .filter(|&&i| pool(i).involves(base) && pool(i).involves(end))
            {
                if taken >= config.top_n_with_each_base_token {
                    break;
                }
                // pools already in the set only count when the config says so
                if !config.top_n_with_base_token_in_set && sel.seen.contains(&i) {
                    continue;
                }
                if !base_candidates.contains(&i) {
                    base_candidates.push(i);
                    taken += 1;
                }
            }
        }
    }
    let mut rank = vec![0usize; ranked.len()];
    for (pos, &i) in ranked.iter().enumerate() {
        rank[i] = pos;
    }
    base_candidates.sort_by_key(|&i| rank[i]);
    for i in base_candidates.into_iter().take(config.top_n_with_base_token) {
        if sel.add(i) {
            out.with_base_token.push(i);
        }
    }

    log::debug!(
        "Candidate pools: {} selected (direct {}, in {}, out {}, second hop {}, base {})",
        sel.selected.len(),
        out.direct.len(),
        out.by_token_in.len(),
        out.by_token_out.len(),
        out.second_hop.len(),
        out.with_base_token.len()
    );

    out.selected = sel.selected;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::constant_product::PairState;
    use crate::models::{Pool, PoolEntry, Token};
    use ethers::types::U256;
    use rust_decimal::Decimal;

    fn addr(x: u8) -> Address { Address::from([x; 20]) }

    fn pair(a: u8, b: u8, tvl: f64) -> PoolEntry {
        let (t0, t1) = if a < b { (addr(a), addr(b)) } else { (addr(b), addr(a)) };
        PoolEntry {
            pool: Pool::V2(PairState { token0: t0, token1: t1, reserve0: U256::from(1_000), reserve1: U256::from(1_000), fee_bps: 30 }),
            tvl_usd: tvl,
        }
    }

    fn graph(pools: Vec<PoolEntry>, base: Vec<Address>) -> PoolGraph {
        let tokens = (1..=9)
            .map(|x| Token { address: addr(x), symbol: format!("T{}", x), decimals: 18, usd_price: None })
            .collect();
        PoolGraph {
            block_number: 1,
            tokens,
            base_tokens: base,
            wrapped_native: addr(9),
            gas_price_wei: U256::zero(),
            native_usd_price: Decimal::ZERO,
            pools,
        }
    }

    fn zero_config() -> RoutingConfig {
        RoutingConfig {
            top_n: 0,
            top_n_direct_swaps: 0,
            top_n_token_in_out: 0,
            top_n_second_hop: 0,
            top_n_with_each_base_token: 0,
            top_n_with_base_token: 0,
            ..RoutingConfig::default()
        }
    }

    #[test]
    fn direct_pools_ranked_by_tvl() {
        let g = graph(vec![pair(1, 2, 10.0), pair(1, 2, 30.0), pair(1, 2, 20.0)], vec![]);
        let config = RoutingConfig { top_n_direct_swaps: 2, ..zero_config() };
        let c = select_candidate_pools(&g, addr(1), addr(2), &config);
        assert_eq!(c.direct, vec![1, 2]);
        assert_eq!(c.selected, vec![1, 2]);
    }

    #[test]
    fn stages_never_duplicate() {
        let g = graph(vec![pair(1, 2, 100.0), pair(1, 3, 50.0), pair(3, 2, 40.0)], vec![]);
        let c = select_candidate_pools(&g, addr(1), addr(2), &RoutingConfig::default());
        let mut sorted = c.selected.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), c.selected.len());
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn second_hop_follows_partner_tokens() {
        // 1-3 is the only pool with token in; 3-4 is its partner's best pool
        let g = graph(vec![pair(1, 3, 50.0), pair(3, 4, 40.0), pair(5, 6, 1000.0), pair(4, 2, 30.0)], vec![]);
        let config = RoutingConfig { top_n_token_in_out: 1, top_n_second_hop: 1, ..zero_config() };
        let c = select_candidate_pools(&g, addr(1), addr(2), &config);
        assert_eq!(c.by_token_in, vec![0]);
        assert_eq!(c.by_token_out, vec![3]);
        assert!(c.second_hop.contains(&1));
        assert!(!c.selected.contains(&2));
    }

    #[test]
    fn base_token_pools_respect_total_cap() {
        let base = vec![addr(7), addr(8)];
        let g = graph(
            vec![pair(1, 7, 10.0), pair(7, 2, 20.0), pair(1, 8, 30.0), pair(8, 2, 40.0)],
            base,
        );
        let config = RoutingConfig { top_n_with_each_base_token: 1, top_n_with_base_token: 3, ..zero_config() };
        let c = select_candidate_pools(&g, addr(1), addr(2), &config);
        assert_eq!(c.with_base_token.len(), 3);
        // lowest TVL pool is the one dropped
        assert!(!c.with_base_token.contains(&0));
    }

    #[test]
    fn base_token_in_set_counts_selected_pools() {
        let base = vec![addr(7)];
        let g = graph(vec![pair(1, 7, 100.0), pair(1, 7, 10.0)], base);
        let mut config = RoutingConfig { top_n: 1, top_n_with_each_base_token: 1, top_n_with_base_token: 5, ..zero_config() };
        let c = select_candidate_pools(&g, addr(1), addr(2), &config);
        assert_eq!(c.with_base_token, vec![1]);

        config.top_n_with_base_token_in_set = true;
        let c = select_candidate_pools(&g, addr(1), addr(2), &config);
        assert!(c.with_base_token.is_empty());
        assert_eq!(c.selected, vec![0]);
    }
}
