use std::sync::Arc;

use crate::chain::gas::GasCosts;
use crate::chain::snapshot::{PoolProvider, SnapshotPoolProvider};
use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn PoolProvider>,

    // Snapshot metadata, reported by /health
    pub block_number: u64,
    pub pool_count: usize,

    // Gas constants
    pub gas_costs: GasCosts,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let provider = SnapshotPoolProvider::from_file(&config.pool_snapshot_path)?;
        Ok(Self::with_provider(config, provider))
    }

    /// State over an already loaded snapshot.
    pub fn with_provider(config: &Config, provider: SnapshotPoolProvider) -> Self {
        let block_number = provider.block_number();
        let pool_count = provider.graph().pools.len();
        log::info!("Serving snapshot at block {} with {} pools", block_number, pool_count);

        AppState {
            config: config.clone(),
            provider: Arc::new(provider),
            block_number,
            pool_count,
            gas_costs: GasCosts::from_config(config),
        }
    }
}
