use std::env;

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub pool_snapshot_path: String,

    // Solver defaults, overridable per request
    pub default_error_tolerance: Decimal,
    pub default_max_iterations: u32,
    pub default_slippage_tolerance: Decimal,
    pub default_deadline_secs: u64,

    // Gas constants
    pub gas_v3_base_swap: u64,
    pub gas_v3_per_hop: u64,
    pub gas_v3_per_init_tick: u64,
    pub gas_v2_base_swap: u64,
    pub gas_v2_per_extra_hop: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load configuration files (secrets first, then public config)
        dotenv::from_filename("secrets.env").ok();
        dotenv::from_filename("config/router.env").ok();
        dotenv::dotenv().ok();

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            pool_snapshot_path: env::var("POOL_SNAPSHOT_PATH")
                .map_err(|_| "POOL_SNAPSHOT_PATH must be set")?,

            default_error_tolerance: env_decimal("DEFAULT_ERROR_TOLERANCE", Decimal::new(1, 2)),
            default_max_iterations: env::var("DEFAULT_MAX_ITERATIONS")
                .unwrap_or_else(|_| "6".to_string()).parse().unwrap_or(6),
            default_slippage_tolerance: env_decimal("DEFAULT_SLIPPAGE_TOLERANCE", Decimal::new(5, 4)),
            default_deadline_secs: env::var("DEFAULT_DEADLINE_SECS")
                .unwrap_or_else(|_| "1800".to_string()).parse().unwrap_or(1800),

            gas_v3_base_swap: env::var("GAS_V3_BASE_SWAP")
                .unwrap_or_else(|_| "2000".to_string()).parse().unwrap_or(2000),
            gas_v3_per_hop: env::var("GAS_V3_PER_HOP")
                .unwrap_or_else(|_| "80000".to_string()).parse().unwrap_or(80000),
            gas_v3_per_init_tick: env::var("GAS_V3_PER_INIT_TICK")
                .unwrap_or_else(|_| "31000".to_string()).parse().unwrap_or(31000),
            gas_v2_base_swap: env::var("GAS_V2_BASE_SWAP")
                .unwrap_or_else(|_| "135000".to_string()).parse().unwrap_or(135000),
            gas_v2_per_extra_hop: env::var("GAS_V2_PER_EXTRA_HOP")
                .unwrap_or_else(|_| "50000".to_string()).parse().unwrap_or(50000),
        })
    }

    /// Defaults without touching the environment.
    pub fn with_defaults(pool_snapshot_path: impl Into<String>) -> Self {
        Config {
            port: 8000,
            pool_snapshot_path: pool_snapshot_path.into(),
            default_error_tolerance: Decimal::new(1, 2),
            default_max_iterations: 6,
            default_slippage_tolerance: Decimal::new(5, 4),
            default_deadline_secs: 1800,
            gas_v3_base_swap: 2000,
            gas_v3_per_hop: 80000,
            gas_v3_per_init_tick: 31000,
            gas_v2_base_swap: 135000,
            gas_v2_per_extra_hop: 50000,
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
