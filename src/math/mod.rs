pub mod fraction;
pub mod uniswap_v3;
pub mod constant_product;
pub mod position;
