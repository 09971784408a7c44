pub mod candidate_pools;
pub mod route_finder;
pub mod splits;
pub mod router;
pub mod ratio_solver;
pub mod service;
