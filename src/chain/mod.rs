pub mod gas;
pub mod snapshot;
pub mod execution;
