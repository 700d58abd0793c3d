pub mod cluster;
pub mod config;
pub mod error;
pub mod monitor;
pub mod scheduler;
pub mod shutdown;
