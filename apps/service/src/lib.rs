pub mod config;
pub mod database;
pub mod monitoring;
pub mod notifier;
pub mod orchestrator;
pub mod pool;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use orchestrator::Orchestrator;
