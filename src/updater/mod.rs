pub mod config;
pub mod errors;
pub mod git_ops;
pub mod notify;
pub mod orchestrator;
pub mod propagate;
pub mod reload;
pub mod repo_config;
pub mod sync;

#[cfg(test)]
#[path = "../../tests/common/mod.rs"]
mod test_support;

pub use config::Config;
pub use errors::{Result, UpdateError};
pub use orchestrator::{RunSummary, Updater};
