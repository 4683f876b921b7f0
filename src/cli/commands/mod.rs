//! CLI command implementations.

mod config;
mod critique;
mod doctor;
mod serve;

pub use config::run_config;
pub use critique::run_critique;
pub use doctor::run_doctor;
pub use serve::run_serve;
