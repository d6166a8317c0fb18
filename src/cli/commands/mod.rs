//! CLI command implementations.

mod ask;
mod backfill;
mod config;
mod doctor;
mod history;
mod import;
mod list;
mod serve;

pub use ask::run_ask;
pub use backfill::run_backfill;
pub use config::run_config;
pub use doctor::run_doctor;
pub use history::run_history;
pub use import::run_import;
pub use list::run_list;
pub use serve::run_serve;
