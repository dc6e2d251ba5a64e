pub mod assistant;
pub mod backend;
pub mod cli;
pub mod config;
pub mod database;
pub mod ledger;
pub mod models;
pub mod period;
pub mod report;
pub mod store;
pub mod tui;
pub mod utils;
pub mod workspace;

pub use config::Config;
pub use database::Database;
pub use ledger::LogState;
pub use models::{Activity, ActivityCategory, NewActivity, Submission};
pub use period::PayrollPeriod;
pub use utils::Profile;
pub use workspace::Workspace;
