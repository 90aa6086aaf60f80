pub mod cli;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod timeout_estimation;
pub mod upload_config;

pub use cli::run;
