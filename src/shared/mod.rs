pub mod config;
pub mod database;
pub mod logging;
pub mod models;

pub use database::{init_database, initialize_app_state};
