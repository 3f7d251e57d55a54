pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod services;
pub mod utils;
