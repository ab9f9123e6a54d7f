//! Message Stream Traffic History Analyser
//!

pub mod analysis;
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
pub mod source;
pub mod types;
pub mod utils;
