//! CLI module
//!
//! Command-line interface for the client.
//!
//! # Commands
//!
//! - `request` - Send a request through the retry/refresh pipeline
//! - `store` - Read and write the encrypted credential store
//! - `config` - Print the effective settings

mod commands;
mod runner;

pub use commands::{Cli, Commands, StoreAction};
pub use runner::Runner;
