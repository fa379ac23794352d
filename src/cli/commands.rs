//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sessionguard CLI
#[derive(Parser, Debug)]
#[command(name = "sessionguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML or JSON); defaults to SESSIONGUARD_* environment variables
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a request through the client pipeline
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
        method: String,

        /// Path relative to the base URL, or an absolute URL
        path: String,

        /// Inline JSON body
        #[arg(long)]
        json: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long)]
        query: Vec<String>,

        /// Header as key=value (repeatable)
        #[arg(short = 'H', long)]
        header: Vec<String>,
    },

    /// Operate on the encrypted credential store
    Store {
        /// Store file
        #[arg(long, default_value = ".sessionguard/store.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: StoreAction,
    },

    /// Print the effective settings (passphrase redacted)
    Config,
}

/// Credential store operations
#[derive(Subcommand, Debug)]
pub enum StoreAction {
    /// Encrypt and store a value
    Put { key: String, value: String },
    /// Decrypt and print a value
    Get { key: String },
    /// Remove a value
    Remove { key: String },
    /// Check whether a slot exists
    Has { key: String },
    /// Remove every slot
    Clear,
}
