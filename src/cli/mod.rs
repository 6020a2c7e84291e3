//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Medreg using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Medreg - Drug Registry Ingestion Tool
#[derive(Parser, Debug)]
#[command(name = "medreg")]
#[command(version, about, long_about = None)]
#[command(author = "Medreg Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "medreg.toml", env = "MEDREG_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MEDREG_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the drug catalog and documents into PostgreSQL
    Ingest(commands::ingest::IngestArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show row counts in the store
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
