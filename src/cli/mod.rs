//! Command-line interface for Recast

pub mod commands;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::models::plan::ExecutionMode;
use crate::models::symbol::Language;

#[derive(Parser)]
#[command(
    name = "recast",
    version,
    about = "Deterministic executor for approved refactoring plans",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a change plan (dry-run by default)
    Run(RunArgs),

    /// Parse a file or directory and print symbols and imports
    Parse(ParseArgs),

    /// Show the effective capability matrix
    Capabilities(CapabilitiesArgs),

    /// Check language server availability
    Doctor(DoctorArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the change-plan artifact (JSON)
    pub plan: PathBuf,

    /// Execution mode
    #[arg(long, default_value = "dry-run", value_parser = ExecutionMode::from_str)]
    pub mode: ExecutionMode,

    /// Repository root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(clap::Args)]
pub struct ParseArgs {
    /// File or directory to parse
    pub path: PathBuf,

    /// Repository root (for config and ignore patterns)
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(clap::Args)]
pub struct CapabilitiesArgs {
    /// Restrict output to one language
    #[arg(long, value_parser = Language::from_str)]
    pub language: Option<Language>,

    /// Repository root (for the capability override file)
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

#[derive(clap::Args)]
pub struct DoctorArgs {
    /// Repository root
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
