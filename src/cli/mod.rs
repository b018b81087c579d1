//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ListCommand, ValidateCommand};

/// Pipeline configuration tool for geodata deliveries
#[derive(Debug, Parser, Clone)]
#[command(name = "geopipe")]
#[command(version = "0.1.0")]
#[command(about = "A declarative pipeline execution engine for geodata deliveries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Validate a pipeline configuration document
    Validate(ValidateCommand),

    /// List the pipelines a configuration document declares
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
