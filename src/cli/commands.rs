//! CLI command definitions

use clap::Args;

/// Validate a pipeline configuration document
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the pipeline configuration YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the pipelines a configuration document declares
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to the pipeline configuration YAML file
    #[arg(short, long)]
    pub file: String,

    /// Language code for display names
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
