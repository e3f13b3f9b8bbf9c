use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "loaflog",
    version,
    about = "Baker's percentage calculation and validation for loaf logs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive hydration, inoculation and salt percentages and write them back.
    Calculate(CalculateArgs),
    /// Check a loaf log for missing fields and invalid values.
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CalculateArgs {
    /// Loaf log to update, e.g. loaves/loaf-006.yaml
    pub path: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Loaf log to check, e.g. loaves/loaf-006.yaml
    pub path: PathBuf,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
