use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "reconeval",
    version,
    about = "Quality-evaluation harness for entity-reconciliation services"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Generate(GenerateArgs),
    Run(RunArgs),
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, default_value = "dataset")]
    pub dataset_root: PathBuf,

    #[arg(long, default_value = "development")]
    pub environment: String,

    #[arg(long, default_value = "dev-100-entries")]
    pub filename: String,

    #[arg(long, default_value_t = 100)]
    pub size: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "dataset")]
    pub dataset_root: PathBuf,

    #[arg(long, default_value = "http://localhost:5000/reconcile")]
    pub endpoint: String,

    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    #[arg(long)]
    pub dataset_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long)]
    pub samples_path: Option<PathBuf>,

    #[arg(long, default_value = "reconcile")]
    pub strategy: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long)]
    pub samples_a: PathBuf,

    #[arg(long)]
    pub samples_b: PathBuf,

    #[arg(long, default_value_t = false)]
    pub unpaired: bool,

    #[arg(long)]
    pub plot_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}
