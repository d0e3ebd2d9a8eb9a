use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "tidald", about = "Throughput-driven Kubernetes autoscaler for Thunder ADC")]
pub struct Cli {
    /// Path to the configuration file (YAML, or TOML by extension).
    #[arg(short, long, default_value = "./config.yaml")]
    pub config: PathBuf,

    /// Verbosity level; overrides `debug` from the config file.
    #[arg(short, long)]
    pub debug: Option<u8>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Default filter directive for a verbosity level.
pub fn filter_for(level: u8) -> &'static str {
    match level {
        0 => "info",
        1..=8 => "debug",
        _ => "trace",
    }
}
