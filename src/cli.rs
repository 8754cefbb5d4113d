use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskdash")]
#[command(version = concat!("Ver:", env!("CARGO_PKG_VERSION")))]
#[command(about = "Dual-network gateway for the download and transcription task dashboard")]
pub struct Cli {
    /// Config file path (defaults to ~/.taskdash/config.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the default config file
    #[arg(long = "init")]
    pub init: bool,

    /// Validate the config file
    #[arg(long = "check")]
    pub check: bool,

    /// Print the effective config
    #[arg(short = 'p', long = "print")]
    pub print: bool,

    /// Probe every backend/network path once and print the report
    #[arg(long = "health")]
    pub health: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
