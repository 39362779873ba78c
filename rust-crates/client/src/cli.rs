use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use std::path::PathBuf;
use url::Url;

/// Bets offered to players, in ETH.
pub const BET_PRESETS: [&str; 4] = ["0.0001", "0.0005", "0.001", "0.005"];

#[derive(Parser, Debug)]
#[command(
    name = "slot-machine",
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["base_sepolia", "local"])
            .required(true)
    )
)]
pub struct Cli {
    /// Play against the Base Sepolia deployment.
    #[arg(long)]
    pub base_sepolia: bool,

    /// Play against a local development node.
    #[arg(long)]
    pub local: bool,

    #[arg(long)]
    pub rpc_url: Option<Url>,

    /// Slot machine address. Required with `--local`.
    #[arg(long)]
    pub contract: Option<String>,

    /// Keystore file name inside the wallet directory.
    #[arg(short, long)]
    pub wallet: Option<String>,

    /// Defaults to ~/.foundry/keystores.
    #[arg(long)]
    pub wallet_dir: Option<String>,

    /// Write daily rolling logs here instead of stderr.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// JSON file overriding resolver timings.
    #[arg(long)]
    pub resolver_config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Place a bet and wait for its outcome.
    Spin {
        #[arg(short, long, default_value = "0.001", value_parser = BET_PRESETS)]
        bet: String,
    },
    /// Claim every pending reward of the wallet.
    Claim,
    /// Show casino and player statistics.
    Stats {
        /// Defaults to the unlocked wallet, if any.
        #[arg(long)]
        player: Option<String>,
    },
    /// Check whether the RPC endpoint supports event filters.
    Probe,
    /// List keystores in the wallet directory.
    Wallets,
}
