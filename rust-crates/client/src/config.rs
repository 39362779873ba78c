use crate::{
    cli::Cli,
    wallets::resolve_wallet_dir,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::{
    Address,
    U256,
};
use generated_abi::{
    BASE_SEPOLIA_RPC_URL,
    LOCAL_RPC_URL,
    SLOT_MACHINE_ADDRESS,
};
use resolver::config::ResolverConfig;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    BaseSepolia,
    Local,
}

impl Network {
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::BaseSepolia => BASE_SEPOLIA_RPC_URL,
            Network::Local => LOCAL_RPC_URL,
        }
    }

    fn default_contract(self) -> Option<Address> {
        match self {
            Network::BaseSepolia => Some(SLOT_MACHINE_ADDRESS),
            Network::Local => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub network: Network,
    pub rpc_url: Url,
    pub contract: Address,
    pub wallet: Option<String>,
    pub wallet_dir: PathBuf,
    pub resolver: ResolverConfig,
    pub json: bool,
}

impl ClientConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let network = if cli.local {
            Network::Local
        } else {
            Network::BaseSepolia
        };
        let rpc_url = match &cli.rpc_url {
            Some(url) => url.clone(),
            None => Url::parse(network.default_rpc_url())
                .wrap_err("invalid default rpc url")?,
        };
        let contract = match cli.contract.as_deref() {
            Some(raw) => parse_address(raw)?,
            None => network.default_contract().ok_or_else(|| {
                eyre!("--contract is required when playing against a local node")
            })?,
        };
        Ok(Self {
            network,
            rpc_url,
            contract,
            wallet: cli.wallet.clone(),
            wallet_dir: resolve_wallet_dir(cli.wallet_dir.as_deref())?,
            resolver: load_resolver_config(cli.resolver_config.as_deref())?,
            json: cli.json,
        })
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    raw.trim()
        .parse::<Address>()
        .map_err(|err| eyre!("invalid address '{raw}': {err}"))
}

/// Resolver timings from a JSON file. Missing fields keep their defaults.
pub fn load_resolver_config(path: Option<&Path>) -> Result<ResolverConfig> {
    let Some(path) = path else {
        return Ok(ResolverConfig::default());
    };
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid resolver config in {}", path.display()))
}

/// Bet in wei from an ether amount such as `0.001`.
pub fn parse_bet(ether: &str) -> Result<U256> {
    ethers::utils::parse_ether(ether).map_err(|err| eyre!("invalid bet '{ether}': {err}"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use clap::Parser;
    use tempdir::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("slot-machine").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn from_cli__base_sepolia_uses_deployment_defaults() {
        let config = ClientConfig::from_cli(&cli(&[
            "--base-sepolia",
            "--wallet-dir",
            "/tmp/keys",
            "probe",
        ]))
        .unwrap();

        assert_eq!(config.network, Network::BaseSepolia);
        assert_eq!(config.rpc_url.as_str(), "https://sepolia.base.org/");
        assert_eq!(config.contract, SLOT_MACHINE_ADDRESS);
        assert_eq!(config.wallet_dir, PathBuf::from("/tmp/keys"));
        assert_eq!(config.resolver, ResolverConfig::default());
    }

    #[test]
    fn from_cli__local_requires_contract() {
        let result = ClientConfig::from_cli(&cli(&["--local", "--wallet-dir", "/tmp", "probe"]));

        assert!(result.is_err());
    }

    #[test]
    fn from_cli__local_with_contract_override() {
        let config = ClientConfig::from_cli(&cli(&[
            "--local",
            "--contract",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "--wallet-dir",
            "/tmp",
            "probe",
        ]))
        .unwrap();

        assert_eq!(config.rpc_url.as_str(), "http://localhost:8545/");
        assert_eq!(
            config.contract,
            parse_address("5fbdb2315678afecb367f032d93f642f64180aa3").unwrap()
        );
    }

    #[test]
    fn parse_address__rejects_garbage() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("slot machine").is_err());
    }

    #[test]
    fn load_resolver_config__overrides_given_fields_only() {
        // given
        let dir = TempDir::new("resolver-config").unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, r#"{"confirmations": 2, "poll": {"max_attempts": 4}}"#).unwrap();

        // when
        let config = load_resolver_config(Some(&path)).unwrap();

        // then
        let defaults = ResolverConfig::default();
        assert_eq!(config.confirmations, 2);
        assert_eq!(config.poll.max_attempts, 4);
        assert_eq!(config.poll.optimistic_base_ms, defaults.poll.optimistic_base_ms);
        assert_eq!(config.verify, defaults.verify);
    }

    #[test]
    fn load_resolver_config__reports_malformed_json() {
        let dir = TempDir::new("resolver-config").unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, "{ confirmations: two }").unwrap();

        assert!(load_resolver_config(Some(&path)).is_err());
        assert!(load_resolver_config(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn parse_bet__converts_presets_to_wei() {
        assert_eq!(parse_bet("0.001").unwrap(), U256::exp10(15));
        assert_eq!(parse_bet("0.0001").unwrap(), U256::exp10(14));
        assert!(parse_bet("lots").is_err());
    }
}
