use crate::{
    cli::{
        Cli,
        Command,
    },
    config::{
        ClientConfig,
        parse_address,
        parse_bet,
    },
    wallets::{
        find_wallet,
        list_wallets,
        unlock_wallet,
    },
};
use chrono::Utc;
use color_eyre::eyre::{
    Report,
    Result,
    WrapErr,
    bail,
    eyre,
};
use ethers::{
    signers::{
        LocalWallet,
        Signer,
    },
    types::{
        Address,
        TxHash,
        U256,
    },
};
use resolver::{
    capability::{
        self,
        CapabilityCache,
        RpcCapability,
    },
    ethers_client::EthersChainClient,
    events::SpinOutcome,
    format::{
        format_eth_with_symbol,
        reels_line,
        time_ago,
        win_message,
    },
    session::{
        SessionSnapshot,
        SpinPhase,
        SpinSession,
    },
    stats::{
        CasinoReads,
        StatsBoard,
    },
};
use std::sync::Arc;
use tracing::{
    debug,
    info,
};

pub async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_cli(&cli)?;
    debug!(?config, "client configured");
    match cli.command {
        Command::Spin { bet } => spin(&config, &bet).await,
        Command::Claim => claim(&config).await,
        Command::Stats { player } => stats(&config, player.as_deref()).await,
        Command::Probe => probe(&config).await,
        Command::Wallets => wallets(&config),
    }
}

fn report(err: anyhow::Error) -> Report {
    eyre!("{err:#}")
}

fn unlock(config: &ClientConfig) -> Result<LocalWallet> {
    let name = config
        .wallet
        .as_deref()
        .ok_or_else(|| eyre!("Specify --wallet <name> to select a keystore"))?;
    let descriptor = find_wallet(&config.wallet_dir, name)?;
    unlock_wallet(&descriptor)
}

async fn connect(
    config: &ClientConfig,
    wallet: Option<LocalWallet>,
) -> Result<EthersChainClient> {
    let client = EthersChainClient::connect(config.rpc_url.as_str(), config.contract, wallet)
        .await
        .map_err(report)
        .wrap_err_with(|| format!("failed to connect to {}", config.rpc_url))?;
    info!(network = ?config.network, contract = ?config.contract, "connected");
    Ok(client)
}

async fn spin(config: &ClientConfig, bet: &str) -> Result<()> {
    let bet = parse_bet(bet)?;
    let wallet = unlock(config)?;
    let chain = Arc::new(connect(config, Some(wallet)).await?);
    let mut session = SpinSession::new(chain, CapabilityCache::new(), config.resolver.clone());
    let mut updates = session.subscribe();

    let tx = session.submit(bet).await.wrap_err("spin was not accepted")?;
    if !config.json {
        println!("Spin submitted: {tx:#x} ({})", format_eth_with_symbol(bet));
    }

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut shown: Option<&str> = None;
    let settled = loop {
        let snapshot = updates.borrow_and_update().clone();
        if !config.json
            && let Some(line) = phase_line(&snapshot)
            && shown != Some(line)
        {
            println!("{line}");
            shown = Some(line);
        }
        if snapshot.phase.is_terminal() {
            break snapshot;
        }
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break session.snapshot();
                }
            }
            _ = &mut interrupt => {
                session.teardown();
                bail!("spin {tx:#x} abandoned, its reward will still show under pending rewards");
            }
        }
    };

    finish_spin(config, tx, settled)
}

fn finish_spin(config: &ClientConfig, tx: TxHash, snapshot: SessionSnapshot) -> Result<()> {
    match snapshot.phase {
        SpinPhase::Resolved => {
            let outcome = snapshot
                .outcome
                .ok_or_else(|| eyre!("spin {tx:#x} resolved without an outcome"))?;
            if config.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", render_outcome(&outcome));
            }
            Ok(())
        }
        SpinPhase::TimedOut => {
            println!("Spin {tx:#x} could not be confirmed. Check your pending rewards later.");
            Ok(())
        }
        SpinPhase::Failed(reason) => Err(eyre!("spin {tx:#x} failed: {reason}")),
        phase => Err(eyre!("spin {tx:#x} stopped while {phase:?}")),
    }
}

fn phase_line(snapshot: &SessionSnapshot) -> Option<&'static str> {
    match snapshot.phase {
        SpinPhase::AwaitingConfirmation => Some("Waiting for confirmation..."),
        SpinPhase::Racing if snapshot.progress.degraded => {
            Some("Confirmed. Polling the receipt for the outcome...")
        }
        SpinPhase::Racing => Some("Confirmed. Waiting for the outcome..."),
        _ => None,
    }
}

fn render_outcome(outcome: &SpinOutcome) -> String {
    format!(
        "[ {} ]\n{}\nPayout: {}",
        reels_line(outcome.reels),
        win_message(outcome),
        format_eth_with_symbol(outcome.payout)
    )
}

async fn claim(config: &ClientConfig) -> Result<()> {
    let wallet = unlock(config)?;
    let chain = connect(config, Some(wallet)).await?;
    let player = chain
        .player()
        .ok_or_else(|| eyre!("no wallet unlocked for claiming"))?;
    let pending = chain.total_pending(player).await.map_err(report)?;
    if pending.is_zero() {
        bail!("no pending rewards to claim");
    }

    let claimed = chain
        .claim_all_rewards(config.resolver.confirmations)
        .await
        .map_err(report)?;
    let total = claimed
        .iter()
        .fold(U256::zero(), |total, reward| total.saturating_add(reward.amount));
    if config.json {
        println!("{}", serde_json::to_string_pretty(&claimed)?);
    } else {
        println!(
            "Claimed {} across {} rewards",
            format_eth_with_symbol(total),
            claimed.len()
        );
    }
    Ok(())
}

async fn stats(config: &ClientConfig, player: Option<&str>) -> Result<()> {
    let player: Option<Address> = match player {
        Some(raw) => Some(parse_address(raw)?),
        None if config.wallet.is_some() => Some(unlock(config)?.address()),
        None => None,
    };
    let chain = connect(config, None).await?;
    let board = StatsBoard::fetch(&chain, player, Utc::now())
        .await
        .map_err(report)?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
    } else {
        println!("{}", render_board(&board));
    }
    Ok(())
}

fn render_board(board: &StatsBoard) -> String {
    let casino = &board.casino;
    let mut lines = vec![
        format!(
            "Casino: {}",
            if casino.is_active { "open" } else { "paused" }
        ),
        format!("  Balance:        {}", format_eth_with_symbol(board.contract_balance)),
        format!("  Total spins:    {}", casino.total_spins),
        format!("  Total wagered:  {}", format_eth_with_symbol(casino.total_wagered)),
        format!("  Total payouts:  {}", format_eth_with_symbol(casino.total_payouts)),
        format!("  Jackpots:       {}", casino.jackpot_hits),
        format!(
            "  Bet limits:     {} - {}",
            format_eth_with_symbol(board.bet_limits.min),
            format_eth_with_symbol(board.bet_limits.max)
        ),
    ];
    let Some(player) = &board.player else {
        return lines.join("\n");
    };

    lines.push(format!("Player {:#x}", player.address));
    lines.push(format!("  Spins:          {}", player.stats.total_spins));
    lines.push(format!(
        "  Wagered:        {}",
        format_eth_with_symbol(player.stats.total_wagered)
    ));
    lines.push(format!(
        "  Won:            {}",
        format_eth_with_symbol(player.stats.total_won)
    ));
    lines.push(format!(
        "  Biggest win:    {}",
        format_eth_with_symbol(player.stats.biggest_win)
    ));
    lines.push(format!("  Win rate:       {:.2}%", player.stats.win_rate()));
    if let Some(latest) = &player.latest_win {
        lines.push(format!(
            "  Latest win:     {} {} ({})",
            latest.label,
            format_eth_with_symbol(latest.reward.amount),
            latest.time_ago
        ));
    }
    lines.push(format!(
        "Pending rewards: {}",
        format_eth_with_symbol(player.total_pending)
    ));
    let now = Utc::now();
    for reward in &player.pending {
        lines.push(format!(
            "  #{:<6} [ {} ] {} {}",
            reward.spin_id,
            reels_line(reward.reels),
            format_eth_with_symbol(reward.amount),
            time_ago(reward.timestamp, now)
        ));
    }
    lines.join("\n")
}

async fn probe(config: &ClientConfig) -> Result<()> {
    let chain = connect(config, None).await?;
    let capability = capability::probe(&chain, &CapabilityCache::new()).await;
    if config.json {
        println!("{}", serde_json::to_string(&capability)?);
        return Ok(());
    }
    let verdict = match capability {
        RpcCapability::Supported => "supports event filters, outcomes arrive by subscription",
        RpcCapability::Unsupported => "does not support event filters, outcomes are polled",
        RpcCapability::Unknown => "could not be probed",
    };
    println!("{} {verdict}", config.rpc_url);
    Ok(())
}

fn wallets(config: &ClientConfig) -> Result<()> {
    let wallets = list_wallets(&config.wallet_dir)?;
    if wallets.is_empty() {
        println!("No keystores in {}", config.wallet_dir.display());
    }
    for wallet in wallets {
        println!("{}\t{}", wallet.name, wallet.path.display());
    }
    Ok(())
}
