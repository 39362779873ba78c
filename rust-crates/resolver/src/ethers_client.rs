use crate::{
    Result,
    chain::{
        ChainClient,
        EventWatch,
        is_reverted,
    },
    decoder::claimed_rewards,
    events::RewardClaimed,
    stats::{
        BetLimits,
        CasinoReads,
        CasinoStats,
        PendingReward,
        PlayerStats,
    },
};
use anyhow::{
    Context,
    anyhow,
    bail,
};
use ethers::{
    middleware::SignerMiddleware,
    providers::{
        FilterKind,
        Http,
        Middleware,
        PendingTransaction,
        Provider,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::{
        Address,
        BlockNumber,
        Filter,
        Log,
        TransactionReceipt,
        TxHash,
        U64,
        U256,
    },
};
use futures::{
    StreamExt,
    stream,
};
use generated_abi::{
    EVENT_SIGNATURES,
    PROBE_EVENT_SIGNATURE,
    SlotMachine,
    contract_instance,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tracing::{
    debug,
    info,
};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

const WATCH_INTERVAL: Duration = Duration::from_secs(1);

/// Slot machine access over JSON-RPC.
#[derive(Clone, Debug)]
pub struct EthersChainClient {
    provider: Provider<Http>,
    contract: Address,
    reader: SlotMachine<Provider<Http>>,
    signer: Option<SlotMachine<SignerClient>>,
    player: Option<Address>,
}

impl EthersChainClient {
    pub fn new(provider: Provider<Http>, contract: Address) -> Self {
        let reader = contract_instance(contract, Arc::new(provider.clone()));
        Self {
            provider,
            contract,
            reader,
            signer: None,
            player: None,
        }
    }

    /// Connects to `rpc_url`. A wallet, when given, is bound to the node's
    /// chain id and used for every write.
    pub async fn connect(
        rpc_url: &str,
        contract: Address,
        wallet: Option<LocalWallet>,
    ) -> Result<Self> {
        let provider =
            Provider::<Http>::try_from(rpc_url).context("invalid rpc url")?;
        let client = Self::new(provider, contract);
        match wallet {
            Some(wallet) => {
                let chain_id = client
                    .provider
                    .get_chainid()
                    .await
                    .context("failed to query chain id")?;
                debug!(%chain_id, "connected to rpc endpoint");
                Ok(client.with_wallet(wallet.with_chain_id(chain_id.as_u64())))
            }
            None => Ok(client),
        }
    }

    pub fn with_wallet(mut self, wallet: LocalWallet) -> Self {
        self.player = Some(wallet.address());
        let middleware = SignerMiddleware::new(self.provider.clone(), wallet);
        self.signer = Some(contract_instance(self.contract, Arc::new(middleware)));
        self
    }

    pub fn player(&self) -> Option<Address> {
        self.player
    }

    fn signer(&self) -> Result<&SlotMachine<SignerClient>> {
        self.signer
            .as_ref()
            .ok_or_else(|| anyhow!("no wallet unlocked for sending transactions"))
    }

    /// Claims every pending reward of the wallet and returns what was paid.
    pub async fn claim_all_rewards(&self, confirmations: usize) -> Result<Vec<RewardClaimed>> {
        let call = self.signer()?.claim_all_rewards();
        let pending = call
            .send()
            .await
            .context("failed to send claim transaction")?;
        let tx = pending.tx_hash();
        info!(?tx, "claim submitted");
        let receipt = self.wait_for_confirmation(tx, confirmations).await?;
        if is_reverted(&receipt) {
            bail!("claim transaction {tx:#x} reverted");
        }
        Ok(claimed_rewards(self.contract, &receipt.logs))
    }
}

impl ChainClient for EthersChainClient {
    fn contract_address(&self) -> Address {
        self.contract
    }

    async fn submit_spin(&self, bet: U256) -> Result<TxHash> {
        let call = self.signer()?.spin_and_process().value(bet);
        let pending = call
            .send()
            .await
            .context("failed to send spin transaction")?;
        Ok(pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        tx: TxHash,
        confirmations: usize,
    ) -> Result<TransactionReceipt> {
        PendingTransaction::new(tx, &self.provider)
            .confirmations(confirmations)
            .await
            .with_context(|| format!("failed to confirm transaction {tx:#x}"))?
            .ok_or_else(|| anyhow!("transaction {tx:#x} was dropped"))
    }

    async fn transaction_receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>> {
        self.provider
            .get_transaction_receipt(tx)
            .await
            .with_context(|| format!("failed to fetch receipt of {tx:#x}"))
    }

    async fn install_probe_filter(&self) -> Result<U256> {
        let filter = Filter::new()
            .address(self.contract)
            .event(PROBE_EVENT_SIGNATURE)
            .from_block(BlockNumber::Latest)
            .to_block(BlockNumber::Latest);
        let id = self
            .provider
            .new_filter(FilterKind::Logs(&filter))
            .await
            .context("failed to install probe filter")?;
        Ok(id)
    }

    async fn uninstall_filter(&self, id: U256) -> Result<bool> {
        let removed = self
            .provider
            .uninstall_filter(id)
            .await
            .context("failed to uninstall filter")?;
        Ok(removed)
    }

    // Filter changes only report logs mined after installation, so logs from
    // `from_block` up to now are fetched once up front. Nodes expire idle
    // filters, so the watch filter is left behind on drop.
    async fn watch_events(&self, from_block: Option<U64>) -> Result<EventWatch> {
        let filter = Filter::new()
            .address(self.contract)
            .events(EVENT_SIGNATURES)
            .from_block(BlockNumber::Latest);
        let id = self
            .provider
            .new_filter(FilterKind::Logs(&filter))
            .await
            .context("failed to install event filter")?;
        debug!(%id, ?from_block, "event filter installed");

        let backlog: EventWatch = match from_block {
            Some(block) => {
                let past = filter.clone().from_block(block).to_block(BlockNumber::Latest);
                let provider = self.provider.clone();
                stream::once(async move {
                    provider
                        .get_logs(&past)
                        .await
                        .context("failed to fetch logs since the spin block")
                })
                .boxed()
            }
            None => stream::empty().boxed(),
        };
        let provider = self.provider.clone();
        let changes = stream::unfold(provider, move |provider| async move {
            tokio::time::sleep(WATCH_INTERVAL).await;
            let batch = provider
                .get_filter_changes::<_, Log>(id)
                .await
                .context("failed to poll event filter");
            Some((batch, provider))
        });
        Ok(backlog.chain(changes).boxed())
    }
}

impl CasinoReads for EthersChainClient {
    async fn casino_stats(&self) -> Result<CasinoStats> {
        let stats = self
            .reader
            .get_casino_stats()
            .call()
            .await
            .context("failed to read casino stats")?;
        Ok(stats.into())
    }

    async fn player_stats(&self, player: Address) -> Result<PlayerStats> {
        let stats = self
            .reader
            .get_player_stats(player)
            .call()
            .await
            .context("failed to read player stats")?;
        PlayerStats::try_from(stats).context("unexpected player stats layout")
    }

    async fn pending_rewards(&self, player: Address) -> Result<Vec<PendingReward>> {
        let rewards = self
            .reader
            .get_pending_rewards(player)
            .call()
            .await
            .context("failed to read pending rewards")?;
        rewards
            .into_iter()
            .map(PendingReward::try_from)
            .collect::<Result<_, _>>()
            .context("unexpected pending reward layout")
    }

    async fn total_pending(&self, player: Address) -> Result<U256> {
        self.reader
            .get_total_pending_amount(player)
            .call()
            .await
            .context("failed to read total pending amount")
    }

    async fn bet_limits(&self) -> Result<BetLimits> {
        let (min, max) = self
            .reader
            .get_bet_limits()
            .call()
            .await
            .context("failed to read bet limits")?;
        Ok(BetLimits { min, max })
    }

    async fn contract_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.contract, None)
            .await
            .context("failed to read contract balance")
    }
}
