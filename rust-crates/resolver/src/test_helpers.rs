use crate::{
    Result,
    chain::{
        ChainClient,
        EventWatch,
    },
};
use anyhow::anyhow;
use ethers::types::{
    Address,
    Log,
    TransactionReceipt,
    TxHash,
    U64,
    U256,
};
use futures::{
    StreamExt,
    stream,
};
use generated_abi::test_helpers::{
    receipt_with_logs,
    reverted_receipt,
    tx_hash,
};
use std::{
    collections::VecDeque,
    future::pending,
    sync::Mutex,
};
use tokio::time::{
    Duration,
    Instant,
    sleep,
};

pub fn contract() -> Address {
    Address::from_low_u64_be(0x5107)
}

#[derive(Clone, Debug)]
pub enum Confirmation {
    Immediate,
    After(Duration),
    Never,
    Reverted,
    Fail(String),
}

#[derive(Clone, Debug)]
pub enum ReceiptReply {
    Missing,
    Logs(Vec<Log>),
    Error(String),
}

#[derive(Clone, Debug)]
pub enum WatchPlan {
    Unavailable(String),
    /// Items delivered after the given delay from the previous one. The
    /// stream stays open afterwards.
    Batches(Vec<(Duration, Result<Vec<Log>, String>)>),
}

struct FakeState {
    next_tx: u64,
    submit_failures: VecDeque<String>,
    submitted: Vec<U256>,
    confirmation: Confirmation,
    receipts: VecDeque<ReceiptReply>,
    default_receipt: ReceiptReply,
    receipt_calls: Vec<Instant>,
    watch: WatchPlan,
    mined: Vec<Log>,
    watch_from: Vec<Option<U64>>,
    probe_error: Option<String>,
    probe_calls: usize,
    uninstall_error: Option<String>,
    uninstalled: Vec<U256>,
}

pub struct FakeChain {
    state: Mutex<FakeState>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_tx: 1,
                submit_failures: VecDeque::new(),
                submitted: Vec::new(),
                confirmation: Confirmation::Immediate,
                receipts: VecDeque::new(),
                default_receipt: ReceiptReply::Missing,
                receipt_calls: Vec::new(),
                watch: WatchPlan::Batches(Vec::new()),
                mined: Vec::new(),
                watch_from: Vec::new(),
                probe_error: None,
                probe_calls: 0,
                uninstall_error: None,
                uninstalled: Vec::new(),
            }),
        }
    }

    /// Hash the next accepted submission will get.
    pub fn next_tx(&self) -> TxHash {
        tx_hash(self.state.lock().unwrap().next_tx)
    }

    pub fn fail_next_submit(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .submit_failures
            .push_back(message.to_string());
    }

    pub fn set_confirmation(&self, confirmation: Confirmation) {
        self.state.lock().unwrap().confirmation = confirmation;
    }

    pub fn push_receipt(&self, reply: ReceiptReply) {
        self.state.lock().unwrap().receipts.push_back(reply);
    }

    pub fn set_default_receipt(&self, reply: ReceiptReply) {
        self.state.lock().unwrap().default_receipt = reply;
    }

    pub fn set_watch(&self, plan: WatchPlan) {
        self.state.lock().unwrap().watch = plan;
    }

    /// Logs already in blocks when a watch is installed.
    pub fn mine(&self, logs: Vec<Log>) {
        self.state.lock().unwrap().mined.extend(logs);
    }

    pub fn reject_probe(&self, message: &str) {
        self.state.lock().unwrap().probe_error = Some(message.to_string());
    }

    pub fn fail_uninstall(&self, message: &str) {
        self.state.lock().unwrap().uninstall_error = Some(message.to_string());
    }

    pub fn probe_filter_id(&self) -> U256 {
        U256::from(0xf17e)
    }

    pub fn submitted(&self) -> Vec<U256> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn receipt_calls(&self) -> Vec<Instant> {
        self.state.lock().unwrap().receipt_calls.clone()
    }

    pub fn watch_calls(&self) -> usize {
        self.state.lock().unwrap().watch_from.len()
    }

    /// Start block of every watch installed so far.
    pub fn watch_from(&self) -> Vec<Option<U64>> {
        self.state.lock().unwrap().watch_from.clone()
    }

    pub fn probe_calls(&self) -> usize {
        self.state.lock().unwrap().probe_calls
    }

    pub fn uninstalled_filters(&self) -> Vec<U256> {
        self.state.lock().unwrap().uninstalled.clone()
    }
}

impl ChainClient for FakeChain {
    fn contract_address(&self) -> Address {
        contract()
    }

    async fn submit_spin(&self, bet: U256) -> Result<TxHash> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.submit_failures.pop_front() {
            return Err(anyhow!(message));
        }
        state.submitted.push(bet);
        let tx = tx_hash(state.next_tx);
        state.next_tx += 1;
        Ok(tx)
    }

    async fn wait_for_confirmation(
        &self,
        tx: TxHash,
        _confirmations: usize,
    ) -> Result<TransactionReceipt> {
        let confirmation = self.state.lock().unwrap().confirmation.clone();
        match confirmation {
            Confirmation::Immediate => Ok(receipt_with_logs(tx, Vec::new())),
            Confirmation::After(delay) => {
                sleep(delay).await;
                Ok(receipt_with_logs(tx, Vec::new()))
            }
            Confirmation::Never => pending().await,
            Confirmation::Reverted => Ok(reverted_receipt(tx)),
            Confirmation::Fail(message) => Err(anyhow!(message)),
        }
    }

    async fn transaction_receipt(&self, tx: TxHash) -> Result<Option<TransactionReceipt>> {
        let mut state = self.state.lock().unwrap();
        state.receipt_calls.push(Instant::now());
        let reply = match state.receipts.pop_front() {
            Some(reply) => reply,
            None => state.default_receipt.clone(),
        };
        match reply {
            ReceiptReply::Missing => Ok(None),
            ReceiptReply::Logs(logs) => Ok(Some(receipt_with_logs(tx, logs))),
            ReceiptReply::Error(message) => Err(anyhow!(message)),
        }
    }

    async fn install_probe_filter(&self) -> Result<U256> {
        let mut state = self.state.lock().unwrap();
        state.probe_calls += 1;
        if let Some(message) = state.probe_error.clone() {
            return Err(anyhow!(message));
        }
        Ok(self.probe_filter_id())
    }

    async fn uninstall_filter(&self, id: U256) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.uninstall_error.clone() {
            return Err(anyhow!(message));
        }
        state.uninstalled.push(id);
        Ok(true)
    }

    // Like a node log filter: past logs are only visible from an explicit
    // start block.
    async fn watch_events(&self, from_block: Option<U64>) -> Result<EventWatch> {
        let mut state = self.state.lock().unwrap();
        state.watch_from.push(from_block);
        match state.watch.clone() {
            WatchPlan::Unavailable(message) => Err(anyhow!(message)),
            WatchPlan::Batches(mut batches) => {
                let backlog: Vec<Log> = match from_block {
                    Some(from) => state
                        .mined
                        .iter()
                        .filter(|log| log.block_number.is_some_and(|block| block >= from))
                        .cloned()
                        .collect(),
                    None => Vec::new(),
                };
                if !backlog.is_empty() {
                    batches.insert(0, (Duration::ZERO, Ok(backlog)));
                }
                let items = stream::iter(batches).then(|(delay, item)| async move {
                    sleep(delay).await;
                    item.map_err(|message| anyhow!(message))
                });
                Ok(items.chain(stream::pending()).boxed())
            }
        }
    }
}
