//! Outcome resolution of one submitted spin.
//!
//! After confirmation three strategies race inside a single select loop:
//!
//! * the event watch, decoding payout logs of our transaction as they arrive,
//! * receipt polling with a bounded, growing backoff,
//! * receipt verification, run once as a safety net after a grace period and
//!   again as the last resort when polling gives up.
//!
//! The first decoded outcome wins. The loop owns every timer and the watch,
//! so aborting the task cancels all of them.

use crate::{
    capability::{
        CapabilityCache,
        RpcCapability,
    },
    chain::{
        ChainClient,
        EventWatch,
        is_filter_unsupported,
        is_reverted,
    },
    config::ResolverConfig,
    decoder::{
        decode_outcome,
        parse_event_log,
    },
    events::SpinOutcome,
    format::format_eth,
    schedule::{
        AttemptResult,
        PollSchedule,
        VerifyRun,
    },
    session::{
        FailureReason,
        SessionCell,
        Strategy,
    },
    timers::{
        self,
        TimerSlot,
        Timers,
    },
};
use ethers::types::{
    Address,
    Log,
    TxHash,
    U64,
};
use futures::StreamExt;
use std::{
    future::pending,
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;
use tracing::{
    debug,
    info,
    trace,
    warn,
};

pub struct OutcomeResolver<C> {
    chain: Arc<C>,
    capability: CapabilityCache,
    config: ResolverConfig,
}

enum Verdict {
    Resolved(SpinOutcome, Strategy),
    Exhausted,
}

impl<C: ChainClient> OutcomeResolver<C> {
    pub fn new(chain: Arc<C>, capability: CapabilityCache, config: ResolverConfig) -> Self {
        Self {
            chain,
            capability,
            config,
        }
    }

    /// Drives `tx` from confirmation to a terminal phase of `generation`.
    pub async fn run(self, tx: TxHash, cell: SessionCell, generation: u64) {
        let receipt = match self
            .chain
            .wait_for_confirmation(tx, self.config.confirmations)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(?tx, %reason, "spin was not confirmed");
                cell.fail(generation, FailureReason::Unconfirmed(reason));
                return;
            }
        };
        if is_reverted(&receipt) {
            warn!(?tx, block = ?receipt.block_number, "spin reverted");
            cell.fail(generation, FailureReason::Reverted);
            return;
        }

        let degraded = self.capability.get().is_degraded();
        if !cell.confirm(generation, degraded) {
            debug!(?tx, generation, "spin superseded before confirmation");
            return;
        }
        info!(?tx, block = ?receipt.block_number, degraded, "spin confirmed");

        let race = Race::new(&self, tx, receipt.block_number, &cell, generation, degraded);
        match race.run().await {
            Verdict::Resolved(outcome, strategy) => {
                let spin_id = outcome.spin_id;
                let payout = format_eth(outcome.payout);
                if cell.resolve(generation, outcome, strategy) {
                    info!(?tx, %spin_id, %payout, ?strategy, "spin resolved");
                } else {
                    debug!(?tx, ?strategy, "outcome already recorded");
                }
            }
            Verdict::Exhausted => {
                warn!(?tx, "spin outcome could not be confirmed");
                cell.time_out(generation);
            }
        }
    }
}

struct Race<'a, C> {
    chain: &'a C,
    config: &'a ResolverConfig,
    capability: &'a CapabilityCache,
    cell: &'a SessionCell,
    generation: u64,
    tx: TxHash,
    /// Block the spin was mined in. The watch starts there so it sees the
    /// spin's own logs.
    mined_in: Option<U64>,
    contract: Address,
    timers: Timers,
    polling: PollSchedule,
    verify: Option<VerifyRun>,
    watch: Option<EventWatch>,
}

impl<'a, C: ChainClient> Race<'a, C> {
    fn new(
        resolver: &'a OutcomeResolver<C>,
        tx: TxHash,
        mined_in: Option<U64>,
        cell: &'a SessionCell,
        generation: u64,
        degraded: bool,
    ) -> Self {
        Self {
            chain: resolver.chain.as_ref(),
            config: &resolver.config,
            capability: &resolver.capability,
            cell,
            generation,
            tx,
            mined_in,
            contract: resolver.chain.contract_address(),
            timers: Timers::default(),
            polling: PollSchedule::new(&resolver.config.poll, degraded),
            verify: None,
            watch: None,
        }
    }

    async fn run(mut self) -> Verdict {
        let mut capability = self.capability.subscribe();
        let mut capability_open = true;

        self.timers.arm(TimerSlot::Poll, self.polling.base());
        let current = *capability.borrow_and_update();
        self.on_capability(current);
        let degraded = self.polling.is_degraded();
        self.timers
            .arm(TimerSlot::SafetyNet, self.config.verify.grace(degraded));
        if !degraded {
            self.open_watch().await;
        }

        let verdict = loop {
            let next = self.timers.next();
            let step = tokio::select! {
                batch = next_batch(&mut self.watch) => self.on_batch(batch),
                changed = capability.changed(), if capability_open => {
                    match changed {
                        Ok(()) => {
                            let current = *capability.borrow_and_update();
                            self.on_capability(current);
                        }
                        Err(_) => capability_open = false,
                    }
                    None
                }
                slot = timers::fire(next) => self.on_timer(slot).await,
            };
            if let Some(verdict) = step {
                break verdict;
            }
            if self.timers.is_empty() && self.watch.is_none() {
                warn!(tx = ?self.tx, "no strategy left to resolve the spin");
                break Verdict::Exhausted;
            }
        };
        let cancelled = self.timers.cancel_all();
        trace!(cancelled, "resolution timers cancelled");
        verdict
    }

    async fn open_watch(&mut self) {
        match self.chain.watch_events(self.mined_in).await {
            Ok(watch) => {
                debug!(tx = ?self.tx, "watching slot machine events");
                self.watch = Some(watch);
                self.cell
                    .record_progress(self.generation, |progress| progress.watching = true);
            }
            Err(err) => self.on_watch_error(&err),
        }
    }

    fn on_batch(&mut self, batch: Option<crate::Result<Vec<Log>>>) -> Option<Verdict> {
        match batch {
            Some(Ok(logs)) => {
                let ours: Vec<Log> = logs
                    .into_iter()
                    .filter(|log| log.transaction_hash == Some(self.tx))
                    .collect();
                trace!(matching = ours.len(), "event batch received");
                decode_outcome(self.contract, &ours)
                    .map(|outcome| Verdict::Resolved(outcome, Strategy::Subscription))
            }
            Some(Err(err)) => {
                self.on_watch_error(&err);
                None
            }
            None => {
                debug!("event watch closed");
                self.drop_watch();
                None
            }
        }
    }

    fn on_watch_error(&mut self, err: &anyhow::Error) {
        self.drop_watch();
        if is_filter_unsupported(err) {
            warn!(%err, "rpc endpoint cannot serve log filters, switching to receipt polling");
            self.capability.downgrade();
            self.degrade();
        } else {
            warn!(%err, "event watch failed, relying on receipt polling");
        }
    }

    fn on_capability(&mut self, capability: RpcCapability) {
        if capability.is_degraded() {
            self.degrade();
        }
    }

    /// Moves polling to the degraded cadence, pulling the next poll forward.
    fn degrade(&mut self) {
        if self.polling.is_degraded() {
            return;
        }
        self.polling.degrade();
        let sooner = Instant::now() + self.polling.base();
        if let Some(deadline) = self.timers.deadline(TimerSlot::Poll)
            && sooner < deadline
        {
            self.timers.arm_at(TimerSlot::Poll, sooner);
        }
        self.cell
            .record_progress(self.generation, |progress| progress.degraded = true);
        info!(base = ?self.polling.base(), "receipt polling degraded");
    }

    fn drop_watch(&mut self) {
        if self.watch.take().is_some() {
            self.cell
                .record_progress(self.generation, |progress| progress.watching = false);
        }
    }

    async fn on_timer(&mut self, slot: TimerSlot) -> Option<Verdict> {
        self.timers.disarm(slot);
        match slot {
            TimerSlot::Poll => self.poll().await,
            TimerSlot::SafetyNet => {
                self.start_verify(false);
                None
            }
            TimerSlot::Verify => self.verify().await,
        }
    }

    fn start_verify(&mut self, terminal: bool) {
        match &mut self.verify {
            Some(run) => {
                if terminal {
                    run.mark_terminal();
                }
            }
            None => {
                debug!(terminal, "starting receipt verification");
                self.verify = Some(VerifyRun::new(&self.config.verify, terminal));
                self.timers.arm(TimerSlot::Verify, Duration::ZERO);
            }
        }
    }

    async fn poll(&mut self) -> Option<Verdict> {
        let attempt = self.polling.begin_attempt();
        self.cell
            .record_progress(self.generation, |progress| progress.poll_attempts = attempt);
        debug!(attempt, max = self.polling.max_attempts(), "polling spin receipt");

        let result = match self.chain.transaction_receipt(self.tx).await {
            Ok(Some(receipt)) => match decode_outcome(self.contract, &receipt.logs) {
                Some(outcome) => return Some(Verdict::Resolved(outcome, Strategy::Polling)),
                None => AttemptResult::Empty,
            },
            Ok(None) => AttemptResult::Empty,
            Err(err) => {
                warn!(attempt, %err, "receipt poll failed");
                AttemptResult::FetchError
            }
        };

        match self.polling.next_delay(result) {
            Some(delay) => self.timers.arm(TimerSlot::Poll, delay),
            None => {
                info!(attempts = attempt, "receipt polling exhausted");
                self.start_verify(true);
            }
        }
        None
    }

    async fn verify(&mut self) -> Option<Verdict> {
        let attempt = self.verify.as_mut()?.begin_attempt();
        self.cell
            .record_progress(self.generation, |progress| progress.verify_attempts += 1);

        let result = match self.chain.transaction_receipt(self.tx).await {
            Ok(Some(receipt)) => {
                self.inspect(&receipt.logs);
                match decode_outcome(self.contract, &receipt.logs) {
                    Some(outcome) => {
                        return Some(Verdict::Resolved(outcome, Strategy::Verify));
                    }
                    None => AttemptResult::Empty,
                }
            }
            Ok(None) => {
                debug!(attempt, "receipt not available yet");
                AttemptResult::Empty
            }
            Err(err) => {
                warn!(attempt, %err, "receipt verification failed");
                AttemptResult::FetchError
            }
        };

        let run = self.verify.as_ref()?;
        match run.next_delay(result) {
            Some(delay) => {
                self.timers.arm(TimerSlot::Verify, delay);
                None
            }
            None => {
                let terminal = run.is_terminal();
                self.verify = None;
                if terminal {
                    Some(Verdict::Exhausted)
                } else {
                    info!(attempts = attempt, "safety-net verification found no outcome");
                    None
                }
            }
        }
    }

    fn inspect(&self, logs: &[Log]) {
        if logs.is_empty() {
            debug!(tx = ?self.tx, "receipt carries no logs");
        }
        for (index, log) in logs.iter().enumerate() {
            debug!(
                index,
                address = ?log.address,
                topics = ?log.topics,
                data = %hex::encode(&log.data),
                decoded = ?parse_event_log(self.contract, log),
                "receipt log"
            );
        }
    }
}

async fn next_batch(watch: &mut Option<EventWatch>) -> Option<crate::Result<Vec<Log>>> {
    match watch {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}
