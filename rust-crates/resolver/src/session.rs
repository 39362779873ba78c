//! The active spin and everything known about its outcome.
//!
//! A [`SpinSession`] owns at most one submission at a time. Resolution runs in
//! a task spawned per submission and writes back through a [`SessionCell`];
//! every write is tagged with the submission's generation so a resolution
//! that outlived its submission cannot touch the next one.

use crate::{
    capability::{
        self,
        CapabilityCache,
        RpcCapability,
    },
    chain::ChainClient,
    config::ResolverConfig,
    events::SpinOutcome,
    format::format_eth,
    resolver::OutcomeResolver,
};
use ethers::types::{
    TxHash,
    U256,
};
use std::{
    fmt,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::Instant,
};
use tracing::{
    debug,
    info,
    warn,
};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Submitted,
    Confirmed,
    Resolved,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinSubmission {
    pub bet_amount: U256,
    pub transaction: Option<TxHash>,
    pub state: SubmissionState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The wallet or node refused the transaction.
    Rejected(String),
    Reverted,
    /// Dropped, or the receipt could not be obtained.
    Unconfirmed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected(reason) => write!(f, "rejected: {reason}"),
            FailureReason::Reverted => f.write_str("transaction reverted"),
            FailureReason::Unconfirmed(reason) => write!(f, "not confirmed: {reason}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SpinPhase {
    #[default]
    Idle,
    AwaitingConfirmation,
    Racing,
    Resolved,
    TimedOut,
    Failed(FailureReason),
}

impl SpinPhase {
    pub fn is_resolving(&self) -> bool {
        matches!(self, SpinPhase::AwaitingConfirmation | SpinPhase::Racing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SpinPhase::Resolved | SpinPhase::TimedOut | SpinPhase::Failed(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Subscription,
    Polling,
    Verify,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolutionProgress {
    /// Polling started on the degraded cadence or was switched to it.
    pub degraded: bool,
    pub watching: bool,
    pub poll_attempts: u32,
    pub verify_attempts: u32,
    pub resolved_by: Option<Strategy>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: SpinPhase,
    pub submission: Option<SpinSubmission>,
    pub outcome: Option<SpinOutcome>,
    pub progress: ResolutionProgress,
    pub failed_at: Option<Instant>,
}

impl SessionSnapshot {
    pub fn is_resolving(&self) -> bool {
        self.phase.is_resolving()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a spin is still being resolved")]
    Busy,
    #[error("the last spin failed, retry in {0:?}")]
    CoolingDown(Duration),
    #[error("bet amount must be positive")]
    InvalidBet,
    #[error("spin rejected: {0}")]
    Rejected(String),
}

/// Write handle on the session snapshot. Clones share one snapshot.
#[derive(Clone, Debug)]
pub struct SessionCell {
    inner: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionCell {
    fn default() -> Self {
        let (sender, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(sender),
        }
    }
}

impl SessionCell {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.subscribe()
    }

    /// Applies `update` if `generation` is still current and `update` reports
    /// a change.
    fn update(
        &self,
        generation: u64,
        update: impl FnOnce(&mut SessionSnapshot) -> bool,
    ) -> bool {
        self.inner.send_if_modified(|snapshot| {
            snapshot.generation == generation && update(snapshot)
        })
    }

    fn begin(&self, bet_amount: U256) -> u64 {
        let mut generation = 0;
        self.inner.send_modify(|snapshot| {
            generation = snapshot.generation + 1;
            *snapshot = SessionSnapshot {
                generation,
                phase: SpinPhase::AwaitingConfirmation,
                submission: Some(SpinSubmission {
                    bet_amount,
                    transaction: None,
                    state: SubmissionState::Submitted,
                }),
                ..SessionSnapshot::default()
            };
        });
        generation
    }

    fn attach_transaction(&self, generation: u64, tx: TxHash) -> bool {
        self.update(generation, |snapshot| match &mut snapshot.submission {
            Some(submission) if submission.transaction.is_none() => {
                submission.transaction = Some(tx);
                true
            }
            _ => false,
        })
    }

    pub fn confirm(&self, generation: u64, degraded: bool) -> bool {
        self.update(generation, |snapshot| {
            if snapshot.phase != SpinPhase::AwaitingConfirmation {
                return false;
            }
            snapshot.phase = SpinPhase::Racing;
            snapshot.progress.degraded = degraded;
            set_submission_state(snapshot, SubmissionState::Confirmed);
            true
        })
    }

    /// Records the outcome of `generation`. Only the first call wins.
    pub fn resolve(&self, generation: u64, outcome: SpinOutcome, strategy: Strategy) -> bool {
        self.update(generation, |snapshot| {
            if snapshot.phase != SpinPhase::Racing || snapshot.outcome.is_some() {
                return false;
            }
            snapshot.phase = SpinPhase::Resolved;
            snapshot.outcome = Some(outcome);
            snapshot.progress.resolved_by = Some(strategy);
            set_submission_state(snapshot, SubmissionState::Resolved);
            true
        })
    }

    pub fn fail(&self, generation: u64, reason: FailureReason) -> bool {
        self.update(generation, |snapshot| {
            if !snapshot.phase.is_resolving() {
                return false;
            }
            snapshot.phase = SpinPhase::Failed(reason);
            snapshot.failed_at = Some(Instant::now());
            set_submission_state(snapshot, SubmissionState::Failed);
            true
        })
    }

    /// Gives up on `generation`. The submission fails but no cooldown starts,
    /// since the transaction itself succeeded.
    pub fn time_out(&self, generation: u64) -> bool {
        self.update(generation, |snapshot| {
            if snapshot.phase != SpinPhase::Racing {
                return false;
            }
            snapshot.phase = SpinPhase::TimedOut;
            set_submission_state(snapshot, SubmissionState::Failed);
            true
        })
    }

    pub fn record_progress(
        &self,
        generation: u64,
        record: impl FnOnce(&mut ResolutionProgress),
    ) -> bool {
        self.update(generation, |snapshot| {
            if !snapshot.phase.is_resolving() {
                return false;
            }
            let before = snapshot.progress.clone();
            record(&mut snapshot.progress);
            snapshot.progress != before
        })
    }

    /// Forgets the current submission. A pending failure cooldown survives.
    fn reset(&self) -> bool {
        self.inner.send_if_modified(|snapshot| {
            if snapshot.phase == SpinPhase::Idle {
                return false;
            }
            *snapshot = SessionSnapshot {
                generation: snapshot.generation + 1,
                failed_at: snapshot.failed_at,
                ..SessionSnapshot::default()
            };
            true
        })
    }
}

fn set_submission_state(snapshot: &mut SessionSnapshot, state: SubmissionState) {
    if let Some(submission) = &mut snapshot.submission {
        submission.state = state;
    }
}

pub struct SpinSession<C: ChainClient> {
    chain: Arc<C>,
    capability: CapabilityCache,
    config: ResolverConfig,
    cell: SessionCell,
    resolution: Option<JoinHandle<()>>,
    probe: Option<JoinHandle<RpcCapability>>,
}

impl<C: ChainClient> SpinSession<C> {
    pub fn new(chain: Arc<C>, capability: CapabilityCache, config: ResolverConfig) -> Self {
        Self {
            chain,
            capability,
            config,
            cell: SessionCell::default(),
            resolution: None,
            probe: None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.cell.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.cell.subscribe()
    }

    pub fn is_resolving(&self) -> bool {
        self.cell.snapshot().is_resolving()
    }

    pub fn capability(&self) -> RpcCapability {
        self.capability.get()
    }

    /// Whether a new spin would be accepted right now.
    pub fn admission(&self) -> Result<(), SessionError> {
        let snapshot = self.cell.snapshot();
        if snapshot.is_resolving() {
            return Err(SessionError::Busy);
        }
        if let Some(failed_at) = snapshot.failed_at {
            let ready_at = failed_at + self.config.failure_cooldown();
            let now = Instant::now();
            if now < ready_at {
                return Err(SessionError::CoolingDown(ready_at - now));
            }
        }
        Ok(())
    }

    /// Submits a spin of `bet` wei and starts resolving its outcome in the
    /// background. Returns once the chain accepted the transaction.
    pub async fn submit(&mut self, bet: U256) -> Result<TxHash, SessionError> {
        self.admission()?;
        if bet.is_zero() {
            return Err(SessionError::InvalidBet);
        }
        self.abort_resolution();
        self.ensure_probe();

        let generation = self.cell.begin(bet);
        info!(bet = %format_eth(bet), generation, "submitting spin");
        let tx = match self.chain.submit_spin(bet).await {
            Ok(tx) => tx,
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(%reason, generation, "spin submission rejected");
                self.cell
                    .fail(generation, FailureReason::Rejected(reason.clone()));
                return Err(SessionError::Rejected(reason));
            }
        };
        self.cell.attach_transaction(generation, tx);
        debug!(?tx, generation, "spin accepted, resolving outcome");

        let resolver = OutcomeResolver::new(
            self.chain.clone(),
            self.capability.clone(),
            self.config.clone(),
        );
        self.resolution = Some(tokio::spawn(resolver.run(
            tx,
            self.cell.clone(),
            generation,
        )));
        Ok(tx)
    }

    /// Cancels all resolution work and returns the session to `Idle`.
    pub fn teardown(&mut self) {
        self.abort_resolution();
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
        let was_resolving = self.is_resolving();
        if self.cell.reset() && was_resolving {
            info!("abandoned unresolved spin");
        }
    }

    /// Waits for the current spin to leave its resolving phases.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut updates = self.cell.subscribe();
        match updates.wait_for(|snapshot| !snapshot.is_resolving()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.cell.snapshot(),
        }
    }

    fn abort_resolution(&mut self) {
        if let Some(resolution) = self.resolution.take() {
            resolution.abort();
        }
    }

    fn ensure_probe(&mut self) {
        if self.probe.is_some() || self.capability.get() != RpcCapability::Unknown {
            return;
        }
        let chain = self.chain.clone();
        let cache = self.capability.clone();
        self.probe = Some(tokio::spawn(async move {
            capability::probe(chain.as_ref(), &cache).await
        }));
    }
}

impl<C: ChainClient> Drop for SpinSession<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
