//! Signature-keyed decoding of slot machine logs.
//!
//! Logs are matched on their first topic against the four known event
//! schemas. Anything that does not decode is skipped, never an error.

use crate::events::{
    ContractEvent,
    RewardClaimed,
    SpinOutcome,
};
use ethers::{
    abi::RawLog,
    contract::{
        EthEvent,
        EthLogDecode,
    },
    types::{
        Address,
        H256,
        Log,
    },
};
use generated_abi::events::{
    PayoutCalculatedEvent as AbiPayoutCalculatedEvent,
    RewardClaimedEvent as AbiRewardClaimedEvent,
    SpinResultEvent as AbiSpinResultEvent,
    SpinStartedEvent as AbiSpinStartedEvent,
};
use tracing::{
    debug,
    trace,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    SpinStarted,
    SpinResult,
    PayoutCalculated,
    RewardClaimed,
}

impl EventKind {
    pub fn from_topic(topic: &H256) -> Option<Self> {
        if *topic == AbiSpinStartedEvent::signature() {
            Some(EventKind::SpinStarted)
        } else if *topic == AbiSpinResultEvent::signature() {
            Some(EventKind::SpinResult)
        } else if *topic == AbiPayoutCalculatedEvent::signature() {
            Some(EventKind::PayoutCalculated)
        } else if *topic == AbiRewardClaimedEvent::signature() {
            Some(EventKind::RewardClaimed)
        } else {
            None
        }
    }
}

pub fn parse_event_log(contract: Address, log: &Log) -> Option<ContractEvent> {
    if log.address != contract || log.removed == Some(true) {
        return None;
    }
    let Some(kind) = log.topics.first().and_then(EventKind::from_topic) else {
        trace!(topics = ?log.topics, "skipping log with unknown signature");
        return None;
    };
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    match kind {
        EventKind::SpinStarted => {
            decode::<AbiSpinStartedEvent>(&raw).map(|e| ContractEvent::SpinStarted(e.into()))
        }
        EventKind::SpinResult => {
            decode::<AbiSpinResultEvent>(&raw).map(|e| ContractEvent::SpinResult(e.into()))
        }
        EventKind::PayoutCalculated => {
            let event = decode::<AbiPayoutCalculatedEvent>(&raw)?;
            match SpinOutcome::try_from(event) {
                Ok(outcome) => Some(ContractEvent::PayoutCalculated(outcome)),
                Err(err) => {
                    debug!(%err, "skipping inconsistent payout log");
                    None
                }
            }
        }
        EventKind::RewardClaimed => decode::<AbiRewardClaimedEvent>(&raw)
            .map(|e| ContractEvent::RewardClaimed(e.into())),
    }
}

fn decode<E: EthLogDecode>(raw: &RawLog) -> Option<E> {
    match E::decode_log(raw) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(?err, "failed to decode log payload");
            None
        }
    }
}

pub fn decode_events(contract: Address, logs: &[Log]) -> Vec<ContractEvent> {
    logs.iter()
        .filter_map(|log| parse_event_log(contract, log))
        .collect()
}

/// Outcome carried by `logs`. The last payout log in receipt order wins.
pub fn decode_outcome(contract: Address, logs: &[Log]) -> Option<SpinOutcome> {
    logs.iter()
        .filter_map(|log| match parse_event_log(contract, log)? {
            ContractEvent::PayoutCalculated(outcome) => Some(outcome),
            _ => None,
        })
        .last()
}

pub fn claimed_rewards(contract: Address, logs: &[Log]) -> Vec<RewardClaimed> {
    logs.iter()
        .filter_map(|log| match parse_event_log(contract, log)? {
            ContractEvent::RewardClaimed(claimed) => Some(claimed),
            _ => None,
        })
        .collect()
}
