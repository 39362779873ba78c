use crate::{
    Result,
    format::time_ago,
};
use chrono::{
    DateTime,
    Utc,
};
use ethers::{
    abi::{
        InvalidOutputType,
        Tokenizable,
    },
    types::{
        Address,
        U256,
    },
};
use generated_abi::slot_machine_types as abi;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CasinoStats {
    pub balance: U256,
    pub total_spins: U256,
    pub total_wagered: U256,
    pub total_payouts: U256,
    pub jackpot_hits: U256,
    pub is_active: bool,
}

impl From<(U256, U256, U256, U256, U256, bool)> for CasinoStats {
    fn from(
        (balance, total_spins, total_wagered, total_payouts, jackpot_hits, is_active): (
            U256,
            U256,
            U256,
            U256,
            U256,
            bool,
        ),
    ) -> Self {
        Self {
            balance,
            total_spins,
            total_wagered,
            total_payouts,
            jackpot_hits,
            is_active,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub total_spins: U256,
    pub total_wagered: U256,
    pub total_won: U256,
    pub biggest_win: U256,
    pub last_play_time: U256,
}

/// Reshaped through its ABI tokens so the binding's field names never matter.
impl TryFrom<abi::PlayerStats> for PlayerStats {
    type Error = InvalidOutputType;

    fn try_from(stats: abi::PlayerStats) -> Result<Self, Self::Error> {
        let (total_spins, total_wagered, total_won, biggest_win, last_play_time) =
            <(U256, U256, U256, U256, U256)>::from_token(stats.into_token())?;
        Ok(Self {
            total_spins,
            total_wagered,
            total_won,
            biggest_win,
            last_play_time,
        })
    }
}

impl PlayerStats {
    /// Winnings as a percentage of the amount wagered, to two decimals.
    pub fn win_rate(&self) -> f64 {
        if self.total_won.is_zero() || self.total_wagered.is_zero() {
            return 0.0;
        }
        let basis_points =
            self.total_won.saturating_mul(U256::from(10_000)) / self.total_wagered;
        basis_points.min(U256::from(u64::MAX)).as_u64() as f64 / 100.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PendingReward {
    pub amount: U256,
    pub spin_id: U256,
    pub timestamp: U256,
    pub reels: [u8; 3],
    pub multiplier: U256,
    pub is_jackpot: bool,
}

impl TryFrom<abi::PendingReward> for PendingReward {
    type Error = InvalidOutputType;

    fn try_from(reward: abi::PendingReward) -> Result<Self, Self::Error> {
        let (amount, spin_id, timestamp, reel1, reel2, reel3, multiplier, is_jackpot) =
            <(U256, U256, U256, u8, u8, u8, U256, bool)>::from_token(reward.into_token())?;
        Ok(Self {
            amount,
            spin_id,
            timestamp,
            reels: [reel1, reel2, reel3],
            multiplier,
            is_jackpot,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BetLimits {
    pub min: U256,
    pub max: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LatestWin {
    pub reward: PendingReward,
    pub label: &'static str,
    pub time_ago: String,
}

pub fn sort_newest_first(rewards: &mut [PendingReward]) {
    rewards.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Most recent pending reward. Among equal timestamps the earlier entry wins.
pub fn latest_win(rewards: &[PendingReward], now: DateTime<Utc>) -> Option<LatestWin> {
    let newest = rewards.iter().fold(None::<&PendingReward>, |newest, reward| {
        match newest {
            Some(current) if current.timestamp >= reward.timestamp => newest,
            _ => Some(reward),
        }
    })?;
    let label = if newest.is_jackpot {
        "MEGA JACKPOT!"
    } else if newest.multiplier >= U256::from(100) {
        "TRIPLE MATCH"
    } else {
        "DOUBLE MATCH"
    };
    Some(LatestWin {
        reward: newest.clone(),
        label,
        time_ago: time_ago(newest.timestamp, now),
    })
}

pub trait CasinoReads: Send + Sync {
    fn casino_stats(&self) -> impl Future<Output = Result<CasinoStats>> + Send;

    fn player_stats(&self, player: Address) -> impl Future<Output = Result<PlayerStats>> + Send;

    fn pending_rewards(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<Vec<PendingReward>>> + Send;

    fn total_pending(&self, player: Address) -> impl Future<Output = Result<U256>> + Send;

    fn bet_limits(&self) -> impl Future<Output = Result<BetLimits>> + Send;

    /// Native balance held by the contract.
    fn contract_balance(&self) -> impl Future<Output = Result<U256>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerBoard {
    pub address: Address,
    pub stats: PlayerStats,
    /// Newest first.
    pub pending: Vec<PendingReward>,
    pub total_pending: U256,
    pub latest_win: Option<LatestWin>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsBoard {
    pub casino: CasinoStats,
    pub contract_balance: U256,
    pub bet_limits: BetLimits,
    pub player: Option<PlayerBoard>,
}

impl StatsBoard {
    pub async fn fetch<R: CasinoReads>(
        reads: &R,
        player: Option<Address>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let (casino, contract_balance, bet_limits) = futures::try_join!(
            reads.casino_stats(),
            reads.contract_balance(),
            reads.bet_limits(),
        )?;
        let player = match player {
            Some(address) => {
                let (stats, mut pending, total_pending) = futures::try_join!(
                    reads.player_stats(address),
                    reads.pending_rewards(address),
                    reads.total_pending(address),
                )?;
                sort_newest_first(&mut pending);
                let latest_win = latest_win(&pending, now);
                Some(PlayerBoard {
                    address,
                    stats,
                    pending,
                    total_pending,
                    latest_win,
                })
            }
            None => None,
        };
        Ok(Self {
            casino,
            contract_balance,
            bet_limits,
            player,
        })
    }
}
