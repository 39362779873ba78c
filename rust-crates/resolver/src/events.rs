use ethers::types::{
    Address,
    U256,
};
use generated_abi::events::{
    PayoutCalculatedEvent as AbiPayoutCalculatedEvent,
    RewardClaimedEvent as AbiRewardClaimedEvent,
    SpinResultEvent as AbiSpinResultEvent,
    SpinStartedEvent as AbiSpinStartedEvent,
};
use serde::Serialize;
use std::fmt;

/// Label the contract uses for three sevens.
pub const TRIPLE_SEVEN_LABEL: &str = "TRIPLE_SEVEN";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    Cherry,
    Lemon,
    Orange,
    Clover,
    Grape,
    Bell,
    Crown,
    Diamond,
    Seven,
}

impl Symbol {
    pub const ALL: [Symbol; 9] = [
        Symbol::Cherry,
        Symbol::Lemon,
        Symbol::Orange,
        Symbol::Clover,
        Symbol::Grape,
        Symbol::Bell,
        Symbol::Crown,
        Symbol::Diamond,
        Symbol::Seven,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Symbol::Cherry => "🍒",
            Symbol::Lemon => "🍋",
            Symbol::Orange => "🍊",
            Symbol::Clover => "🍀",
            Symbol::Grape => "🍇",
            Symbol::Bell => "🔔",
            Symbol::Crown => "👑",
            Symbol::Diamond => "💎",
            Symbol::Seven => "7️⃣",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum WinCategory {
    NoWin,
    DoubleMatch,
    TripleMatch,
    Jackpot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpinOutcome {
    pub player: Address,
    pub spin_id: U256,
    pub bet_amount: U256,
    pub reels: [u8; 3],
    pub payout: U256,
    pub multiplier: U256,
    pub is_jackpot: bool,
    pub win_type: String,
    pub timestamp: U256,
}

impl SpinOutcome {
    pub fn symbols(&self) -> [Option<Symbol>; 3] {
        self.reels.map(Symbol::from_code)
    }

    pub fn is_win(&self) -> bool {
        !self.payout.is_zero()
    }

    pub fn category(&self) -> WinCategory {
        if self.payout.is_zero() {
            WinCategory::NoWin
        } else if self.is_jackpot || self.win_type == TRIPLE_SEVEN_LABEL {
            WinCategory::Jackpot
        } else if self.win_type.contains("DOUBLE") {
            WinCategory::DoubleMatch
        } else {
            WinCategory::TripleMatch
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OutcomeError {
    #[error("spin {spin_id} is flagged as a jackpot but pays nothing")]
    JackpotWithoutPayout { spin_id: U256 },
}

impl TryFrom<AbiPayoutCalculatedEvent> for SpinOutcome {
    type Error = OutcomeError;

    fn try_from(event: AbiPayoutCalculatedEvent) -> Result<Self, Self::Error> {
        if event.is_jackpot && event.payout.is_zero() {
            return Err(OutcomeError::JackpotWithoutPayout {
                spin_id: event.spin_id,
            });
        }
        Ok(SpinOutcome {
            player: event.player,
            spin_id: event.spin_id,
            bet_amount: event.bet_amount,
            reels: [event.reel1, event.reel2, event.reel3],
            payout: event.payout,
            multiplier: event.multiplier,
            is_jackpot: event.is_jackpot,
            win_type: event.win_type,
            timestamp: event.timestamp,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpinStarted {
    pub player: Address,
    pub spin_id: U256,
    pub bet_amount: U256,
    pub timestamp: U256,
}

impl From<AbiSpinStartedEvent> for SpinStarted {
    fn from(event: AbiSpinStartedEvent) -> Self {
        SpinStarted {
            player: event.player,
            spin_id: event.spin_id,
            bet_amount: event.bet_amount,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpinReels {
    pub player: Address,
    pub spin_id: U256,
    pub reels: [u8; 3],
    pub timestamp: U256,
}

impl From<AbiSpinResultEvent> for SpinReels {
    fn from(event: AbiSpinResultEvent) -> Self {
        SpinReels {
            player: event.player,
            spin_id: event.spin_id,
            reels: [event.reel1, event.reel2, event.reel3],
            timestamp: event.timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewardClaimed {
    pub player: Address,
    pub spin_id: U256,
    pub amount: U256,
    pub timestamp: U256,
}

impl From<AbiRewardClaimedEvent> for RewardClaimed {
    fn from(event: AbiRewardClaimedEvent) -> Self {
        RewardClaimed {
            player: event.player,
            spin_id: event.spin_id,
            amount: event.amount,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ContractEvent {
    SpinStarted(SpinStarted),
    SpinResult(SpinReels),
    PayoutCalculated(SpinOutcome),
    RewardClaimed(RewardClaimed),
}
