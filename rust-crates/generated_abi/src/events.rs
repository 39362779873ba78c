//! Log layouts of the slot machine events.
//!
//! `player` is the only indexed field of every event, so each log carries two
//! topics: the signature hash and the left-padded player address.

use ethers::{
    contract::EthEvent,
    types::{
        Address,
        U256,
    },
};

pub const SPIN_STARTED_SIGNATURE: &str = "SpinStarted(address,uint256,uint256,uint256)";
pub const SPIN_RESULT_SIGNATURE: &str =
    "SpinResult(address,uint256,uint8,uint8,uint8,uint256)";
pub const PAYOUT_CALCULATED_SIGNATURE: &str = "PayoutCalculated(address,uint256,uint256,uint8,uint8,uint8,uint256,uint256,bool,string,uint256)";
pub const REWARD_CLAIMED_SIGNATURE: &str =
    "RewardClaimed(address,uint256,uint256,uint256)";

#[derive(Clone, Debug, Default, PartialEq, Eq, EthEvent)]
#[ethevent(
    name = "SpinStarted",
    abi = "SpinStarted(address,uint256,uint256,uint256)"
)]
pub struct SpinStartedEvent {
    #[ethevent(indexed)]
    pub player: Address,
    pub spin_id: U256,
    pub bet_amount: U256,
    pub timestamp: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, EthEvent)]
#[ethevent(
    name = "SpinResult",
    abi = "SpinResult(address,uint256,uint8,uint8,uint8,uint256)"
)]
pub struct SpinResultEvent {
    #[ethevent(indexed)]
    pub player: Address,
    pub spin_id: U256,
    pub reel1: u8,
    pub reel2: u8,
    pub reel3: u8,
    pub timestamp: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, EthEvent)]
#[ethevent(
    name = "PayoutCalculated",
    abi = "PayoutCalculated(address,uint256,uint256,uint8,uint8,uint8,uint256,uint256,bool,string,uint256)"
)]
pub struct PayoutCalculatedEvent {
    #[ethevent(indexed)]
    pub player: Address,
    pub spin_id: U256,
    pub bet_amount: U256,
    pub reel1: u8,
    pub reel2: u8,
    pub reel3: u8,
    pub payout: U256,
    pub multiplier: U256,
    pub is_jackpot: bool,
    pub win_type: String,
    pub timestamp: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, EthEvent)]
#[ethevent(
    name = "RewardClaimed",
    abi = "RewardClaimed(address,uint256,uint256,uint256)"
)]
pub struct RewardClaimedEvent {
    #[ethevent(indexed)]
    pub player: Address,
    pub spin_id: U256,
    pub amount: U256,
    pub timestamp: U256,
}
