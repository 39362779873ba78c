use ethers::{
    abi::{
        Token,
        encode,
    },
    contract::EthEvent,
    types::{
        Address,
        Bytes,
        H256,
        Log,
        TransactionReceipt,
        U64,
        U256,
    },
};

use crate::events::{
    PayoutCalculatedEvent,
    RewardClaimedEvent,
    SpinResultEvent,
    SpinStartedEvent,
};

pub fn player() -> Address {
    Address::from_low_u64_be(0xa11ce)
}

pub fn tx_hash(seed: u64) -> H256 {
    H256::from_low_u64_be(seed)
}

/// Block every helper log and receipt is placed in.
pub fn spin_block() -> U64 {
    U64::from(0x2a_0000)
}

/// `amount` thousandths of an ether, in wei.
pub fn milli_eth(amount: u64) -> U256 {
    U256::from(amount) * U256::exp10(15)
}

pub fn payout_event(
    spin_id: u64,
    reels: [u8; 3],
    payout: U256,
    multiplier: u64,
    is_jackpot: bool,
    win_type: &str,
) -> PayoutCalculatedEvent {
    PayoutCalculatedEvent {
        player: player(),
        spin_id: U256::from(spin_id),
        bet_amount: milli_eth(1),
        reel1: reels[0],
        reel2: reels[1],
        reel3: reels[2],
        payout,
        multiplier: U256::from(multiplier),
        is_jackpot,
        win_type: win_type.to_string(),
        timestamp: U256::from(1_700_000_000u64),
    }
}

pub fn losing_payout_event(spin_id: u64) -> PayoutCalculatedEvent {
    payout_event(spin_id, [0, 3, 5], U256::zero(), 0, false, "NO_WIN")
}

fn log_for<E: EthEvent>(contract: Address, tx: H256, player: Address, data: Vec<u8>) -> Log {
    Log {
        address: contract,
        topics: vec![E::signature(), H256::from(player)],
        data: Bytes::from(data),
        block_number: Some(spin_block()),
        transaction_hash: Some(tx),
        ..Default::default()
    }
}

pub fn payout_calculated_log(
    contract: Address,
    tx: H256,
    event: &PayoutCalculatedEvent,
) -> Log {
    let data = encode(&[
        Token::Uint(event.spin_id),
        Token::Uint(event.bet_amount),
        Token::Uint(U256::from(event.reel1)),
        Token::Uint(U256::from(event.reel2)),
        Token::Uint(U256::from(event.reel3)),
        Token::Uint(event.payout),
        Token::Uint(event.multiplier),
        Token::Bool(event.is_jackpot),
        Token::String(event.win_type.clone()),
        Token::Uint(event.timestamp),
    ]);
    log_for::<PayoutCalculatedEvent>(contract, tx, event.player, data)
}

pub fn spin_started_log(contract: Address, tx: H256, event: &SpinStartedEvent) -> Log {
    let data = encode(&[
        Token::Uint(event.spin_id),
        Token::Uint(event.bet_amount),
        Token::Uint(event.timestamp),
    ]);
    log_for::<SpinStartedEvent>(contract, tx, event.player, data)
}

pub fn spin_result_log(contract: Address, tx: H256, event: &SpinResultEvent) -> Log {
    let data = encode(&[
        Token::Uint(event.spin_id),
        Token::Uint(U256::from(event.reel1)),
        Token::Uint(U256::from(event.reel2)),
        Token::Uint(U256::from(event.reel3)),
        Token::Uint(event.timestamp),
    ]);
    log_for::<SpinResultEvent>(contract, tx, event.player, data)
}

pub fn reward_claimed_log(
    contract: Address,
    tx: H256,
    event: &RewardClaimedEvent,
) -> Log {
    let data = encode(&[
        Token::Uint(event.spin_id),
        Token::Uint(event.amount),
        Token::Uint(event.timestamp),
    ]);
    log_for::<RewardClaimedEvent>(contract, tx, event.player, data)
}

/// Successful receipt carrying `logs` in emission order.
pub fn receipt_with_logs(tx: H256, logs: Vec<Log>) -> TransactionReceipt {
    let logs = logs
        .into_iter()
        .enumerate()
        .map(|(index, log)| Log {
            log_index: Some(U256::from(index)),
            ..log
        })
        .collect();
    TransactionReceipt {
        transaction_hash: tx,
        block_number: Some(spin_block()),
        status: Some(U64::one()),
        logs,
        ..Default::default()
    }
}

pub fn reverted_receipt(tx: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx,
        block_number: Some(spin_block()),
        status: Some(U64::zero()),
        ..Default::default()
    }
}
