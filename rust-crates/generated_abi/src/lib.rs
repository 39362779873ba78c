use ethers::{
    providers::Middleware,
    types::{
        Address,
        H160,
    },
};
use std::sync::Arc;

pub mod slot_machine_types {
    use ethers::contract::abigen;

    abigen!(SlotMachine, "abi/SlotMachine.json");
}

pub use slot_machine_types::SlotMachine;

pub mod events;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub const BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";
pub const LOCAL_RPC_URL: &str = "http://localhost:8545";

/// Slot machine deployment on Base Sepolia.
pub const SLOT_MACHINE_ADDRESS: Address = H160([
    0x0c, 0xa2, 0x15, 0xcd, 0x28, 0x22, 0x16, 0x9a, 0x4c, 0x87, 0xf8, 0x1d, 0x2b, 0x87,
    0x81, 0x90, 0xf6, 0xf0, 0x96, 0x51,
]);

/// Event the capability probe filters on. The contract never emits it.
pub const PROBE_EVENT_SIGNATURE: &str = "TestEvent()";

/// Canonical signatures of every event the client understands, in the order
/// they are emitted during a spin.
pub const EVENT_SIGNATURES: [&str; 4] = [
    events::SPIN_STARTED_SIGNATURE,
    events::SPIN_RESULT_SIGNATURE,
    events::PAYOUT_CALCULATED_SIGNATURE,
    events::REWARD_CLAIMED_SIGNATURE,
];

pub fn contract_instance<M: Middleware>(
    address: Address,
    client: Arc<M>,
) -> SlotMachine<M> {
    SlotMachine::new(address, client)
}
