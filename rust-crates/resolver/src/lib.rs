pub mod capability;
pub mod chain;
pub mod config;
pub mod decoder;
pub mod ethers_client;
pub mod events;
pub mod format;
pub mod resolver;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod timers;

#[cfg(test)]
mod test_helpers;

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;
