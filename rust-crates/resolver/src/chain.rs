use crate::Result;
use ethers::types::{
    Address,
    Log,
    TransactionReceipt,
    TxHash,
    U64,
    U256,
};
use futures::stream::BoxStream;

/// Batches of logs delivered by a standing event filter.
pub type EventWatch = BoxStream<'static, Result<Vec<Log>>>;

/// Error fragments RPC nodes report when they cannot serve log filters.
const UNSUPPORTED_FILTER_PATTERNS: [&str; 2] =
    ["filter not found", "Missing or invalid parameters"];

pub trait ChainClient: Send + Sync + 'static {
    fn contract_address(&self) -> Address;

    fn submit_spin(&self, bet: U256) -> impl Future<Output = Result<TxHash>> + Send;

    /// Resolves once `tx` has `confirmations` blocks on top of it. Fails when the
    /// transaction is dropped or its receipt cannot be obtained.
    fn wait_for_confirmation(
        &self,
        tx: TxHash,
        confirmations: usize,
    ) -> impl Future<Output = Result<TransactionReceipt>> + Send;

    fn transaction_receipt(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>>> + Send;

    /// Installs the capability probe filter and returns its id.
    fn install_probe_filter(&self) -> impl Future<Output = Result<U256>> + Send;

    fn uninstall_filter(&self, id: U256) -> impl Future<Output = Result<bool>> + Send;

    /// Standing watch on every slot machine event. Logs from `from_block`
    /// onwards that were mined before the watch started are delivered first;
    /// without a block only logs mined afterwards are seen.
    fn watch_events(
        &self,
        from_block: Option<U64>,
    ) -> impl Future<Output = Result<EventWatch>> + Send;
}

pub fn is_filter_unsupported(err: &anyhow::Error) -> bool {
    let message = format!("{err:#}");
    UNSUPPORTED_FILTER_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

pub fn is_reverted(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::zero())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use anyhow::{
        Context,
        anyhow,
    };

    #[test]
    fn is_filter_unsupported__matches_known_node_errors() {
        let missing = anyhow!("(code: -32000, message: filter not found, data: None)");
        let invalid = Err::<(), _>(anyhow!("Missing or invalid parameters"))
            .context("polling filter changes")
            .unwrap_err();
        let other = anyhow!("connection reset by peer");

        assert!(is_filter_unsupported(&missing));
        assert!(is_filter_unsupported(&invalid));
        assert!(!is_filter_unsupported(&other));
    }

    #[test]
    fn is_reverted__only_for_status_zero() {
        let mut receipt = TransactionReceipt::default();
        assert!(!is_reverted(&receipt));

        receipt.status = Some(U64::one());
        assert!(!is_reverted(&receipt));

        receipt.status = Some(U64::zero());
        assert!(is_reverted(&receipt));
    }
}
