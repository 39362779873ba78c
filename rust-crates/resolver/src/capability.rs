use crate::chain::ChainClient;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{
    info,
    warn,
};

/// Whether the RPC endpoint serves server-side log filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcCapability {
    #[default]
    Unknown,
    Supported,
    Unsupported,
}

impl RpcCapability {
    pub fn is_degraded(self) -> bool {
        self == RpcCapability::Unsupported
    }
}

/// Shared, observable capability verdict. Clones share one value.
#[derive(Clone, Debug)]
pub struct CapabilityCache {
    inner: Arc<watch::Sender<RpcCapability>>,
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::with_capability(RpcCapability::Unknown)
    }
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capability(capability: RpcCapability) -> Self {
        let (sender, _) = watch::channel(capability);
        Self {
            inner: Arc::new(sender),
        }
    }

    pub fn get(&self) -> RpcCapability {
        *self.inner.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RpcCapability> {
        self.inner.subscribe()
    }

    /// Stores a probe verdict unless one is already known. Returns the cached value.
    pub fn record_probe(&self, supported: bool) -> RpcCapability {
        let verdict = if supported {
            RpcCapability::Supported
        } else {
            RpcCapability::Unsupported
        };
        self.inner.send_if_modified(|current| {
            if *current == RpcCapability::Unknown {
                *current = verdict;
                true
            } else {
                false
            }
        });
        self.get()
    }

    /// Marks filters unusable for the rest of the process. Returns whether this
    /// call changed the verdict.
    pub fn downgrade(&self) -> bool {
        self.inner.send_if_modified(|current| {
            let changed = *current != RpcCapability::Unsupported;
            *current = RpcCapability::Unsupported;
            changed
        })
    }
}

/// Installs and removes a throwaway filter to learn what the endpoint supports.
/// Runs at most once per cache.
pub async fn probe<C: ChainClient>(chain: &C, cache: &CapabilityCache) -> RpcCapability {
    let known = cache.get();
    if known != RpcCapability::Unknown {
        return known;
    }
    match chain.install_probe_filter().await {
        Ok(id) => {
            let capability = cache.record_probe(true);
            info!(?capability, "rpc endpoint accepted a log filter");
            if let Err(err) = chain.uninstall_filter(id).await {
                warn!(%err, "could not uninstall probe filter");
            }
            capability
        }
        Err(err) => {
            let capability = cache.record_probe(false);
            info!(%err, ?capability, "rpc endpoint rejected a log filter");
            capability
        }
    }
}
