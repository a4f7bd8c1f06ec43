//! Chain client with multi-RPC support and automatic failover

use super::ChainClient;
use crate::config::ChainConfig;
use crate::error::ChainClientError;

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockNumber, Bytes, TransactionRequest, H256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Multi-provider JSON-RPC client
///
/// Read-only requests fail over across every configured endpoint. Raw
/// submissions go to the active endpoint exactly once; a failed submission
/// only rotates the endpoint for later requests, so a transaction is never
/// broadcast through two nodes by this client.
pub struct EthersChainClient {
    /// Endpoint URLs, parallel to `providers`
    urls: Vec<String>,
    /// HTTP providers (multiple for failover)
    providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl EthersChainClient {
    /// Create a client for every parseable RPC URL in the config
    pub fn new(config: &ChainConfig) -> Result<Self, ChainClientError> {
        let mut urls = Vec::new();
        let mut providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    providers.push(provider.interval(Duration::from_millis(100)));
                    urls.push(url.clone());
                    debug!("Added HTTP provider: {}", url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if providers.is_empty() {
            return Err(ChainClientError::NoEndpoints);
        }

        info!("Chain client ready with {} endpoint(s)", providers.len());

        Ok(Self {
            urls,
            providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    fn active_index(&self) -> usize {
        self.current_provider.load(Ordering::Relaxed) % self.providers.len()
    }

    /// Switch to next available provider
    fn failover(&self) {
        let current = self.active_index();
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        if next != current {
            warn!("Failover to provider {} ({})", next, self.urls[next]);
        }
    }

    /// Split node rejections from transport failures
    fn classify(&self, idx: usize, e: ProviderError) -> ChainClientError {
        match RpcError::as_error_response(&e) {
            Some(rpc) => ChainClientError::Rpc(format!("{} (code {})", rpc.message, rpc.code)),
            None => ChainClientError::Transport {
                url: self.urls[idx].clone(),
                message: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockNumber,
    ) -> Result<u64, ChainClientError> {
        let mut last_error = ChainClientError::NoEndpoints;

        for _ in 0..self.providers.len() {
            let idx = self.active_index();
            match self.providers[idx]
                .get_transaction_count(address, Some(block.into()))
                .await
            {
                Ok(count) => return Ok(count.low_u64()),
                Err(e) => {
                    let error = self.classify(idx, e);
                    warn!("Failed to get transaction count for {:?}: {}", address, error);
                    if matches!(error, ChainClientError::Rpc(_)) {
                        return Err(error);
                    }
                    last_error = error;
                    self.failover();
                }
            }
        }

        Err(last_error)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainClientError> {
        let idx = self.active_index();
        match self.providers[idx].send_raw_transaction(raw).await {
            Ok(pending_tx) => Ok(pending_tx.tx_hash()),
            Err(e) => {
                let error = self.classify(idx, e);
                if !matches!(error, ChainClientError::Rpc(_)) {
                    self.failover();
                }
                Err(error)
            }
        }
    }

    async fn call(&self, params: &TransactionRequest) -> Result<Bytes, ChainClientError> {
        let tx = TypedTransaction::Legacy(params.clone());
        let mut last_error = ChainClientError::NoEndpoints;

        for _ in 0..self.providers.len() {
            let idx = self.active_index();
            match self.providers[idx].call(&tx, None).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let error = self.classify(idx, e);
                    if matches!(error, ChainClientError::Rpc(_)) {
                        return Err(error);
                    }
                    warn!("eth_call failed: {}", error);
                    last_error = error;
                    self.failover();
                }
            }
        }

        Err(last_error)
    }
}
