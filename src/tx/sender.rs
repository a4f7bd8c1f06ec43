//! Transaction sender with per-address nonce serialization
//!
//! Every send runs the sequence
//!
//! 1. take the address lock
//! 2. query the pending transaction count (the nonce)
//! 3. assemble, sign, submit
//! 4. release the lock
//!
//! with nothing cached in between, so concurrent sends from one address get
//! consecutive nonces while sends from different addresses never wait on
//! each other.

use super::nonce::AddressLocks;
use super::signer::{PrivateKey, TransactionSigner};
use crate::chain::ChainClient;
use crate::config::Settings;
use crate::error::{ChainClientError, WalletError, WalletResult};
use crate::metrics;

use ethers::types::{Address, BlockNumber, Bytes, TransactionRequest, H256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Runtime knobs for a sender
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Chain id injected when the caller does not set one
    pub chain_id: u64,
    /// Upper bound on each node round trip made while holding the lock
    pub request_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            chain_id: 0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for SenderConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            chain_id: settings.wallet.chain_id,
            request_timeout: settings.chain.request_timeout(),
        }
    }
}

/// Merge the sender's defaults into caller-supplied fields
///
/// Defaults are `nonce = pending_nonce`, `chain_id = chain_id` and
/// `from = from`. A field the caller already set wins over its default;
/// every other caller field passes through untouched.
pub fn assemble_transaction(
    params: TransactionRequest,
    from: Address,
    pending_nonce: u64,
    chain_id: u64,
) -> TransactionRequest {
    let mut tx = params;
    if tx.nonce.is_none() {
        tx.nonce = Some(pending_nonce.into());
    }
    if tx.chain_id.is_none() {
        tx.chain_id = Some(chain_id.into());
    }
    if tx.from.is_none() {
        tx.from = Some(from);
    }
    tx
}

/// Signs and submits transactions for a single key
pub struct TransactionSender {
    /// Address derived from `key` at construction
    address: Address,
    key: PrivateKey,
    signer: Arc<dyn TransactionSigner>,
    client: Arc<dyn ChainClient>,
    locks: Arc<AddressLocks>,
    config: SenderConfig,
}

impl TransactionSender {
    /// Create a sender using the process-wide lock table
    pub fn new(
        key: PrivateKey,
        signer: Arc<dyn TransactionSigner>,
        client: Arc<dyn ChainClient>,
        config: SenderConfig,
    ) -> WalletResult<Self> {
        let address = signer.derive_address(&key).map_err(WalletError::InvalidKey)?;

        debug!("Transaction sender initialized for {:?}", address);

        Ok(Self {
            address,
            key,
            signer,
            client,
            locks: AddressLocks::global(),
            config,
        })
    }

    /// Use `locks` instead of the process-wide table
    pub fn with_locks(mut self, locks: Arc<AddressLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Get wallet address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current pending transaction count
    ///
    /// Takes no lock; the value may be stale by the time it is used.
    pub async fn next_nonce(&self) -> WalletResult<u64> {
        self.bounded(
            "eth_getTransactionCount",
            self.client.get_transaction_count(self.address, BlockNumber::Pending),
        )
        .await
        .map_err(|source| WalletError::NonceFetchFailed {
            address: self.address,
            source,
        })
    }

    /// Assign the next pending nonce to `params`, sign and broadcast
    pub async fn send(&self, params: TransactionRequest) -> WalletResult<H256> {
        let lock_id = Uuid::new_v4();
        let span = info_span!("send", address = ?self.address, %lock_id);

        async move {
            let wait_started = Instant::now();
            let result = {
                let _guard = self.locks.acquire(self.address).await;
                metrics::record_lock_wait(&self.address, wait_started.elapsed());
                debug!("Entered nonce lock");

                self.send_locked(params).await
            };
            debug!("Released nonce lock");

            match &result {
                Ok(_) => metrics::record_tx_submitted(&self.address),
                Err(e) => {
                    warn!("Send failed: {}", e);
                    metrics::record_tx_failed(&self.address, e.kind());
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Read-only call; never touches the address lock
    pub async fn call(&self, params: &TransactionRequest) -> WalletResult<Bytes> {
        self.client.call(params).await.map_err(WalletError::CallFailed)
    }

    /// Body of `send`; caller must hold the address lock
    async fn send_locked(&self, params: TransactionRequest) -> WalletResult<H256> {
        let pending = self
            .bounded(
                "eth_getTransactionCount",
                self.client.get_transaction_count(self.address, BlockNumber::Pending),
            )
            .await
            .map_err(|source| WalletError::NonceFetchFailed {
                address: self.address,
                source,
            })?;
        debug!(pending, "Fetched pending nonce");

        let tx = assemble_transaction(params, self.address, pending, self.config.chain_id);
        let nonce = tx.nonce.map(|n| n.low_u64()).unwrap_or(pending);
        if nonce != pending {
            warn!(nonce, pending, "Caller-supplied nonce overrides pending nonce");
        }

        let raw = self
            .signer
            .sign_and_serialize(&self.key, &tx)
            .await
            .map_err(|source| WalletError::SigningFailed {
                address: self.address,
                nonce,
                source,
            })?;
        debug!(nonce, bytes = raw.len(), "Signed transaction");

        let tx_hash = self
            .bounded("eth_sendRawTransaction", self.client.send_raw_transaction(raw))
            .await
            .map_err(|source| WalletError::SubmissionFailed {
                address: self.address,
                nonce,
                source,
            })?;

        info!(nonce, ?tx_hash, "Transaction sent");
        Ok(tx_hash)
    }

    /// Apply the request timeout to a node round trip
    async fn bounded<T>(
        &self,
        operation: &str,
        request: impl Future<Output = Result<T, ChainClientError>>,
    ) -> Result<T, ChainClientError> {
        match timeout(self.config.request_timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", operation, self.config.request_timeout);
                Err(ChainClientError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }
}
