//! Chain module - the JSON-RPC surface the wallet depends on
//!
//! This module provides:
//! - The `ChainClient` trait the transaction sender talks to
//! - An ethers-backed implementation with multi-RPC failover

pub mod provider;

pub use provider::EthersChainClient;

use crate::error::ChainClientError;

use async_trait::async_trait;
use ethers::types::{Address, BlockNumber, Bytes, TransactionRequest, H256};

/// Node operations needed to assign nonces and broadcast transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// `eth_getTransactionCount` for `address` at `block`
    async fn get_transaction_count(
        &self,
        address: Address,
        block: BlockNumber,
    ) -> Result<u64, ChainClientError>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256, ChainClientError>;

    /// `eth_call` against the latest block
    async fn call(&self, params: &TransactionRequest) -> Result<Bytes, ChainClientError>;
}
