//! Error types for the nonce wallet

use ethers::types::Address;
use thiserror::Error;

/// Failures reported by a [`crate::tx::TransactionSigner`]
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Failures reported by a [`crate::chain::ChainClient`]
#[derive(Error, Debug)]
pub enum ChainClientError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("No RPC endpoints configured")]
    NoEndpoints,
}

/// Main error type for the wallet
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid key: {0}")]
    InvalidKey(#[source] SignerError),

    #[error("Failed to fetch pending nonce for {address:?}: {source}")]
    NonceFetchFailed {
        address: Address,
        #[source]
        source: ChainClientError,
    },

    #[error("Failed to sign transaction with nonce {nonce} for {address:?}: {source}")]
    SigningFailed {
        address: Address,
        nonce: u64,
        #[source]
        source: SignerError,
    },

    #[error("Failed to submit transaction with nonce {nonce} for {address:?}: {source}")]
    SubmissionFailed {
        address: Address,
        nonce: u64,
        #[source]
        source: ChainClientError,
    },

    #[error("Call failed: {0}")]
    CallFailed(#[source] ChainClientError),
}

impl WalletError {
    /// Check if the caller may reasonably retry the operation
    pub fn is_retryable(&self) -> bool {
        match self {
            WalletError::NonceFetchFailed { source, .. }
            | WalletError::SubmissionFailed { source, .. }
            | WalletError::CallFailed(source) => matches!(
                source,
                ChainClientError::Transport { .. } | ChainClientError::Timeout { .. }
            ),
            _ => false,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            WalletError::InvalidKey(_) => "invalid_key",
            WalletError::NonceFetchFailed { .. } => "nonce_fetch",
            WalletError::SigningFailed { .. } => "signing",
            WalletError::SubmissionFailed { .. } => "submission",
            WalletError::CallFailed(_) => "call",
        }
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;
