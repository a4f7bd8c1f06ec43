//! Nonce Wallet - serialized Ethereum transaction submission
//!
//! A [`TransactionSender`] holds one private key and submits transactions for
//! its address one at a time: each send takes the address lock, reads the
//! pending nonce from the node, signs and broadcasts before letting the next
//! send in. Signing and node access sit behind the [`TransactionSigner`] and
//! [`ChainClient`] traits.

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod tx;

pub use chain::{ChainClient, EthersChainClient};
pub use config::Settings;
pub use error::{ChainClientError, SignerError, WalletError, WalletResult};
pub use tx::{
    AddressLocks, LocalSigner, PrivateKey, SenderConfig, TransactionSender, TransactionSigner,
};
