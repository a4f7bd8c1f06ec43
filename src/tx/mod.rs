//! Transaction submission module with per-address nonce serialization

mod nonce;
mod sender;
mod signer;

pub use nonce::{AddressLocks, NonceGuard};
pub use sender::{assemble_transaction, SenderConfig, TransactionSender};
pub use signer::{LocalSigner, PrivateKey, TransactionSigner};
