pub mod config;
pub mod nonce;
pub mod reader;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod writer;

pub use config::LedgerConfig;
pub use reader::{ChainLedgerReader, UnconfiguredLedgerReader};
pub use rpc::{HttpLedgerRpc, LedgerRpc, RpcError};
pub use signer::TransactionSigner;
pub use writer::{ChainAnchorWriter, RetryPolicy, UnconfiguredAnchorWriter};
