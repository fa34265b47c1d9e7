pub mod alert;
pub mod anchor;
pub mod error;
pub mod fingerprint;
pub mod in_memory_anchor_log;
pub mod in_memory_reading_store;
pub mod ingest_service;
pub mod ledger_entry;
pub mod reading;
pub mod reconcile;
pub mod repository;
pub mod summary_service;
pub mod validate;

pub use alert::*;
pub use anchor::*;
pub use error::*;
pub use fingerprint::*;
pub use in_memory_anchor_log::*;
pub use in_memory_reading_store::*;
pub use ingest_service::*;
pub use ledger_entry::*;
pub use reading::*;
pub use reconcile::*;
pub use repository::*;
pub use summary_service::*;
pub use validate::*;
