pub mod config;
pub mod journal;
pub mod store;

pub use config::WalConfig;
pub use store::WalReadingStore;
