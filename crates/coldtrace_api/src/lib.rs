pub mod error;
pub mod ledger_handler;
pub mod server;
pub mod state;
pub mod summary_handler;
pub mod telemetry_handler;

pub use server::{router, serve};
pub use state::AppState;
