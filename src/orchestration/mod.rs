//! Batch orchestration: warehouse preload and fan-out replay across wallets.

pub mod batch;

pub use batch::{BatchCoordinator, BatchError};
