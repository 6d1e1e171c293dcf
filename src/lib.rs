pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod oracle;
pub mod orchestration;

pub use config::Config;
pub use datasource::{HttpWarehouse, MockWarehouse, Warehouse, WarehouseError};
pub use domain::{
    Action, Decimal, Event, MarketId, OutcomeToken, RawEvent, RawKind, TimeMs, TokenId, TradeRole,
    Wallet,
};
pub use engine::{
    compute_report, DedupStrategy, Diagnostics, EngineOptions, Report, ReportingPolicy,
};
pub use oracle::{MarkBook, PayoutVector, ResolutionCache, TokenRegistry};
pub use orchestration::{BatchCoordinator, BatchError};
