//! Trading logic: configuration, the ordered-markets ledger and the
//! copy-trading engine.

mod config;
mod copy_engine;
mod ledger;

pub use config::{CopyConfig, DedupPolicy};
pub use copy_engine::CopyTradeEngine;
