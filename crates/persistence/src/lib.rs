//! Rewards Persistence - aggregate cache and SQLite payout journal

pub mod cache;
pub mod sqlite;

pub use cache::{AggregateStore, Freshness, Slice, StoreTtls, StoreView};
pub use sqlite::Database;
