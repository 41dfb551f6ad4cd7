//! reqwest-backed implementation of the rewards backend

mod client;

pub use client::{RewardsClient, DEFAULT_BASE_URL};
