//! Rewards Networking - backend seam, HTTP client, and failure classification

pub mod api;
pub mod backend;
pub mod http;

pub use backend::RewardsBackend;
pub use http::{RewardsClient, DEFAULT_BASE_URL};
