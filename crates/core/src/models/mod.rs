//! Data models for rewards entities

mod aggregate;
mod challenge;
mod envelope;
mod leaderboard;
mod outcome;
mod payout;
mod reward;
mod spin;
mod wallet;

pub use aggregate::*;
pub use challenge::*;
pub use envelope::*;
pub use leaderboard::*;
pub use outcome::*;
pub use payout::*;
pub use reward::*;
pub use spin::*;
pub use wallet::*;
