//! Client-side checks that run before any network call

mod payout;

pub use payout::*;
