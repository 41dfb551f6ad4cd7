//! SQLite database management

mod connection;
mod payouts;
mod settings;

pub use connection::Database;
pub use payouts::*;
pub use settings::*;
