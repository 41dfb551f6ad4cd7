//! Local gates checked before an action is attempted

mod challenge;
mod spin;
mod withdrawal;

pub use challenge::*;
pub use spin::*;
pub use withdrawal::*;
