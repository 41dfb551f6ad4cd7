//! Classification of backend failures into user-facing outcomes

mod classify;

pub use classify::*;
