//! Repository layer: entity-scoped database operations.

mod recipe;

pub use recipe::*;
