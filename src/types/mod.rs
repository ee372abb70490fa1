// src/types/mod.rs
//! Foundational types: strongly-typed IDs and rich text primitives.

mod ids;
mod rich_text;

pub use ids::*;
pub use rich_text::*;
