//! Utility modules shared by the rewriting engine.

pub mod css;
