//! Unit tests for macroalpha

pub mod consolidator;
pub mod queries;
