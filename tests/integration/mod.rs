//! Integration tests for macroalpha

pub mod financials;
pub mod pipeline;
