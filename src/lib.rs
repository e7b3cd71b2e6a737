pub mod charts;
pub mod consolidator;
pub mod database;
pub mod error;
pub mod export;
pub mod importers;
pub mod models;
pub mod pipeline;
pub mod queries;
pub mod sheet;
pub mod utils;

pub use error::{EtlError, Result};
