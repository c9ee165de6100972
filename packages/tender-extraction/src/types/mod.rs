//! Data types for the tender extraction library.

pub mod classification;
pub mod config;
pub mod context;
pub mod cost_table;
pub mod financial;
pub mod record;
pub mod warning;
