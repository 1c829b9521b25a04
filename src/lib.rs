//! Choropleth binding and geospatial filtering for national waste statistics.

pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod map;
pub mod names;
pub mod table;
pub mod types;

pub use error::{MapError, Result};
