//! CLI command implementations.

pub mod common;
pub mod gates;
pub mod lower;
pub mod params;
