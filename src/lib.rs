//! ade-rooms library
//!
//! A Rust library for reading live room availability from the ADE Direct
//! Planning timetable platform. Negotiates the platform's GWT-RPC session,
//! walks the room catalog, decodes the weekly occupancy grid and serves the
//! result through a TTL-governed snapshot cache.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
