//! Command-line interface components
//!
//! This module contains CLI-specific code for the ade-rooms application,
//! including argument parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, FreeArgs, GlobalArgs, RefreshArgs, RoomsArgs};
pub use commands::{handle_free, handle_info, handle_refresh, handle_rooms};
