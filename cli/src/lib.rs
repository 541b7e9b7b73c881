//! Command-line front end for the blogdesk admin client.
//!
//! The binary lives in `main.rs`; argument definitions, command handlers
//! and output helpers are exposed here so they can be tested.

pub mod cli;
pub mod commands;
pub mod utils;
