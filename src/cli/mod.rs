//! Command-line interface
//!
//! Startup flags and the line console. The console only calls the node's
//! public operations and prints what they return.

pub mod commands;

pub use commands::{Command, ConsoleLine, Opt};
