//! Configuration management
//!
//! Node settings come from built-in defaults, an optional TOML file and the
//! environment, in that order of precedence. Command-line flags are applied
//! on top by the binary.

pub mod settings;

pub use settings::Config;
