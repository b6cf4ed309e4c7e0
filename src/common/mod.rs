//! # Common Components
//!
//! Shared utilities used by the library and the command-line tool.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration parsing
//! - [`logging`]: logger initialisation

pub mod config;
pub mod logging;
