//! # Configuration
//!
//! Settings of the control panel process: listen address, logging, the torrc
//! it manages, the tor service it controls, and auth/session parameters.

pub mod server;

pub use server::{Config, ConfigError, LogFormat};
