#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Shared building blocks for toradmin: the torrc line model and its validators,
//! bandwidth conversions, the control panel's own settings, and API models.

pub mod bandwidth;
pub mod config;
pub mod models;
pub mod torrc;
