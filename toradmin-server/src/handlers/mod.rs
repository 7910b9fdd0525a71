pub mod auth;
pub mod bandwidth;
pub mod service;
pub mod setup;
pub mod torrc;
