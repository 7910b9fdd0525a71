pub mod control;
pub mod setup;
pub mod torrc_service;
