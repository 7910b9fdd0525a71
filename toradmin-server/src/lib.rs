#![cfg_attr(not(test), forbid(unsafe_code))]

//! HTTP control panel for a local tor daemon: torrc editing, hidden service
//! listing, bandwidth conversion and service control behind an admin login.

pub mod app_state;
pub mod auth;
pub mod handlers;
pub mod http;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
mod tracer;
