pub mod auth;
pub mod request_context;
pub mod security;
