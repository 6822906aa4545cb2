//! HTTP boundary for the social service.

pub mod config;
pub mod server;
