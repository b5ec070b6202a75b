//! Carbon agent: periodic region refresh plus the HTTP API over it

pub mod api;
pub mod config;
