//! AI Consult — marketing & PR consultation service.

pub mod assessment;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod profile;
pub mod server;
pub mod session;
pub mod store;
