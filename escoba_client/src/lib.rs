//! Internal modules for the Escoba client.
//!
//! This library provides the HTTP transport, configuration, command parsing
//! and the interactive console used by the escoba_client binary.

pub mod api_client;
pub mod commands;
pub mod config;
pub mod console;
pub mod logging;
