//! Library crate for guess-game-back, exposing modules for the binary and integration tests.

/// Remote game client.
pub mod client;
/// Configuration loading.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business logic.
pub mod services;
/// Shared application state.
pub mod state;
