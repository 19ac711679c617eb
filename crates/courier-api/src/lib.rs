//! Courier API - REST API server
//!
//! This crate provides the REST API surface for Courier: campaign
//! management and dispatch, provider delivery webhooks, and health
//! probes.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
