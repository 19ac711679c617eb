//! Courier Storage - Persistence layer
//!
//! This crate provides the campaign and delivery-event stores behind
//! narrow async contracts, with a PostgreSQL backend for production and an
//! in-memory backend for development and tests.

pub mod db;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use db::DatabasePool;
pub use memory::{MemoryCampaignStore, MemoryEventStore};
pub use models::*;
pub use postgres::{PgCampaignStore, PgEventStore};
pub use store::{CampaignStore, EventStore};
