//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel
//! - **memory**: in-process tables for development runs and tests
//! - **cache**: TTL stores for the generation result bridge
//! - **notify**: SMS and email delivery
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod cache;
pub mod memory;
pub mod notify;
pub mod persistence;
