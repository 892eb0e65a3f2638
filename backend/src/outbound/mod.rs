//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits for various infrastructure concerns:
//!
//! - **kv**: in-memory and Redis-backed key-value stores
//! - **spotify**: OAuth provider and Web API client
//! - **public_page**: plain HTTP fetches of public context pages
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod kv;
pub mod public_page;
pub mod spotify;
