//! Block catalog, builder state, and theme asset generation.
//!
//! Everything in this crate is pure and synchronous: persistence and the
//! Shopify Admin API live in the `services` crate.

pub mod definitions;
pub mod generator;
pub mod schema;
pub mod store;
