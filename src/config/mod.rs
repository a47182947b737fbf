//! Configuration for the reference resolution pipeline.
//!
//! `ResolverConfig` is constructed through a typestate builder so the
//! one required field (the base URL pattern links must match) cannot be
//! forgotten at compile time.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::ResolverConfigBuilder;
pub use types::ResolverConfig;
