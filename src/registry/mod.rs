//! Package index registry
//!
//! Fetches package indexes from their URLs and keeps them in the index cache.

pub mod cache;
pub mod client;

pub use cache::IndexCache;
pub use client::{IndexClient, UpdateReport};
