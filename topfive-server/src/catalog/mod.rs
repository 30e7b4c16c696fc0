//! External music catalog integration: search client and match scoring

pub mod client;
pub mod matcher;

pub use client::{CatalogClient, TrackResolver};
