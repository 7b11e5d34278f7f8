// src/fetch/mod.rs

//! Fetching and verifying source archives
//!
//! The digest check is a supply-chain control: a mismatch always fails the
//! operation, never logs and continues.

mod cache;
mod client;

pub use cache::SourceCache;
pub use client::{FileFetcher, Fetcher, HttpFetcher, SchemeFetcher};
