//! FOIAcquire - FOIA document acquisition and research system.
//!
//! Acquires a large, open-ended document corpus from a heterogeneous set of
//! public government sources, deduplicates it by content, extracts
//! searchable text, and maintains a durable catalog for downstream
//! retrieval tooling.

pub mod adapters;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod repository;
pub mod storage;
