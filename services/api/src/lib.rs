//! services/api/src/lib.rs
//!
//! The HTTP service around `reading_tracker_core`: configuration, the
//! PostgreSQL adapter, the web layer and the background statistics worker.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
pub mod worker;
