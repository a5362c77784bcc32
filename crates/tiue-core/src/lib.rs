//! # tiue-core
//!
//! Core types and utilities for the TIUE mobile backend.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Validation error collection
//! - Shared type aliases
//! - Configuration types and environment loading

pub mod config;
pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
