//! Common types used throughout the backend

/// Primary key type for local tables
pub type Id = i64;
