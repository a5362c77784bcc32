//! # tiue-directory
//!
//! Client for the university directory API ("LDAP API") that owns student
//! accounts, courses, grades, attendance and messages.
//!
//! - [`DirectoryClient`]: one typed method per upstream endpoint, built once at startup
//! - [`students`]: reshaping of raw search entries into [`StudentRecord`]s

pub mod client;
pub mod endpoints;
pub mod error;
pub mod students;
pub mod types;

pub use client::DirectoryClient;
pub use endpoints::Endpoint;
pub use error::{DirectoryError, DirectoryResult};
pub use students::{StudentFilter, StudentNormalizer, StudentRecord};
pub use types::{CourseListQuery, Credentials, DirectoryEntry, ImageUpload, ProfileSummary, TokenPair};
