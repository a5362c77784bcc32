//! # tiue-models
//!
//! Domain models for the TIUE mobile backend.
//!
//! Category and role enums are stored as plain text columns; every enum here
//! round-trips through `as_str` / `FromStr` with the same spelling used on the wire.

pub use tiue_core::Id;

#[macro_use]
mod text_enum;

pub mod academics;
pub mod event;
pub mod news;
pub mod schedule;
pub mod user;

pub use academics::{AttendanceStatus, GradeSummary};
pub use event::{parse_event_date, EventCategory, RegistrationError};
pub use news::{NewsCategory, NewsIcon};
pub use schedule::{LessonType, Weekday};
pub use user::UserRole;

/// Error returned when a text column holds an unknown enum value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
