//! API request handlers

pub mod auth;
pub mod dashboard;
pub mod events;
pub mod groups;
pub mod news;
pub mod schedule;
pub mod students;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Keeps an explicit `null` apart from a missing field: missing stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
