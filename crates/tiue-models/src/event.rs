//! Event domain rules

use chrono::NaiveDate;

text_enum! {
    /// Event category
    EventCategory ("event category") {
        University => "university",
        Academic => "academic",
        Sports => "sports",
        Cultural => "cultural",
        Social => "social",
        Club => "club",
        Other => "other",
    }
}

impl Default for EventCategory {
    fn default() -> Self {
        EventCategory::University
    }
}

/// Why a registration attempt was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Event not found")]
    EventNotFound,
    #[error("You are already registered for this event.")]
    AlreadyRegistered,
    #[error("The maximum number of participants has been reached.")]
    CapacityReached,
    #[error("You are not registered for this event.")]
    NotRegistered,
}

/// Whether one more participant fits. `max_participants = None` means unlimited.
pub fn has_capacity(current_participants: i32, max_participants: Option<i32>) -> bool {
    match max_participants {
        Some(max) => current_participants < max,
        None => true,
    }
}

/// Refuse a registration that would push the counter past the limit
pub fn check_capacity(
    current_participants: i32,
    max_participants: Option<i32>,
) -> Result<(), RegistrationError> {
    if has_capacity(current_participants, max_participants) {
        Ok(())
    } else {
        Err(RegistrationError::CapacityReached)
    }
}

/// Parse an event date given as `DD.MM.YYYY` or `YYYY-MM-DD`
pub fn parse_event_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    let parsed = if value.contains('.') {
        NaiveDate::parse_from_str(value, "%d.%m.%Y")
    } else if value.contains('-') {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
    } else {
        return Err("Invalid date format. Use DD.MM.YYYY or YYYY-MM-DD".to_string());
    };
    parsed.map_err(|_| "Invalid date format. Use DD.MM.YYYY".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_unlimited() {
        assert!(has_capacity(1000, None));
        assert!(check_capacity(0, None).is_ok());
    }

    #[test]
    fn test_capacity_limit_reached() {
        assert!(has_capacity(9, Some(10)));
        assert!(!has_capacity(10, Some(10)));
        assert_eq!(
            check_capacity(10, Some(10)),
            Err(RegistrationError::CapacityReached)
        );
    }

    #[test]
    fn test_parse_event_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(parse_event_date("14.03.2025").unwrap(), expected);
        assert_eq!(parse_event_date("2025-03-14").unwrap(), expected);
        assert!(parse_event_date("14/03/2025").is_err());
        assert!(parse_event_date("31.02.2025").is_err());
    }
}
