//! Schedule enums

text_enum! {
    /// Kind of lesson in a timetable slot
    LessonType ("lesson type") {
        Lecture => "lecture",
        Practice => "practice",
        Lab => "lab",
        Seminar => "seminar",
    }
}

impl Default for LessonType {
    fn default() -> Self {
        LessonType::Lecture
    }
}

text_enum! {
    /// Teaching day. The Russian day names used by older clients are accepted on input.
    Weekday ("weekday") {
        Monday => "monday" | "Понедельник",
        Tuesday => "tuesday" | "Вторник",
        Wednesday => "wednesday" | "Среда",
        Thursday => "thursday" | "Четверг",
        Friday => "friday" | "Пятница",
        Saturday => "saturday" | "Суббота",
    }
}

impl Weekday {
    /// Position in the teaching week, Monday = 1
    pub fn ordinal(&self) -> i16 {
        match self {
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }
}

/// Check a `#rrggbb` color string
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub const DEFAULT_COLOR: &str = "#6366f1";

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_weekday_accepts_russian_alias() {
        assert_eq!(Weekday::from_str("Среда").unwrap(), Weekday::Wednesday);
        let day: Weekday = serde_json::from_str("\"Пятница\"").unwrap();
        assert_eq!(day, Weekday::Friday);
        assert_eq!(day.as_str(), "friday");
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color(DEFAULT_COLOR));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("6366f1"));
        assert!(!is_hex_color("#6366fz"));
    }
}
