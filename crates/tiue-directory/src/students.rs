//! Student record normalization
//!
//! Turns raw `/mobile/students` entries into the app's student shape: names are
//! split and title-cased, and a course year is inferred from the group name the
//! directory stores in `department`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::{DirectoryEntry, StudentNumber};

/// Department reported when the directory has none
pub const UNKNOWN_DEPARTMENT: &str = "no info";

/// Status reported when the directory has none
pub const DEFAULT_STATUS: &str = "Students";

pub const DEFAULT_COURSE_YEAR: u32 = 1;

pub const MAX_COURSE_YEAR: u32 = 4;

// `BM_23 ...` style intake suffix
static INTAKE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z]+)_(\d{2})(?:[^0-9]|$)").expect("valid regex"));

static YEAR_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"_Y(\d)_").expect("valid regex"));

static YEAR_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Year\s?(\d)").expect("valid regex"));

/// Normalized student, derived per request and never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub group_name: String,
    pub department: String,
    pub course_year: u32,
    pub status: String,
    pub student_id: StudentNumber,
    pub avatar: Option<String>,
}

/// Filters applied to search results before truncation
#[derive(Debug, Clone, Default)]
pub struct StudentFilter {
    /// Exact department match on the raw string
    pub group: Option<String>,
    pub course: Option<u32>,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct StudentNormalizer {
    reference_year: u32,
}

impl Default for StudentNormalizer {
    fn default() -> Self {
        Self { reference_year: 25 }
    }
}

impl StudentNormalizer {
    pub fn new(reference_year: u32) -> Self {
        Self { reference_year }
    }

    /// Infer the course year from a group name, first matching pattern wins
    pub fn infer_course_year(&self, department: &str) -> u32 {
        if let Some(caps) = INTAKE_SUFFIX.captures(department) {
            if let Ok(suffix) = caps[2].parse::<i64>() {
                let course = i64::from(self.reference_year) - suffix + 1;
                if (1..=i64::from(MAX_COURSE_YEAR)).contains(&course) {
                    return course as u32;
                }
            }
        }

        for pattern in [&*YEAR_MARKER, &*YEAR_WORD] {
            if let Some(digit) = pattern
                .captures(department)
                .and_then(|caps| caps[1].parse::<u32>().ok())
            {
                return digit;
            }
        }

        DEFAULT_COURSE_YEAR
    }

    pub fn normalize_entry(&self, entry: DirectoryEntry) -> StudentRecord {
        let department = entry
            .department
            .unwrap_or_else(|| UNKNOWN_DEPARTMENT.to_string());
        let full_name = entry.display_name.unwrap_or_default();
        let (first_name, last_name) = split_display_name(&full_name);
        let uid = entry.uid.unwrap_or_default();

        StudentRecord {
            id: uid.clone(),
            username: uid,
            email: entry.mail.unwrap_or_default(),
            first_name,
            last_name,
            course_year: self.infer_course_year(&department),
            group_name: department.clone(),
            department,
            full_name,
            status: entry.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            student_id: entry.student_id.unwrap_or_default(),
            avatar: None,
        }
    }

    /// Normalize, filter and truncate, preserving upstream order
    pub fn normalize(
        &self,
        entries: Vec<DirectoryEntry>,
        filter: &StudentFilter,
    ) -> Vec<StudentRecord> {
        entries
            .into_iter()
            .map(|entry| self.normalize_entry(entry))
            .filter(|record| match filter.group.as_deref() {
                Some(group) => record.department == group,
                None => true,
            })
            .filter(|record| match filter.course {
                Some(course) => record.course_year == course,
                None => true,
            })
            .take(filter.limit)
            .collect()
    }
}

/// Lowercase every word, then uppercase its first letter
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Search entries are "GIVEN SURNAME"; a lone token is taken as the surname
pub fn split_display_name(display_name: &str) -> (String, String) {
    let tokens: Vec<&str> = display_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (String::new(), title_case(only)),
        [first, rest @ ..] => (title_case(first), title_case(&rest.join(" "))),
    }
}

/// Profile names are "SURNAME GIVEN PATRONYMIC"
pub fn split_profile_name(full_name: &str) -> (String, String) {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (title_case(only), title_case(only)),
        [surname, given, ..] => (title_case(given), title_case(surname)),
    }
}
