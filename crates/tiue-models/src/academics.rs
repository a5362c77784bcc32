//! Grades and attendance used by the dashboard

text_enum! {
    /// Attendance mark for one lesson
    AttendanceStatus ("attendance status") {
        Present => "present",
        Absent => "absent",
        Late => "late",
        Excused => "excused",
    }
}

impl AttendanceStatus {
    /// Present and late both count as attended
    pub fn counts_as_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

/// Reported when a student has no attendance records yet
pub const DEFAULT_ATTENDANCE_PERCENT: f64 = 85.0;

/// Attended share in percent, rounded to one decimal
pub fn attendance_percentage(records: &[AttendanceStatus]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let attended = records.iter().filter(|s| s.counts_as_attended()).count();
    let percent = attended as f64 / records.len() as f64 * 100.0;
    Some((percent * 10.0).round() / 10.0)
}

/// Grade percentage, `None` when the maximum is not positive
pub fn grade_percentage(value: f64, max_value: f64) -> Option<f64> {
    if max_value > 0.0 {
        Some(value / max_value * 100.0)
    } else {
        None
    }
}

/// Convert an average percentage to the 4.0 scale
pub fn gpa_from_percentage(avg_percentage: f64) -> f64 {
    if avg_percentage >= 90.0 {
        4.0
    } else if avg_percentage >= 80.0 {
        3.0
    } else if avg_percentage >= 70.0 {
        2.0
    } else if avg_percentage >= 60.0 {
        1.0
    } else {
        0.0
    }
}

/// Course progress in [0, 1] from an average grade on a 100-point scale
pub fn course_progress(avg_grade: Option<f64>) -> f64 {
    let progress = avg_grade.map(|avg| (avg / 100.0).min(1.0)).unwrap_or(0.0);
    (progress * 100.0).round() / 100.0
}

/// Aggregated grades of one student
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradeSummary {
    pub count: usize,
    pub avg_percentage: Option<f64>,
}

impl GradeSummary {
    pub fn from_percentages(percentages: &[f64]) -> Self {
        if percentages.is_empty() {
            return Self::default();
        }
        let total: f64 = percentages.iter().sum();
        Self {
            count: percentages.len(),
            avg_percentage: Some(total / percentages.len() as f64),
        }
    }

    /// GPA on the 4.0 scale; a stored positive GPA wins over the computed one
    pub fn gpa(&self, stored_gpa: f64) -> f64 {
        if stored_gpa > 0.0 {
            return stored_gpa;
        }
        self.avg_percentage.map(gpa_from_percentage).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::AttendanceStatus::*;

    #[test]
    fn test_attendance_percentage() {
        assert_eq!(attendance_percentage(&[]), None);
        assert_eq!(
            attendance_percentage(&[Present, Late, Absent]),
            Some(66.7)
        );
        assert_eq!(attendance_percentage(&[Excused, Absent]), Some(0.0));
    }

    #[test]
    fn test_gpa_thresholds() {
        assert_eq!(gpa_from_percentage(95.0), 4.0);
        assert_eq!(gpa_from_percentage(80.0), 3.0);
        assert_eq!(gpa_from_percentage(70.5), 2.0);
        assert_eq!(gpa_from_percentage(60.0), 1.0);
        assert_eq!(gpa_from_percentage(59.9), 0.0);
    }

    #[test]
    fn test_stored_gpa_wins() {
        let summary = GradeSummary::from_percentages(&[50.0, 70.0]);
        assert_eq!(summary.avg_percentage, Some(60.0));
        assert_eq!(summary.gpa(3.6), 3.6);
        assert_eq!(summary.gpa(0.0), 1.0);
        assert_eq!(GradeSummary::default().gpa(0.0), 0.0);
    }

    #[test]
    fn test_course_progress_is_capped() {
        assert_eq!(course_progress(None), 0.0);
        assert_eq!(course_progress(Some(87.456)), 0.87);
        assert_eq!(course_progress(Some(130.0)), 1.0);
    }

    #[test]
    fn test_grade_percentage() {
        assert_eq!(grade_percentage(45.0, 50.0), Some(90.0));
        assert_eq!(grade_percentage(1.0, 0.0), None);
    }
}
