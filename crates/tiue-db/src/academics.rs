//! Grade and attendance reads behind the dashboard

use std::collections::HashMap;

use sqlx::PgPool;
use tiue_core::Id;
use tiue_models::academics::grade_percentage;
use tiue_models::{AttendanceStatus, GradeSummary};

use crate::repository::RepositoryResult;

#[derive(Clone)]
pub struct AcademicsRepository {
    pool: PgPool,
}

impl AcademicsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Percentages of every grade of a student
    pub async fn grade_summary(&self, student_id: Id) -> RepositoryResult<GradeSummary> {
        let rows = sqlx::query_as::<_, (f64, f64)>(
            "SELECT grade_value, max_value FROM grades WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let percentages: Vec<f64> = rows
            .into_iter()
            .filter_map(|(value, max)| grade_percentage(value, max))
            .collect();

        Ok(GradeSummary::from_percentages(&percentages))
    }

    /// Average raw grade per schedule slot for one student
    pub async fn average_grades_by_schedule(
        &self,
        student_id: Id,
    ) -> RepositoryResult<HashMap<Id, f64>> {
        let rows = sqlx::query_as::<_, (i64, f64)>(
            r#"
            SELECT schedule_id, AVG(grade_value)::DOUBLE PRECISION
            FROM grades
            WHERE student_id = $1
            GROUP BY schedule_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Attendance marks of a student; unknown status text is skipped
    pub async fn attendance_statuses(&self, student_id: Id) -> RepositoryResult<Vec<AttendanceStatus>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT status FROM attendance WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|status| match status.parse::<AttendanceStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::warn!(student_id, error = %e, "Skipping attendance record");
                    None
                }
            })
            .collect())
    }
}
