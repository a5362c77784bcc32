//! Home screen summary for the signed-in user

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tiue_core::Id;
use tiue_db::{
    AcademicsRepository, EventRepository, EventRow, NewsRepository, NewsRow, Repository,
    ScheduleRepository, UserRepository, UserRow,
};
use tiue_models::academics::{attendance_percentage, course_progress, DEFAULT_ATTENDANCE_PERCENT};
use tiue_models::UserRole;

use crate::error::ApiResult;
use crate::extractors::{ApiResponse, AppState, AuthenticatedUser};
use crate::handlers::students::absolute_url;

const IMPORTANT_NEWS_LIMIT: i64 = 3;
const UPCOMING_EVENTS_LIMIT: i64 = 5;
const GENERAL_COURSES_LIMIT: i64 = 5;
const GENERAL_COURSE_PROGRESS: f64 = 0.75;

#[derive(Debug, Default, Serialize)]
pub struct Dashboard {
    pub news: Vec<DashboardNews>,
    pub events: Vec<DashboardEvent>,
    pub courses: Vec<DashboardCourse>,
    pub gpa: f64,
    pub attendance: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardNews {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub date: String,
}

impl DashboardNews {
    fn new(row: &NewsRow, base: &str) -> Self {
        Self {
            id: row.id,
            title: row.title.clone(),
            description: row.summary(),
            image: row.image.as_deref().map(|i| absolute_url(base, i)),
            date: row.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardEvent {
    pub id: Id,
    pub title: String,
    pub date: String,
    pub image: Option<String>,
}

impl DashboardEvent {
    fn new(row: &EventRow, base: &str) -> Self {
        Self {
            id: row.id,
            title: row.title.clone(),
            date: row.date.format("%Y-%m-%d").to_string(),
            image: row.image.as_deref().map(|i| absolute_url(base, i)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardCourse {
    pub id: Id,
    pub name: String,
    pub progress: f64,
}

/// Rating shown to staff, who have no grades of their own
pub fn staff_gpa(role: UserRole) -> f64 {
    match role {
        UserRole::Professor => 4.5,
        UserRole::Admin => 4.8,
        UserRole::Student => 0.0,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// GET /api/users/dashboard
///
/// Any failure while assembling the data yields the empty dashboard.
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool()?;

    let dashboard = match load_dashboard(pool, &user, &state.config.server.public_base_url).await {
        Ok(dashboard) => {
            tracing::info!(username = %user.username, "Dashboard generated");
            dashboard
        }
        Err(e) => {
            tracing::error!(username = %user.username, error = %e, "Dashboard failed");
            Dashboard::default()
        }
    };

    Ok(ApiResponse::ok(dashboard))
}

async fn load_dashboard(pool: &PgPool, user: &UserRow, base: &str) -> ApiResult<Dashboard> {
    let news = NewsRepository::new(pool.clone())
        .find_important(IMPORTANT_NEWS_LIMIT)
        .await?
        .iter()
        .map(|row| DashboardNews::new(row, base))
        .collect();

    let events = EventRepository::new(pool.clone())
        .find_upcoming(Utc::now().date_naive(), UPCOMING_EVENTS_LIMIT)
        .await?
        .iter()
        .map(|row| DashboardEvent::new(row, base))
        .collect();

    let student = match user.role() {
        UserRole::Student => {
            UserRepository::new(pool.clone())
                .student_profile(user.id)
                .await?
        }
        _ => None,
    };

    let schedule = ScheduleRepository::new(pool.clone());
    let academics = AcademicsRepository::new(pool.clone());

    let (courses, gpa, attendance) = match student {
        Some(profile) => {
            let averages = academics.average_grades_by_schedule(profile.user_id).await?;
            let lessons = match profile.group_id {
                Some(group_id) => schedule.find_by_group(group_id).await?,
                None => Vec::new(),
            };
            let courses = lessons
                .into_iter()
                .map(|lesson| DashboardCourse {
                    progress: course_progress(averages.get(&lesson.id).copied()),
                    id: lesson.id,
                    name: lesson.subject,
                })
                .collect();

            let gpa = academics
                .grade_summary(profile.user_id)
                .await?
                .gpa(profile.gpa);

            let statuses = academics.attendance_statuses(profile.user_id).await?;
            let attendance =
                attendance_percentage(&statuses).unwrap_or(DEFAULT_ATTENDANCE_PERCENT);

            (courses, gpa, attendance)
        }
        None => {
            let courses = schedule
                .find_all(GENERAL_COURSES_LIMIT, 0)
                .await?
                .into_iter()
                .map(|lesson| DashboardCourse {
                    id: lesson.id,
                    name: lesson.subject,
                    progress: GENERAL_COURSE_PROGRESS,
                })
                .collect();
            (courses, staff_gpa(user.role()), DEFAULT_ATTENDANCE_PERCENT)
        }
    };

    Ok(Dashboard {
        news,
        events,
        courses,
        gpa: round1(gpa),
        attendance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_staff_gpa() {
        assert_eq!(staff_gpa(UserRole::Professor), 4.5);
        assert_eq!(staff_gpa(UserRole::Admin), 4.8);
        assert_eq!(staff_gpa(UserRole::Student), 0.0);
    }

    #[test]
    fn test_empty_dashboard_shape() {
        let value = serde_json::to_value(Dashboard::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"news": [], "events": [], "courses": [], "gpa": 0.0, "attendance": 0.0})
        );
    }

    #[test]
    fn test_news_card_uses_summary() {
        let created = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let row = NewsRow {
            id: 1,
            title: "Graduation".into(),
            subtitle: String::new(),
            content: "x".repeat(150),
            image: Some("news/grad.jpg".into()),
            author_id: None,
            category: "announcement".into(),
            icon: "school-outline".into(),
            is_important: true,
            created_at: created,
            updated_at: created,
            author_name: None,
        };
        let card = DashboardNews::new(&row, "https://mobile.tiue.uz");
        assert_eq!(card.description.len(), 103);
        assert_eq!(card.date, "2025-05-20");
        assert_eq!(card.image.as_deref(), Some("https://mobile.tiue.uz/news/grad.jpg"));
    }

    #[test]
    fn test_event_card_date() {
        let created = Utc::now();
        let row = EventRow {
            id: 2,
            title: "Open day".into(),
            description: String::new(),
            location: "Main hall".into(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            time: "10:00".into(),
            category: "university".into(),
            max_participants: None,
            current_participants: 0,
            image: None,
            news_id: None,
            created_by: None,
            created_at: created,
            updated_at: created,
            created_by_name: None,
        };
        let card = DashboardEvent::new(&row, "https://mobile.tiue.uz");
        assert_eq!(card.date, "2025-09-01");
        assert_eq!(card.image, None);
    }
}
