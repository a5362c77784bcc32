//! Student search through the directory

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use tiue_db::UserRepository;
use tiue_directory::StudentFilter;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiResponse, AppState, BearerToken, QueryParams};

/// Raw query of `/api/auth/search/students`; numbers are parsed by hand so
/// bad values get a readable message
#[derive(Debug, Default, Deserialize)]
pub struct StudentSearchParams {
    pub q: Option<String>,
    pub group: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub limit: Option<String>,
}

impl StudentSearchParams {
    /// Split into the upstream query and the local filter
    pub fn into_filter(self, default_limit: usize) -> ApiResult<(Option<String>, StudentFilter)> {
        let query = non_blank(self.q);
        let group = raw_non_blank(self.group).or_else(|| raw_non_blank(self.department));

        if query.is_none() && group.is_none() {
            return Err(ApiError::bad_request(
                "Either a search query (q) or a group is required",
            ));
        }

        let course = match non_blank(self.course) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(course) if course > 0 => Some(course),
                _ => return Err(ApiError::bad_request("course must be a positive integer")),
            },
            None => None,
        };

        let limit = match non_blank(self.limit) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ApiError::bad_request("limit must be a positive integer")),
            },
            None => default_limit,
        };

        Ok((query, StudentFilter { group, course, limit }))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Group names are matched verbatim, so only a blank value counts as absent
fn raw_non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /api/auth/search/students
pub async fn search_students(
    token: BearerToken,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<StudentSearchParams>,
) -> ApiResult<impl IntoResponse> {
    let (query, filter) = params.into_filter(state.config.students.default_limit)?;

    let entries = state
        .directory
        .search_students(&token, query.as_deref())
        .await?;
    tracing::debug!(count = entries.len(), ?filter, "Directory search returned entries");

    let mut students = state.normalizer().normalize(entries, &filter);
    for student in &mut students {
        student.avatar = match avatar_url(&state, &student.username).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(username = %student.username, error = %e, "Avatar lookup failed");
                None
            }
        };
    }

    Ok(ApiResponse::ok(students))
}

/// Local avatar when one is stored, otherwise the directory image
pub async fn avatar_url(state: &AppState, username: &str) -> ApiResult<String> {
    if let Some(pool) = state.db.as_ref() {
        let user = UserRepository::new(pool.clone())
            .find_by_username(username)
            .await?;
        if let Some(avatar) = user.and_then(|u| u.avatar).filter(|a| !a.is_empty()) {
            return Ok(absolute_url(&state.config.server.public_base_url, &avatar));
        }
    }
    Ok(state.directory.avatar_url(username))
}

pub fn absolute_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiue_directory::{DirectoryEntry, StudentNormalizer};

    fn params(q: Option<&str>, group: Option<&str>) -> StudentSearchParams {
        StudentSearchParams {
            q: q.map(String::from),
            group: group.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_or_group_required() {
        let err = params(None, Some("  ")).into_filter(50).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_defaults_and_department_alias() {
        let search = StudentSearchParams {
            department: Some("BM_01 EN Year1".into()),
            ..Default::default()
        };
        let (query, filter) = search.into_filter(50).unwrap();
        assert_eq!(query, None);
        assert_eq!(filter.group.as_deref(), Some("BM_01 EN Year1"));
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.course, None);
    }

    #[test]
    fn test_group_is_kept_verbatim() {
        let search = StudentSearchParams {
            group: Some("BM_01 EN Year1 ".into()),
            ..Default::default()
        };
        let (_, filter) = search.into_filter(50).unwrap();
        assert_eq!(filter.group.as_deref(), Some("BM_01 EN Year1 "));

        let entries = vec![
            DirectoryEntry {
                uid: Some("exact".into()),
                department: Some("BM_01 EN Year1 ".into()),
                ..Default::default()
            },
            DirectoryEntry {
                uid: Some("trimmed".into()),
                department: Some("BM_01 EN Year1".into()),
                ..Default::default()
            },
        ];
        let matched: Vec<String> = StudentNormalizer::default()
            .normalize(entries, &filter)
            .into_iter()
            .map(|s| s.username)
            .collect();
        assert_eq!(matched, vec!["exact".to_string()]);

        let blank = StudentSearchParams {
            q: Some("ali".into()),
            group: Some("  ".into()),
            ..Default::default()
        };
        let (_, filter) = blank.into_filter(50).unwrap();
        assert_eq!(filter.group, None);
    }

    #[test]
    fn test_course_must_be_positive() {
        for bad in ["0", "-1", "first"] {
            let mut search = params(Some("ali"), None);
            search.course = Some(bad.into());
            assert!(search.into_filter(50).is_err(), "course {}", bad);
        }
    }

    #[test]
    fn test_limit_must_be_positive() {
        for bad in ["0", "-3", "ten"] {
            let mut search = params(Some("ali"), None);
            search.limit = Some(bad.into());
            assert!(search.into_filter(50).is_err(), "limit {}", bad);
        }

        let mut search = params(Some("ali"), None);
        search.limit = Some("5".into());
        search.course = Some("2".into());
        let (query, filter) = search.into_filter(50).unwrap();
        assert_eq!(query.as_deref(), Some("ali"));
        assert_eq!(filter.limit, 5);
        assert_eq!(filter.course, Some(2));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://mobile.tiue.uz/", "/media/avatars/a.png"),
            "https://mobile.tiue.uz/media/avatars/a.png"
        );
        assert_eq!(
            absolute_url("https://mobile.tiue.uz", "https://cdn.example/a.png"),
            "https://cdn.example/a.png"
        );
    }
}
