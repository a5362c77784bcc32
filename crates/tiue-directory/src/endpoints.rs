//! Upstream path table

use reqwest::Method;

/// Fixed directory API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Refresh,
    Profile,
    Courses,
    Grades,
    Attendance,
    Messages,
    Image,
    Students,
}

impl Endpoint {
    pub const fn path(&self) -> &'static str {
        match self {
            Endpoint::Login => "/mobile/login",
            Endpoint::Refresh => "/mobile/refresh",
            Endpoint::Profile => "/mobile/data-student-profile",
            Endpoint::Courses => "/mobile/active-course-list",
            Endpoint::Grades => "/mobile/course-grades-list",
            Endpoint::Attendance => "/mobile/course-attendance-list",
            Endpoint::Messages => "/mobile/messages-list",
            Endpoint::Image => "/mobile/img",
            Endpoint::Students => "/mobile/students",
        }
    }

    /// The profile and messages lists are POST upstream even though they only read
    pub fn method(&self) -> Method {
        match self {
            Endpoint::Login
            | Endpoint::Refresh
            | Endpoint::Profile
            | Endpoint::Messages
            | Endpoint::Image => Method::POST,
            Endpoint::Courses | Endpoint::Grades | Endpoint::Attendance | Endpoint::Students => {
                Method::GET
            }
        }
    }

    pub fn requires_bearer(&self) -> bool {
        !matches!(self, Endpoint::Login | Endpoint::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_endpoints_are_public() {
        assert!(!Endpoint::Login.requires_bearer());
        assert!(!Endpoint::Refresh.requires_bearer());
        assert!(Endpoint::Students.requires_bearer());
    }

    #[test]
    fn test_methods() {
        assert_eq!(Endpoint::Profile.method(), Method::POST);
        assert_eq!(Endpoint::Courses.method(), Method::GET);
        assert_eq!(Endpoint::Students.path(), "/mobile/students");
    }
}
