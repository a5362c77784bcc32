//! API routes
//!
//! Every path is also served with a trailing slash, which the mobile client sends.

use axum::{
    routing::{get, post, MethodRouter},
    Router,
};

use crate::extractors::AppState;
use crate::handlers::{auth, dashboard, events, groups, news, schedule, students, users};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth_router())
        .merge(news_router())
        .merge(events_router())
        .merge(users_router())
        .merge(groups_router())
        .merge(schedule_router())
}

trait RouterExt {
    fn route_with_slash(self, path: &str, method_router: MethodRouter<AppState>) -> Self;
}

impl RouterExt for Router<AppState> {
    fn route_with_slash(self, path: &str, method_router: MethodRouter<AppState>) -> Self {
        self.route(path, method_router.clone())
            .route(&format!("{}/", path), method_router)
    }
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route_with_slash("/api/auth/test", get(auth::test))
        .route_with_slash("/api/auth/login", post(auth::login))
        .route_with_slash("/api/auth/refresh", post(auth::refresh))
        .route_with_slash("/api/auth/profile", get(auth::profile).post(auth::profile))
        .route_with_slash("/api/auth/me", get(auth::profile))
        .route_with_slash("/api/auth/courses", get(auth::courses))
        .route_with_slash("/api/auth/grades", get(auth::grades))
        .route_with_slash("/api/auth/attendance", get(auth::attendance))
        .route_with_slash("/api/auth/messages", post(auth::messages))
        .route_with_slash("/api/auth/upload", post(auth::upload))
        .route_with_slash("/api/auth/search/students", get(students::search_students))
        .route_with_slash("/api/auth/logout", post(auth::logout))
}

fn news_router() -> Router<AppState> {
    Router::new()
        .route_with_slash("/api/news", get(news::list_news).post(news::create_news))
        .route_with_slash(
            "/api/news/:id",
            get(news::get_news)
                .patch(news::update_news)
                .put(news::update_news)
                .delete(news::delete_news),
        )
}

fn events_router() -> Router<AppState> {
    Router::new()
        .route_with_slash("/api/events", get(events::list_events).post(events::create_event))
        .route_with_slash(
            "/api/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route_with_slash("/api/events/:id/register", post(events::register))
        .route_with_slash(
            "/api/events/:id/unregister",
            axum::routing::delete(events::unregister),
        )
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route_with_slash("/api/users", get(users::list_users).post(users::create_user))
        .route_with_slash("/api/users/dashboard", get(dashboard::dashboard))
        .route_with_slash("/api/users/avatar/:username", get(users::get_avatar))
        .route_with_slash(
            "/api/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

fn groups_router() -> Router<AppState> {
    Router::new()
        .route_with_slash("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route_with_slash(
            "/api/groups/:id",
            get(groups::get_group)
                .patch(groups::update_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
}

fn schedule_router() -> Router<AppState> {
    Router::new()
        .route_with_slash(
            "/api/schedule",
            get(schedule::list_schedule).post(schedule::create_schedule),
        )
        .route_with_slash(
            "/api/schedule/:id",
            get(schedule::get_schedule)
                .patch(schedule::update_schedule)
                .put(schedule::update_schedule)
                .delete(schedule::delete_schedule),
        )
}
