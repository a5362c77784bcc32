//! # tiue-db
//!
//! PostgreSQL storage for the TIUE mobile backend, using SQLx.
//!
//! - Connection pool management and embedded migrations
//! - Repository pattern for news, events, groups, schedule and users
//! - Hashed local sessions for directory tokens
//!
//! ## Example
//!
//! ```ignore
//! use tiue_db::{Database, NewsRepository, Repository};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let repo = NewsRepository::new(db.pool().clone());
//! let latest = repo.find_all(20, 0).await?;
//! ```

pub mod academics;
pub mod events;
pub mod groups;
pub mod news;
pub mod pool;
pub mod repository;
pub mod schedule;
pub mod sessions;
pub mod users;

// Re-exports
pub use academics::AcademicsRepository;
pub use events::{
    register_for_event, unregister_from_event, CreateEventDto, EventRegistrations, EventRepository,
    EventRow, RegisterAttempt, RegisterError, RegistrationRow, UpdateEventDto,
};
pub use groups::{CreateGroupDto, GroupRepository, GroupRow, UpdateGroupDto};
pub use news::{CreateNewsDto, NewsRepository, NewsRow, UpdateNewsDto};
pub use pool::{Database, PoolStats};
pub use repository::{Pagination, Repository, RepositoryError, RepositoryResult};
pub use schedule::{CreateScheduleDto, ScheduleRepository, ScheduleRow, UpdateScheduleDto};
pub use sessions::{hash_token, SessionRepository};
pub use users::{
    CreateUserDto, DirectoryIdentity, ProfessorProfileRow, StudentProfileRow, UpdateUserDto,
    UserRepository, UserRow,
};
