//! User repository
//!
//! Local users with their optional student or professor profile. Users are
//! created by administrators or mirrored from the directory on login.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tiue_core::Id;
use tiue_models::UserRole;

use crate::repository::{expect_deleted, not_found, Repository, RepositoryError, RepositoryResult};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role, avatar, \
                            is_active, created_at, updated_at";

/// User database entity
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Unknown role text is treated as the least privileged role
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }

    /// "First Last", trimmed; empty when neither is set
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentProfileRow {
    pub user_id: i64,
    pub student_id: String,
    pub faculty: String,
    pub course: i32,
    pub group_id: Option<i64>,
    pub gpa: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfessorProfileRow {
    pub user_id: i64,
    pub employee_id: String,
    pub department: String,
    pub title: String,
    pub subjects: Vec<String>,
}

/// DTO for creating a user; profile fields are required depending on the role
#[derive(Debug, Clone, Default)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub avatar: Option<String>,

    pub student_id: Option<String>,
    pub faculty: Option<String>,
    pub course: Option<i32>,
    pub group_id: Option<Id>,

    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub subjects: Vec<String>,
}

impl CreateUserDto {
    /// Profile fields the role requires but the DTO lacks
    pub fn missing_profile_fields(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map(str::trim).unwrap_or_default().is_empty()
        }

        let mut missing = Vec::new();
        match self.role {
            UserRole::Student => {
                if blank(&self.student_id) {
                    missing.push("student_id");
                }
                if blank(&self.faculty) {
                    missing.push("faculty");
                }
                if self.course.is_none() {
                    missing.push("course");
                }
                if self.group_id.is_none() {
                    missing.push("group_id");
                }
            }
            UserRole::Professor => {
                if blank(&self.employee_id) {
                    missing.push("employee_id");
                }
                if blank(&self.department) {
                    missing.push("department");
                }
            }
            UserRole::Admin => {}
        }
        missing
    }
}

/// DTO for updating a user
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub avatar: Option<String>,
    pub is_active: Option<bool>,
}

/// Identity mirrored from the directory at login
#[derive(Debug, Clone, Default)]
pub struct DirectoryIdentity {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Force the admin role (configured admin usernames)
    pub admin: bool,
}

/// User repository implementation
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Insert or refresh the local mirror of a directory account
    ///
    /// Blank directory values never overwrite stored ones; the stored role is
    /// kept unless the identity is a configured admin.
    pub async fn upsert_from_directory(&self, identity: &DirectoryIdentity) -> RepositoryResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, created_at, updated_at)
            VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, ''),
                    CASE WHEN $5 THEN 'admin' ELSE 'student' END, NOW(), NOW())
            ON CONFLICT (username) DO UPDATE SET
                email = COALESCE(NULLIF(EXCLUDED.email, ''), users.email),
                first_name = COALESCE(NULLIF(EXCLUDED.first_name, ''), users.first_name),
                last_name = COALESCE(NULLIF(EXCLUDED.last_name, ''), users.last_name),
                role = CASE WHEN $5 THEN 'admin' ELSE users.role END,
                updated_at = NOW()
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn student_profile(&self, user_id: Id) -> RepositoryResult<Option<StudentProfileRow>> {
        let row = sqlx::query_as::<_, StudentProfileRow>(
            r#"
            SELECT user_id, student_id, faculty, course, group_id, gpa
            FROM student_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn professor_profile(&self, user_id: Id) -> RepositoryResult<Option<ProfessorProfileRow>> {
        let row = sqlx::query_as::<_, ProfessorProfileRow>(
            r#"
            SELECT user_id, employee_id, department, title, subjects
            FROM professor_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl Repository<UserRow, CreateUserDto, UpdateUserDto> for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY username ASC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, dto: CreateUserDto) -> RepositoryResult<UserRow> {
        let missing = dto.missing_profile_fields();
        if !missing.is_empty() {
            return Err(RepositoryError::Validation(format!(
                "{} required for role {}",
                missing.join(", "),
                dto.role
            )));
        }

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, avatar, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&dto.username)
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.role.as_str())
        .bind(&dto.avatar)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "Username has already been taken"))?;

        match dto.role {
            UserRole::Student => {
                sqlx::query(
                    r#"
                    INSERT INTO student_profiles (user_id, student_id, faculty, course, group_id)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(user.id)
                .bind(&dto.student_id)
                .bind(&dto.faculty)
                .bind(dto.course)
                .bind(dto.group_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::from_constraint(e, "Student ID has already been taken"))?;
            }
            UserRole::Professor => {
                sqlx::query(
                    r#"
                    INSERT INTO professor_profiles (user_id, employee_id, department, title, subjects)
                    VALUES ($1, $2, $3, COALESCE($4, ''), $5)
                    "#,
                )
                .bind(user.id)
                .bind(&dto.employee_id)
                .bind(&dto.department)
                .bind(&dto.title)
                .bind(&dto.subjects)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::from_constraint(e, "Employee ID has already been taken"))?;
            }
            UserRole::Admin => {}
        }

        tx.commit().await?;
        tracing::info!(user_id = user.id, role = %dto.role, "User created");

        Ok(user)
    }

    async fn update(&self, id: Id, dto: UpdateUserDto) -> RepositoryResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($1, email),
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                role = COALESCE($4, role),
                avatar = COALESCE($5, avatar),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.role.map(|r| r.as_str()))
        .bind(&dto.avatar)
        .bind(dto.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found("User", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_deleted(result.rows_affected(), "User", id)
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str, role: &str) -> UserRow {
        UserRow {
            id: 1,
            username: "u22312".to_string(),
            email: "u22312@tiue.uz".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role: role.to_string(),
            avatar: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user("Umar", "Matyokubov", "student").full_name(), "Umar Matyokubov");
        assert_eq!(user("", "Madina", "student").full_name(), "Madina");
        assert_eq!(user("", "", "student").full_name(), "");
    }

    #[test]
    fn test_unknown_role_falls_back_to_student() {
        assert_eq!(user("a", "b", "superuser").role(), UserRole::Student);
        assert!(user("a", "b", "admin").is_admin());
    }

    #[test]
    fn test_student_requires_profile_fields() {
        let dto = CreateUserDto {
            username: "u1".into(),
            role: UserRole::Student,
            student_id: Some("  ".into()),
            course: Some(2),
            ..Default::default()
        };
        assert_eq!(
            dto.missing_profile_fields(),
            vec!["student_id", "faculty", "group_id"]
        );
    }

    #[test]
    fn test_professor_requires_profile_fields() {
        let dto = CreateUserDto {
            username: "p1".into(),
            role: UserRole::Professor,
            employee_id: Some("E-1".into()),
            ..Default::default()
        };
        assert_eq!(dto.missing_profile_fields(), vec!["department"]);
    }

    #[test]
    fn test_admin_needs_no_profile() {
        let dto = CreateUserDto {
            username: "root".into(),
            role: UserRole::Admin,
            ..Default::default()
        };
        assert!(dto.missing_profile_fields().is_empty());
    }
}
