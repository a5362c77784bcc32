//! User roles

text_enum! {
    /// Role of a local user account
    UserRole ("user role") {
        Student => "student",
        Professor => "professor",
        Admin => "admin",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Student
    }
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}
