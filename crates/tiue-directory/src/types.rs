//! Request and response types exchanged with the directory API

use serde::{Deserialize, Serialize};

/// Login credentials. Never persisted; `Debug` hides the password.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Access/refresh token pair issued by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Raw token response; both fields are optional upstream
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Error body shapes seen from the directory
#[derive(Debug, Default, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
}

impl UpstreamErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.message)
            .or(self.detail)
            .filter(|m| !m.trim().is_empty())
    }
}

/// Identity fields read from the student profile payload.
/// Unknown layouts decode to an empty summary.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileSummary {
    #[serde(default, alias = "fullName", alias = "name", alias = "display_name")]
    pub full_name: Option<String>,
    #[serde(default, alias = "mail")]
    pub email: Option<String>,
}

impl ProfileSummary {
    pub fn from_profile(profile: &serde_json::Value) -> Self {
        let source = match profile.get("data") {
            Some(data) if data.is_object() => data,
            _ => profile,
        };
        serde_json::from_value(source.clone()).unwrap_or_default()
    }
}

/// Paging for the active course list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseListQuery {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size", rename = "pageSize")]
    pub page_size: u32,
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    100
}

impl Default for CourseListQuery {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl CourseListQuery {
    /// Query pairs as the directory expects them, including skip/take
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let page = self.page.max(1);
        vec![
            ("lang", self.lang.clone()),
            ("page", page.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("skip", (page - 1).saturating_mul(self.page_size).to_string()),
            ("take", self.page_size.to_string()),
        ]
    }
}

/// Image forwarded to the directory as multipart field `image`
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Student number, numeric or textual depending on the directory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentNumber {
    Number(i64),
    Text(String),
}

impl Default for StudentNumber {
    fn default() -> Self {
        StudentNumber::Number(0)
    }
}

/// One raw entry of `/mobile/students`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectoryEntry {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub student_id: Option<StudentNumber>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_query_skip_take() {
        let query = CourseListQuery {
            lang: "ru".into(),
            page: 3,
            page_size: 10,
        };
        let pairs = query.to_pairs();
        assert!(pairs.contains(&("skip", "20".to_string())));
        assert!(pairs.contains(&("take", "10".to_string())));
        assert!(pairs.contains(&("lang", "ru".to_string())));
    }

    #[test]
    fn test_course_query_page_zero_treated_as_first() {
        let query = CourseListQuery {
            page: 0,
            ..Default::default()
        };
        assert!(query.to_pairs().contains(&("skip", "0".to_string())));
    }

    #[test]
    fn test_entry_tolerates_missing_and_null_fields() {
        let entry: DirectoryEntry =
            serde_json::from_str(r#"{"uid":"u1","mail":null,"student_id":"S-9"}"#).unwrap();
        assert_eq!(entry.uid.as_deref(), Some("u1"));
        assert_eq!(entry.mail, None);
        assert_eq!(entry.student_id, Some(StudentNumber::Text("S-9".into())));
    }

    #[test]
    fn test_profile_summary_reads_flat_and_wrapped_payloads() {
        let flat = ProfileSummary::from_profile(&serde_json::json!({
            "full_name": "SULAYMONOVA SABINA",
            "email": "s@tiue.uz",
            "gpa": 3.5
        }));
        assert_eq!(flat.full_name.as_deref(), Some("SULAYMONOVA SABINA"));
        assert_eq!(flat.email.as_deref(), Some("s@tiue.uz"));

        let wrapped = ProfileSummary::from_profile(&serde_json::json!({
            "data": {"name": "KARIMOV ALI", "mail": "a@tiue.uz"}
        }));
        assert_eq!(wrapped.full_name.as_deref(), Some("KARIMOV ALI"));
        assert_eq!(wrapped.email.as_deref(), Some("a@tiue.uz"));

        assert_eq!(
            ProfileSummary::from_profile(&serde_json::json!([1, 2])),
            ProfileSummary::default()
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "U22312".into(),
            password: "secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
