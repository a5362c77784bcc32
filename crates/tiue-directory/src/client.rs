//! Directory API client
//!
//! Every operation binds to a fixed upstream path and method (see [`Endpoint`]),
//! attaches the caller's bearer token where the endpoint needs one, and returns
//! the upstream JSON unchanged on success.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tiue_core::config::DirectoryConfig;
use tracing::{debug, error, info, warn};

use crate::endpoints::Endpoint;
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{CourseListQuery, Credentials, DirectoryEntry, ImageUpload, TokenPair, TokenResponse};

/// Upstream page size used for student search
const SEARCH_PAGE_SIZE: u32 = 100;

/// HTTP client for the directory API
#[derive(Clone)]
pub struct DirectoryClient {
    client: Client,
    config: DirectoryConfig,
}

impl DirectoryClient {
    /// Build the client once at startup
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        if config.accept_invalid_certs {
            warn!(
                base_url = %config.base_url,
                "TLS certificate validation is disabled for the directory API"
            );
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| DirectoryError::Build(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Public avatar URL the directory serves for a username
    pub fn avatar_url(&self, username: &str) -> String {
        format!("{}/{}", self.config.url_for(Endpoint::Image.path()), username)
    }

    /// Send a JSON request to an upstream path
    ///
    /// Only GET and POST are supported. A 200 response with a JSON body is a
    /// success; everything else becomes a [`DirectoryError`].
    pub async fn call(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        headers: Option<HeaderMap>,
        query: Option<&[(&str, String)]>,
    ) -> DirectoryResult<Value> {
        let url = self.config.url_for(path);
        debug!(%method, %url, "Directory API request");

        let mut request = match method {
            Method::GET => self.client.get(&url),
            Method::POST => {
                let request = self.client.post(&url);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            }
            other => {
                error!(method = %other, "Unsupported HTTP method for directory API");
                return Err(DirectoryError::UnsupportedMethod(other.to_string()));
            }
        };

        request = request.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(headers) = headers {
            request = request.headers(headers);
        }
        if let Some(query) = query {
            request = request.query(query);
        }

        self.send(request, path).await
    }

    async fn call_endpoint(
        &self,
        endpoint: Endpoint,
        access_token: Option<&str>,
        body: Option<&Value>,
        query: Option<&[(&str, String)]>,
    ) -> DirectoryResult<Value> {
        let headers = match access_token {
            Some(token) if endpoint.requires_bearer() => Some(bearer_headers(token)?),
            _ => None,
        };
        self.call(endpoint.path(), endpoint.method(), body, headers, query)
            .await
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> DirectoryResult<Value> {
        let response = request.send().await.map_err(|e| {
            let err = DirectoryError::from_transport(e);
            error!(path, error = %err, "Directory API transport failure");
            err
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(DirectoryError::from_transport)?;

        if status == StatusCode::OK {
            serde_json::from_slice(&bytes).map_err(|e| {
                error!(path, error = %e, "Failed to decode directory JSON response");
                DirectoryError::InvalidJson
            })
        } else {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(path, status = status.as_u16(), %body, "Directory API error");
            Err(DirectoryError::Http { status, body })
        }
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, credentials: &Credentials) -> DirectoryResult<TokenPair> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });

        let result = self
            .call_endpoint(Endpoint::Login, None, Some(&body), None)
            .await;

        match &result {
            Ok(_) => info!(username = %credentials.username, "Directory login successful"),
            Err(e) => warn!(username = %credentials.username, error = %e, "Directory login failed"),
        }

        let response: TokenResponse = serde_json::from_value(result?)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        match (response.access_token, response.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Ok(TokenPair {
                access_token,
                refresh_token,
            }),
            _ => Err(DirectoryError::InvalidResponse(
                "login response is missing access_token or refresh_token".to_string(),
            )),
        }
    }

    /// Get a new access token. Keeps the old refresh token when the directory does not rotate it.
    pub async fn refresh_token(&self, refresh_token: &str) -> DirectoryResult<TokenPair> {
        let body = json!({ "refresh_token": refresh_token });
        let value = self
            .call_endpoint(Endpoint::Refresh, None, Some(&body), None)
            .await?;

        let response: TokenResponse = serde_json::from_value(value)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        let access_token = response.access_token.ok_or_else(|| {
            DirectoryError::InvalidResponse("refresh response is missing access_token".to_string())
        })?;

        info!("Directory token refresh successful");
        Ok(TokenPair {
            access_token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
        })
    }

    pub async fn get_profile(&self, access_token: &str) -> DirectoryResult<Value> {
        self.call_endpoint(Endpoint::Profile, Some(access_token), None, None)
            .await
    }

    pub async fn get_courses(
        &self,
        access_token: &str,
        query: &CourseListQuery,
    ) -> DirectoryResult<Value> {
        let pairs = query.to_pairs();
        self.call_endpoint(Endpoint::Courses, Some(access_token), None, Some(&pairs))
            .await
    }

    pub async fn get_grades(&self, access_token: &str) -> DirectoryResult<Value> {
        self.call_endpoint(Endpoint::Grades, Some(access_token), None, None)
            .await
    }

    pub async fn get_attendance(&self, access_token: &str) -> DirectoryResult<Value> {
        self.call_endpoint(Endpoint::Attendance, Some(access_token), None, None)
            .await
    }

    pub async fn get_messages(&self, access_token: &str) -> DirectoryResult<Value> {
        self.call_endpoint(Endpoint::Messages, Some(access_token), None, None)
            .await
    }

    /// Forward an image as multipart field `image`
    pub async fn upload_image(
        &self,
        access_token: &str,
        image: ImageUpload,
    ) -> DirectoryResult<Value> {
        let path = Endpoint::Image.path();
        info!(file_name = %image.file_name, size = image.bytes.len(), "Directory image upload");

        let mut part = multipart::Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| DirectoryError::Request(e.to_string()))?;
        }
        let form = multipart::Form::new().part("image", part);

        let request = self
            .client
            .post(self.config.url_for(path))
            .headers(bearer_headers(access_token)?)
            .multipart(form);

        self.send(request, path).await
    }

    /// Raw student search; `query` is matched upstream against name, uid and mail
    pub async fn search_students(
        &self,
        access_token: &str,
        query: Option<&str>,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let params = student_search_params(query);
        let value = self
            .call_endpoint(Endpoint::Students, Some(access_token), None, Some(&params))
            .await?;

        Ok(parse_entries(value))
    }
}

fn bearer_headers(access_token: &str) -> DirectoryResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {}", access_token))
        .map_err(|_| DirectoryError::Request("access token is not a valid header value".into()))?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Paging plus an `or` filter over display name, uid and mail
fn student_search_params(query: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", "1".to_string()),
        ("pageSize", SEARCH_PAGE_SIZE.to_string()),
        ("skip", "0".to_string()),
        ("take", SEARCH_PAGE_SIZE.to_string()),
    ];

    if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
        let filters: Vec<Value> = ["display_name", "uid", "mail"]
            .iter()
            .map(|field| json!({ "field": field, "operator": "contains", "value": q }))
            .collect();
        params.push(("filter", json!({ "logic": "or", "filters": filters }).to_string()));
    }

    params
}

/// Accept a bare array or `{ "data": [...] }`; anything else is empty
fn parse_entries(value: Value) -> Vec<DirectoryEntry> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            debug!(entry = %item, "Directory student entry");
            match serde_json::from_value::<DirectoryEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed directory student entry");
                    None
                }
            }
        })
        .collect()
}
