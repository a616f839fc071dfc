//! In-memory application harness for router-level tests

use crate::auth::{MemoryUserStore, SessionManager, UserRole};
use crate::config::AuthConfig;
use crate::contact::{Mailer, OutgoingEmail};
use crate::error::ServiceError;
use crate::projects::MemoryProjectStore;
use crate::{create_router, AppState};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const USER_EMAIL: &str = "user@example.com";
pub const USER_PASSWORD: &str = "password123";

/// Captures sent mail, or fails every send when `fail` is set
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), ServiceError> {
        if self.fail {
            return Err(ServiceError::Mail("relay refused connection".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<SessionManager>,
    pub users: Arc<MemoryUserStore>,
    pub mailer: Arc<RecordingMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(AuthConfig::for_tests(), RecordingMailer::default()).await
    }

    pub async fn with(config: AuthConfig, mailer: RecordingMailer) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let sessions = Arc::new(SessionManager::new(users.clone(), config).unwrap());
        let mailer = Arc::new(mailer);

        sessions
            .provision_user(ADMIN_EMAIL, ADMIN_PASSWORD, UserRole::Admin)
            .await
            .unwrap();
        sessions
            .provision_user(USER_EMAIL, USER_PASSWORD, UserRole::User)
            .await
            .unwrap();

        let router = create_router(AppState {
            sessions: sessions.clone(),
            projects: Arc::new(MemoryProjectStore::new()),
            mailer: mailer.clone(),
        });

        Self {
            router,
            sessions,
            users,
            mailer,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Log in over HTTP and return the access token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn user_token(&self) -> String {
        self.login(USER_EMAIL, USER_PASSWORD).await
    }
}

impl TestResponse {
    pub fn refresh_header(&self) -> Option<String> {
        self.headers
            .get(crate::auth::REFRESH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }
}
