//! Integration tests for Mintgate.
//!
//! The full router runs in-process against [`MemoryStore`] and
//! [`MemoryNotifier`]; requests go through `tower::ServiceExt::oneshot`, so
//! no database or SMTP server is needed.
//!
//! ```bash
//! cargo test -p mintgate-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use mintgate_core::Email;
use mintgate_server::config::{ServerConfig, SignupCodes};
use mintgate_server::routes;
use mintgate_server::services::email::MemoryNotifier;
use mintgate_server::services::uploads::LocalBlobStore;
use mintgate_server::state::{AppState, Backends};
use mintgate_server::store::MemoryStore;
use mintgate_server::tokens::TokenService;

pub const TOKEN_SECRET: &str = "integration-test-secret-Zq8#mW2!vR5$kL9@pX3^";
pub const ADMIN_CODE: &str = "admin-signup-code-7f3a9c1e";
pub const CREATOR_CODE: &str = "creator-signup-code-2b8d4e6f";
pub const PASSWORD: &str = "correct horse battery";

/// A running application plus handles on its in-memory backends.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<MemoryNotifier>,
    pub upload_dir: PathBuf,
}

/// Status and decoded JSON body (`Value::Null` for non-JSON bodies).
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let upload_dir = std::env::temp_dir().join(format!("mintgate-it-{}", Uuid::new_v4()));
        let config = test_config(upload_dir.clone());

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let uploader = Arc::new(LocalBlobStore::new(upload_dir.clone(), &config.base_url));

        let backends = Backends {
            credentials: store.clone(),
            marketplace: store.clone(),
            mint_queue: store.clone(),
            notifier: notifier.clone(),
            uploader,
        };
        let state = AppState::new(config, backends);

        Self {
            router: routes::router(state, false),
            store,
            notifier,
            upload_dir,
        }
    }

    /// Token service sharing the application's signing secret.
    #[must_use]
    pub fn tokens(&self) -> TokenService {
        TokenService::new(&SecretString::from(TOKEN_SECRET))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        let request = build(method, uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: &Value) -> TestResponse {
        self.json(Method::POST, uri, token, body).await
    }

    /// POST a multipart form. `files` are `(field, file_name, bytes)`.
    pub async fn multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &[u8])],
    ) -> TestResponse {
        let boundary = format!("mintgate-{}", Uuid::new_v4().simple());
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, file_name, bytes) in files {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = build(Method::POST, uri, token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Sign up a plain user account.
    pub async fn signup(&self, username: &str, email: &str) -> TestResponse {
        self.post(
            "/api/auth/signup",
            None,
            &json!({ "username": username, "email": email, "password": PASSWORD }),
        )
        .await
    }

    /// Sign up with a privilege code (`"admin"` or `"creator"`).
    pub async fn signup_privileged(
        &self,
        username: &str,
        email: &str,
        account_type: &str,
        code: &str,
    ) -> TestResponse {
        self.post(
            "/api/auth/signup",
            None,
            &json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
                "privilege": { "account_type": account_type, "signup_code": code },
            }),
        )
        .await
    }

    /// Follow the most recent verification link sent to `email`.
    pub async fn verify(&self, email: &str) -> TestResponse {
        let token = self.latest_token(email);
        self.get(&format!("/api/auth/verify_email?token={token}"), None)
            .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/login",
            None,
            &json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Sign up, verify and log in; returns the session token.
    pub async fn session_for(&self, username: &str, email: &str) -> String {
        assert_eq!(self.signup(username, email).await.status, StatusCode::CREATED);
        self.verified_login(username, email).await
    }

    /// Sign up with a privilege code, verify and log in.
    pub async fn privileged_session(
        &self,
        username: &str,
        email: &str,
        account_type: &str,
        code: &str,
    ) -> String {
        let response = self
            .signup_privileged(username, email, account_type, code)
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        self.verified_login(username, email).await
    }

    async fn verified_login(&self, username: &str, email: &str) -> String {
        assert_eq!(self.verify(email).await.status, StatusCode::OK);
        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["token"].as_str().unwrap().to_owned()
    }

    /// The `token=` value from the newest message sent to `email`.
    #[must_use]
    pub fn latest_token(&self, email: &str) -> String {
        let to = Email::parse(email).unwrap();
        let message = self.notifier.sent_to(&to).pop().unwrap();
        token_in(&message.text).unwrap()
    }

    /// Number of messages sent to `email`.
    #[must_use]
    pub fn sent_count(&self, email: &str) -> usize {
        self.notifier.sent_to(&Email::parse(email).unwrap()).len()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

fn build(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

/// Extract the query token from the first link in `text`.
#[must_use]
pub fn token_in(text: &str) -> Option<String> {
    let start = text.find("token=")? + "token=".len();
    let token: String = text
        .get(start..)?
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '"' && *c != '<')
        .collect();
    (!token.is_empty()).then_some(token)
}

#[must_use]
pub fn test_config(upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/mintgate_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        app_url: "http://app.localhost:8080".to_string(),
        token_secret: SecretString::from(TOKEN_SECRET),
        store_timeout: Duration::from_secs(5),
        upload_dir,
        signup_codes: SignupCodes {
            admin: Some(SecretString::from(ADMIN_CODE)),
            creator: Some(SecretString::from(CREATOR_CODE)),
        },
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}
