use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use openmusic_db::Database;
use openmusic_db::queue::{QueueTransport, SqliteQueue};
use openmusic_types::events::EXPORT_QUEUE;

use crate::cache::MokaCache;
use crate::covers::CoverStorage;
use crate::likes::LikeCounter;
use crate::routes::router;
use crate::state::{AppState, AppStateInner};
use crate::tokens::TokenService;

pub(crate) struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub queue: Arc<SqliteQueue>,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let queue = Arc::new(SqliteQueue::new(db.clone()));
        queue.declare(EXPORT_QUEUE).unwrap();

        let uploads = tempfile::tempdir().unwrap();
        let covers = CoverStorage::new(uploads.path().join("images"), "http://localhost:5000")
            .await
            .unwrap();

        let state: AppState = Arc::new(AppStateInner {
            db: db.clone(),
            tokens: TokenService::new("test-access", "test-refresh", Duration::from_secs(1800)),
            likes: LikeCounter::new(db, Arc::new(MokaCache::new(64)), Duration::from_secs(1800)),
            covers,
            queue: queue.clone(),
        });

        Self {
            app: router(state.clone()),
            state,
            queue,
            _uploads: uploads,
        }
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    pub async fn upload(&self, uri: &str, content_type: &str, bytes: Vec<u8>) -> (StatusCode, HeaderMap, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(bytes))
            .unwrap();
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    /// Register `username` with a fixed password, returning the user id.
    pub async fn register(&self, username: &str) -> String {
        let (status, _, body) = self
            .call(
                "POST",
                "/users",
                None,
                Some(json!({
                    "username": username,
                    "password": "secret-password",
                    "fullname": username.to_uppercase(),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["userId"].as_str().unwrap().to_string()
    }

    /// Register and log in, returning (user id, access token).
    pub async fn login_as(&self, username: &str) -> (String, String) {
        let id = self.register(username).await;
        let (status, _, body) = self
            .call(
                "POST",
                "/authentications",
                None,
                Some(json!({ "username": username, "password": "secret-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        (id, body["data"]["accessToken"].as_str().unwrap().to_string())
    }

    pub async fn create_album(&self) -> String {
        let (status, _, body) = self
            .call("POST", "/albums", None, Some(json!({ "name": "Ghost Stories", "year": 2014 })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["albumId"].as_str().unwrap().to_string()
    }

    pub async fn create_song(&self, title: &str) -> String {
        let (status, _, body) = self
            .call(
                "POST",
                "/songs",
                None,
                Some(json!({
                    "title": title,
                    "year": 2005,
                    "performer": "Coldplay",
                    "genre": "Rock",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["songId"].as_str().unwrap().to_string()
    }

    /// Stored cover file names, sorted.
    pub fn cover_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.state.covers.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
