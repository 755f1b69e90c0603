//! In-process mock of the identity and compute API.
//!
//! Binds an axum router to an ephemeral localhost port, records every
//! resource request (method, path, token, body) and serves canned
//! responses. The auth route issues `token-1`, `token-2`, ... so tests can
//! observe exactly which token each retried call carried.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cirrus_api::SessionManager;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
    pub accept: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct CloudState {
    pub auth_calls: AtomicUsize,
    pub version_calls: AtomicUsize,
    pub auth_users: Mutex<Vec<String>>,
    pub reject_all_tokens: AtomicBool,
    pub reject_tokens: Mutex<HashSet<String>>,
    /// (method, path) -> (status, body) for resource routes.
    pub responses: Mutex<HashMap<(String, String), (u16, String)>>,
    pub requests: Mutex<Vec<Recorded>>,
    /// Our own externally visible base URL, set after bind.
    pub service_base: Mutex<String>,
    /// Override for the X-Server-Management-Url auth header.
    pub management_url: Mutex<Option<String>>,
}

pub struct MockCloud {
    pub base_url: String,
    pub state: Arc<CloudState>,
    handle: JoinHandle<()>,
}

impl Drop for MockCloud {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockCloud {
    pub async fn start() -> Self {
        let state = Arc::new(CloudState::default());
        let app = Router::new()
            .route("/.json", get(versions))
            .route("/v1.0", get(auth))
            .route("/v1.1", get(auth))
            .fallback(catch_all)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind 127.0.0.1:0");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);
        *state.service_base.lock().unwrap() = base_url.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock cloud task error: {e:?}");
            }
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    /// Session manager pointed at this mock, initialized with test creds.
    pub async fn manager(&self) -> SessionManager {
        let manager = SessionManager::with_endpoints(&self.base_url, &self.base_url);
        manager
            .initialize("test_user", "test_key", None)
            .await
            .expect("initialize");
        manager
    }

    /// Base URL the auth response advertises for the compute service.
    pub fn management_url(&self) -> String {
        format!("{}/compute", self.base_url)
    }

    pub fn override_management_url(&self, url: &str) {
        *self.state.management_url.lock().unwrap() = Some(url.to_string());
    }

    pub fn respond(&self, method: &str, path: &str, body: &str) {
        self.respond_status(method, path, 200, body);
    }

    pub fn respond_status(&self, method: &str, path: &str, status: u16, body: &str) {
        self.state.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
    }

    /// 401 any resource request carrying this token.
    pub fn reject_token(&self, token: &str) {
        self.state
            .reject_tokens
            .lock()
            .unwrap()
            .insert(token.to_string());
    }

    /// 401 every resource request, whatever the token.
    pub fn reject_all_tokens(&self) {
        self.state.reject_all_tokens.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn auth_count(&self) -> usize {
        self.state.auth_calls.load(Ordering::SeqCst)
    }
}

async fn versions(State(state): State<Arc<CloudState>>) -> Response {
    state.version_calls.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({
        "versions": [
            {"id": "v1.1", "status": "BETA"},
            {"id": "v1.0", "status": "CURRENT"},
        ]
    }))
    .into_response()
}

async fn auth(State(state): State<Arc<CloudState>>, headers: HeaderMap) -> Response {
    let user = headers
        .get("x-auth-user")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Some(user) = user else {
        return (StatusCode::UNAUTHORIZED, "").into_response();
    };
    if headers.get("x-auth-key").is_none() {
        return (StatusCode::UNAUTHORIZED, "").into_response();
    }
    state.auth_users.lock().unwrap().push(user);

    let n = state.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let token = format!("token-{}", n);
    let base = state.service_base.lock().unwrap().clone();
    let management = state
        .management_url
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(|| format!("{}/compute", base));

    (
        StatusCode::OK,
        [
            ("X-Auth-Token", token),
            ("X-Storage-Url", format!("{}/storage", base)),
            ("X-Server-Management-Url", management),
            ("X-CDN-Management-Url", format!("{}/cdn", base)),
        ],
        "",
    )
        .into_response()
}

async fn catch_all(
    State(state): State<Arc<CloudState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let token = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let accept = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        token: token.clone(),
        accept,
        body,
    });

    let rejected = match token {
        Some(token) => {
            state.reject_all_tokens.load(Ordering::SeqCst)
                || state.reject_tokens.lock().unwrap().contains(&token)
        }
        None => true,
    };
    if rejected {
        return (StatusCode::UNAUTHORIZED, "").into_response();
    }

    let canned = state
        .responses
        .lock()
        .unwrap()
        .get(&(method.to_string(), path))
        .cloned();
    match canned {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
        // Unconfigured routes answer 200 with a blank body.
        None => (StatusCode::OK, String::new()).into_response(),
    }
}
