//! In-process stand-in for the library backend, served by axum on an ephemeral port.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use pwlibrary::identity::encode_unsigned;

pub const HEADER: &str = "x-auth-token";

#[derive(Clone, Default)]
pub struct Backend {
    valid: Arc<Mutex<HashSet<String>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    /// Every issued token stops being accepted, as if it had expired server-side.
    pub fn revoke_all(&self) { self.valid.lock().clear(); }

    pub fn hits(&self) -> Vec<String> { self.hits.lock().clone() }

    fn issue(&self, id: &str, role: &str) -> String {
        let token = encode_unsigned(&json!({"user": {"id": id, "role": role}, "iat": self.valid.lock().len()}));
        self.valid.lock().insert(token.clone());
        token
    }

    fn authorised(&self, headers: &HeaderMap, what: &str) -> Result<(), (StatusCode, Json<Value>)> {
        self.hits.lock().push(what.to_string());
        let ok = headers
            .get(HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|t| self.valid.lock().contains(t))
            .unwrap_or(false);
        if ok { Ok(()) } else { Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Token is not valid"})))) }
    }
}

type Reply = (StatusCode, Json<Value>);

async fn login(State(b): State<Backend>, Json(body): Json<Value>) -> Reply {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match (email, password) {
        ("a@b.com", "secret") => (StatusCode::OK, Json(json!({"token": b.issue("u1", "user")}))),
        ("admin@b.com", "secret") => (StatusCode::OK, Json(json!({"token": b.issue("a1", "admin")}))),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"}))),
    }
}

async fn books(State(b): State<Backend>, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Reply {
    if let Err(e) = b.authorised(&headers, "books") {
        return e;
    }
    let page = q.get("page").cloned().unwrap_or_default();
    let books = json!([
        {"_id": "b1", "title": format!("Dune (page {})", page), "author": "Herbert", "category": "SF", "availableCopies": 2}
    ]);
    (StatusCode::OK, Json(json!({"books": books, "totalItems": 21})))
}

async fn reservations(State(b): State<Backend>, headers: HeaderMap) -> Reply {
    if let Err(e) = b.authorised(&headers, "reservations") {
        return e;
    }
    (StatusCode::OK, Json(json!([
        {"_id": "r1", "status": "reserved", "bookTitle": "Dune", "returnByDate": "2030-01-01T00:00:00.000Z"},
        {"_id": "r0", "status": "returned", "bookTitle": "Emma"}
    ])))
}

async fn user(State(b): State<Backend>, headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if let Err(e) = b.authorised(&headers, "user") {
        return e;
    }
    (StatusCode::OK, Json(json!({"_id": id, "email": "a@b.com", "role": "user", "verified": true})))
}

async fn forgot() -> Reply {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})))
}

pub async fn spawn_backend() -> (String, Backend, JoinHandle<()>) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/users/login", post(login))
        .route("/users/forgot-password", post(forgot))
        .route("/users/{id}", get(user))
        .route("/books/", get(books))
        .route("/reservations", get(reservations))
        .with_state(backend.clone());
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e:?}");
        }
    });
    (format!("http://{}", addr), backend, handle)
}
