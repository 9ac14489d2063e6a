//! Shared fixtures for router tests.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::games::spin_coordinator::SpinTimings;
use crate::shutdown;
use crate::storage::records::MemoryRecordStore;
use crate::storage::Storage;
use crate::AppState;

/// App state over an in-memory record store and a fresh uploads directory.
pub async fn test_state() -> AppState {
    let uploads = std::env::temp_dir().join(format!("lucky-wheel-uploads-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&uploads).unwrap();
    let storage = Storage::with_records(Arc::new(MemoryRecordStore::default()), uploads)
        .await
        .unwrap();
    // The sender is dropped; a dropped sender never signals shutdown.
    let (_, signal) = shutdown::channel();
    AppState::new(Arc::new(storage), SpinTimings::default(), signal)
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
