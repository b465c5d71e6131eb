//! Test Helper Utilities
//!
//! Shared app construction and collaborator fakes for triage-server tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

use triage_common::ImagingAssessment;
use triage_server::error::{CollaboratorError, SyncError};
use triage_server::interview::SymptomGraph;
use triage_server::models::ScreeningRecord;
use triage_server::services::{ChatMessage, ConversationalModel, ImagingClassifier};
use triage_server::sync::{
    ConnectivityProbe, NoRemoteStore, OfflineProbe, ReconcilerSettings, RemoteStore,
    SyncReconciler,
};
use triage_server::AppState;

pub const DEVICE_ID: &str = "test-device";

pub fn test_settings() -> ReconcilerSettings {
    ReconcilerSettings {
        interval: Duration::from_secs(300),
        backoff_base: Duration::from_secs(30),
        backoff_max: Duration::from_secs(3600),
        lease_ttl: Duration::from_secs(600),
    }
}

/// Probe whose answer can be flipped mid-test
#[derive(Default)]
pub struct SwitchProbe {
    pub online: AtomicBool,
}

impl SwitchProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for SwitchProbe {
    async fn is_reachable(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Remote store that accepts uploads only while its probe says online
pub struct MemoryRemote {
    pub probe: Arc<SwitchProbe>,
    pub uploads: AtomicUsize,
}

impl MemoryRemote {
    pub fn new(probe: Arc<SwitchProbe>) -> Self {
        Self {
            probe,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert(&self, _record: &ScreeningRecord) -> Result<(), SyncError> {
        if !self.probe.is_reachable().await {
            return Err(SyncError::Unreachable("test network down".to_string()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Imaging classifier returning a fixed probability vector
pub struct FixedClassifier(pub ImagingAssessment);

#[async_trait]
impl ImagingClassifier for FixedClassifier {
    async fn classify(&self, _image: &str) -> Result<ImagingAssessment, CollaboratorError> {
        Ok(self.0.clone())
    }
}

/// Conversational model that always replies with the same text
pub struct ScriptedModel(pub &'static str);

#[async_trait]
impl ConversationalModel for ScriptedModel {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, CollaboratorError> {
        Ok(self.0.to_string())
    }
}

/// Conversational model that is always down
pub struct DownModel;

#[async_trait]
impl ConversationalModel for DownModel {
    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _temperature: f32,
    ) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Network("connection refused".to_string()))
    }
}

pub async fn test_db() -> SqlitePool {
    triage_common::db::init_memory_database()
        .await
        .expect("Failed to create in-memory database")
}

/// Offline app: no remote store, no collaborators
pub async fn create_test_app() -> (Router, AppState) {
    let pool = test_db().await;
    let reconciler = Arc::new(SyncReconciler::new(
        pool.clone(),
        Arc::new(OfflineProbe),
        Arc::new(NoRemoteStore),
        test_settings(),
        DEVICE_ID,
    ));
    let state = AppState::new(pool, SymptomGraph::standard(), reconciler, DEVICE_ID);
    (triage_server::build_router(state.clone()), state)
}

/// App whose remote store follows `probe`
pub async fn create_connected_app(probe: Arc<SwitchProbe>) -> (Router, AppState, Arc<MemoryRemote>) {
    let pool = test_db().await;
    let remote = Arc::new(MemoryRemote::new(probe.clone()));
    let reconciler = Arc::new(SyncReconciler::new(
        pool.clone(),
        probe,
        remote.clone(),
        test_settings(),
        DEVICE_ID,
    ));
    let state = AppState::new(pool, SymptomGraph::standard(), reconciler, DEVICE_ID);
    (triage_server::build_router(state.clone()), state, remote)
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn patient() -> Value {
    serde_json::json!({ "name": "Ramesh", "age": 54, "gender": "M" })
}
