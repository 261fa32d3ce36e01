//! Integration tests for the TaskService
//!
//! These tests verify optimistic completion against a scripted backend:
//! - The list changes before the backend answers
//! - A rejected change restores the exact prior list
//! - Timestamps come from the caller or the injected clock

use async_trait::async_trait;
use bridge_desktop::MemorySecureStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::FixedClock;
use bridge_traits::{HttpBody, SecureStore};
use chrono::{TimeZone, Utc};
use core_api::{ApiClient, ApiError};
use core_auth::{CredentialPair, CredentialStore, SessionState, SessionTracker};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, TaskEvent};
use core_tasks::{TaskError, TaskId, TaskService};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

const TASKS: &str = r#"[
    {"id":1,"title":"Conferir estoque","completed":false},
    {"id":2,"title":"Emitir notas","completed":true,"completedAt":"2026-02-27T18:00:00Z"},
    {"id":3,"title":"Responder clientes","completed":false}
]"#;

/// Backend answering by "METHOD path", optionally holding answers until released.
#[derive(Default)]
struct ScriptedBackend {
    answers: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<(String, Option<Value>)>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedBackend {
    fn answer(self, route: &str, status: u16, body: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(route.to_string(), (status, body.to_string()));
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl HttpClient for ScriptedBackend {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request
            .url
            .strip_prefix("http://backend.test/api")
            .unwrap_or(&request.url)
            .to_string();
        let route = format!("{} {}", request.method, path);
        let body = match &request.body {
            HttpBody::Json(bytes) => serde_json::from_slice(bytes).ok(),
            _ => None,
        };
        self.requests.lock().unwrap().push((route.clone(), body));

        if request.method != HttpMethod::Get {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
        }

        let (status, body) = self
            .answers
            .lock()
            .unwrap()
            .get(&route)
            .cloned()
            .unwrap_or((404, r#"{"message":"Rota não encontrada"}"#.to_string()));
        Ok(HttpResponse::new(status, body))
    }
}

async fn create_service(backend: Arc<ScriptedBackend>) -> (TaskService, EventBus) {
    let store: Arc<dyn SecureStore> = Arc::new(MemorySecureStore::new());
    let config = CoreConfig::builder()
        .base_url("http://backend.test")
        .http_client(backend)
        .secure_store(store.clone())
        .build()
        .unwrap();

    let credentials = Arc::new(CredentialStore::new(store, config.credential_key()));
    credentials
        .set(CredentialPair::new("a-1", "r-1"))
        .await
        .unwrap();
    let tracker = Arc::new(SessionTracker::new(SessionState::Authenticated));
    let bus = EventBus::new(32);

    let client = ApiClient::new(&config, credentials, tracker, bus.clone());
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()));

    (TaskService::new(client, clock, bus.clone()), bus)
}

#[tokio::test]
async fn test_load_replaces_list() {
    let backend = Arc::new(ScriptedBackend::default().answer("GET /tasks", 200, TASKS));
    let (service, bus) = create_service(backend).await;
    let mut events = bus.subscribe();

    let tasks = service.load().await.unwrap();

    assert_eq!(tasks.len(), 3);
    assert_eq!(service.tasks(), tasks);
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Task(TaskEvent::Loaded { count: 3 })
    );
}

#[tokio::test]
async fn test_mark_complete_is_visible_before_backend_answers() {
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(
        ScriptedBackend::default()
            .answer("GET /tasks", 200, TASKS)
            .answer("PATCH /tasks/1/complete", 200, r#"{"id":1}"#)
            .gated(gate.clone()),
    );
    let (service, _bus) = create_service(backend.clone()).await;
    service.load().await.unwrap();

    let pending = service.mark_complete(TaskId(1), None);
    tokio::pin!(pending);
    assert!(futures::poll!(pending.as_mut()).is_pending());

    let task = service.task(TaskId(1)).unwrap();
    assert!(task.completed);
    assert_eq!(
        task.completed_at,
        Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap())
    );

    gate.notify_one();
    let result = pending.await.unwrap();
    assert_eq!(result["id"], 1);
    assert!(service.task(TaskId(1)).unwrap().completed);

    let requests = backend.requests.lock().unwrap();
    let (route, body) = requests.last().unwrap();
    assert_eq!(route, "PATCH /tasks/1/complete");
    // No explicit timestamp: the backend stamps the completion itself.
    assert_eq!(body.as_ref().unwrap(), &serde_json::json!({}));
}

#[tokio::test]
async fn test_explicit_completion_timestamp_is_sent() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .answer("GET /tasks", 200, TASKS)
            .answer("PATCH /tasks/3/complete", 204, ""),
    );
    let (service, _bus) = create_service(backend.clone()).await;
    service.load().await.unwrap();
    let at = Utc.with_ymd_and_hms(2026, 2, 28, 17, 45, 0).unwrap();

    let result = service.mark_complete(TaskId(3), Some(at)).await.unwrap();

    assert_eq!(result, Value::Null);
    assert_eq!(service.task(TaskId(3)).unwrap().completed_at, Some(at));
    let requests = backend.requests.lock().unwrap();
    assert_eq!(
        requests.last().unwrap().1.as_ref().unwrap(),
        &serde_json::json!({ "completedAt": "2026-02-28T17:45:00Z" })
    );
}

#[tokio::test]
async fn test_conflict_restores_exact_prior_list() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .answer("GET /tasks", 200, TASKS)
            .answer(
                "PATCH /tasks/1/complete",
                409,
                r#"{"message":"Tarefa alterada por outro usuário"}"#,
            ),
    );
    let (service, bus) = create_service(backend).await;
    service.load().await.unwrap();
    let before = service.tasks();
    let mut events = bus.subscribe();

    let err = service.mark_complete(TaskId(1), None).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        err,
        TaskError::Api(ApiError::Conflict {
            message: "Tarefa alterada por outro usuário".to_string()
        })
    );
    assert_eq!(service.tasks(), before);

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Task(TaskEvent::Updated {
            task_id: "1".to_string(),
            completed: true
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Task(TaskEvent::RolledBack {
            task_id: "1".to_string(),
            message: "Tarefa alterada por outro usuário".to_string()
        })
    );
}

#[tokio::test]
async fn test_reopen_clears_timestamp_and_rolls_back_on_failure() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .answer("GET /tasks", 200, TASKS)
            .answer("PATCH /tasks/2/reopen", 500, "<html>erro</html>"),
    );
    let (service, _bus) = create_service(backend).await;
    service.load().await.unwrap();
    let before = service.task(TaskId(2)).unwrap();

    let err = service.reopen(TaskId(2)).await.unwrap_err();

    assert_eq!(err.to_string(), "Erro desconhecido");
    assert_eq!(service.task(TaskId(2)).unwrap(), before);
}

#[tokio::test]
async fn test_reopen_success_keeps_optimistic_value() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .answer("GET /tasks", 200, TASKS)
            .answer("PATCH /tasks/2/reopen", 200, r#"{"id":2,"completed":false}"#),
    );
    let (service, _bus) = create_service(backend).await;
    service.load().await.unwrap();

    service.reopen(TaskId(2)).await.unwrap();

    let task = service.task(TaskId(2)).unwrap();
    assert!(!task.completed);
    assert!(task.completed_at.is_none());
}

#[tokio::test]
async fn test_unknown_task_is_not_sent() {
    let backend = Arc::new(ScriptedBackend::default().answer("GET /tasks", 200, TASKS));
    let (service, _bus) = create_service(backend.clone()).await;
    service.load().await.unwrap();

    let err = service.mark_complete(TaskId(42), None).await.unwrap_err();

    assert_eq!(
        err,
        TaskError::NotFound {
            id: "42".to_string()
        }
    );
    assert_eq!(backend.requests.lock().unwrap().len(), 1);
}
