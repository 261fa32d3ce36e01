//! Task list service.

use crate::error::{Result, TaskError};
use crate::models::{CompleteTask, Task, TaskId};
use crate::optimistic::OptimisticList;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_api::ApiClient;
use core_runtime::events::{CoreEvent, EventBus, TaskEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Loads tasks and toggles their completion optimistically.
pub struct TaskService {
    client: ApiClient,
    tasks: OptimisticList<Task>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
}

impl TaskService {
    pub fn new(client: ApiClient, clock: Arc<dyn Clock>, event_bus: EventBus) -> Self {
        Self {
            client,
            tasks: OptimisticList::default(),
            clock,
            event_bus,
        }
    }

    /// Fetch `GET /tasks` and replace the local list.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self.client.get("/tasks").await?;
        info!(count = tasks.len(), "Tasks loaded");

        self.tasks.replace(tasks.clone());
        let _ = self.event_bus.emit(CoreEvent::Task(TaskEvent::Loaded {
            count: tasks.len(),
        }));
        Ok(tasks)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.snapshot()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.tasks.get(&id)
    }

    /// Receiver that yields the list after every change, optimistic ones included.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    /// Mark a task complete at `completed_at`, or now when `None`.
    ///
    /// The list shows the task as complete before the backend answers. If the
    /// backend rejects the change the task is restored and the error returned.
    #[instrument(skip(self))]
    pub async fn mark_complete(
        &self,
        id: TaskId,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Value> {
        let at = completed_at.unwrap_or_else(|| self.clock.now());
        let endpoint = format!("/tasks/{}/complete", id);
        let body = CompleteTask { completed_at };

        self.mutate(id, endpoint, body, move |task| task.completed_at(at))
            .await
    }

    /// Reopen a task, clearing its completion timestamp.
    #[instrument(skip(self))]
    pub async fn reopen(&self, id: TaskId) -> Result<Value> {
        let endpoint = format!("/tasks/{}/reopen", id);

        self.mutate(id, endpoint, serde_json::json!({}), Task::reopened)
            .await
    }

    async fn mutate<B, F>(
        &self,
        id: TaskId,
        endpoint: String,
        body: B,
        compute_next: F,
    ) -> Result<Value>
    where
        B: serde::Serialize,
        F: FnOnce(&Task) -> Task,
    {
        let client = self.client.clone();
        let event_bus = self.event_bus.clone();

        let result = self
            .tasks
            .apply(&id, compute_next, move |applied| {
                debug!(task_id = %id, completed = applied.completed, "Applied locally");
                let _ = event_bus.emit(CoreEvent::Task(TaskEvent::Updated {
                    task_id: id.to_string(),
                    completed: applied.completed,
                }));
                async move {
                    client
                        .patch::<_, Value>(&endpoint, &body)
                        .await
                        .map_err(TaskError::from)
                }
            })
            .await;

        if let Err(TaskError::Api(e)) = &result {
            warn!(task_id = %id, error = %e, "Backend rejected change, rolled back");
            let _ = self.event_bus.emit(CoreEvent::Task(TaskEvent::RolledBack {
                task_id: id.to_string(),
                message: e.message(),
            }));
        }

        result
    }
}
