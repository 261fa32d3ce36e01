//! # Core events
//!
//! Session and task notifications broadcast from the core to the host shell.
//!
//! Producers hold a clone of [`EventBus`] and fire-and-forget:
//! `let _ = bus.emit(..)` since emitting with no subscriber is an error the
//! core never cares about. Consumers either take a raw
//! [`Receiver`](tokio::sync::broadcast::Receiver) or wrap it in an
//! [`EventStream`] to skip events they are not interested in.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, EventStream, SessionEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut sessions = EventStream::new(bus.subscribe()).sessions_only();
//!
//! bus.emit(CoreEvent::Session(SessionEvent::Terminated {
//!     redirect_to: "/login".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(
//!     sessions.recv().await,
//!     Ok(CoreEvent::Session(SessionEvent::Terminated { .. }))
//! ));
//! # }
//! ```
//!
//! A subscriber that falls more than the buffer size behind gets
//! `RecvError::Lagged(n)` once and then continues with newer events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Session(SessionEvent),
    Task(TaskEvent),
}

impl CoreEvent {
    /// Short human-readable label, suitable for a status bar.
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Session(SessionEvent::SignedIn) => "User signed in",
            CoreEvent::Session(SessionEvent::SignedOut) => "User signed out",
            CoreEvent::Session(SessionEvent::TokenRefreshing) => "Refreshing access token",
            CoreEvent::Session(SessionEvent::TokenRefreshed) => "Token refreshed successfully",
            CoreEvent::Session(SessionEvent::RefreshFailed { .. }) => "Token refresh failed",
            CoreEvent::Session(SessionEvent::Terminated { .. }) => "Session terminated",
            CoreEvent::Task(TaskEvent::Loaded { .. }) => "Tasks loaded",
            CoreEvent::Task(TaskEvent::Updated { .. }) => "Task updated",
            CoreEvent::Task(TaskEvent::RolledBack { .. }) => "Task change rolled back",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::RefreshFailed { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::Terminated { .. })
            | CoreEvent::Task(TaskEvent::RolledBack { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::SignedIn | SessionEvent::SignedOut) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Session lifecycle. Payloads never carry credential values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshing,
    TokenRefreshed,
    /// Renewal failed and the stored credentials were cleared.
    RefreshFailed { reason: String },
    /// The core ended the session; the host should show `redirect_to`.
    ///
    /// Emitted once per session however many requests failed together.
    Terminated { redirect_to: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TaskEvent {
    Loaded { count: usize },
    /// A task changed locally, before the backend confirmed it.
    Updated { task_id: String, completed: bool },
    /// An optimistic change was reverted; `message` is the backend's reason.
    RolledBack { task_id: String, message: String },
}

/// Cloneable handle on the broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is how far a subscriber may fall behind before lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many subscribers got the event, or an error when there
    /// are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receiver for events emitted from now on. Nothing is replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events not matching its predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Keep only events for which `predicate` returns true.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn sessions_only(self) -> Self {
        self.filter(|event| matches!(event, CoreEvent::Session(_)))
    }

    pub fn tasks_only(self) -> Self {
        self.filter(|event| matches!(event, CoreEvent::Task(_)))
    }

    fn wants(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |keep| keep(event))
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, or `None`.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminated() -> CoreEvent {
        CoreEvent::Session(SessionEvent::Terminated {
            redirect_to: "/login".to_string(),
        })
    }

    fn updated(task_id: &str) -> CoreEvent {
        CoreEvent::Task(TaskEvent::Updated {
            task_id: task_id.to_string(),
            completed: true,
        })
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error() {
        let bus = EventBus::new(4);

        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(CoreEvent::Session(SessionEvent::SignedOut)).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_each_event() {
        let bus = EventBus::new(4);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(terminated()).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), terminated());
        assert_eq!(second.recv().await.unwrap(), terminated());
    }

    #[tokio::test]
    async fn test_stream_skips_filtered_events() {
        let bus = EventBus::new(8);
        let mut sessions = EventStream::new(bus.subscribe()).sessions_only();
        let mut tasks = EventStream::new(bus.subscribe()).tasks_only();

        bus.emit(updated("7")).ok();
        bus.emit(terminated()).ok();

        assert_eq!(sessions.recv().await.unwrap(), terminated());
        assert_eq!(tasks.try_recv(), Some(Ok(updated("7"))));
        assert_eq!(tasks.try_recv(), None);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for count in 0..5 {
            bus.emit(CoreEvent::Task(TaskEvent::Loaded { count })).ok();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(3)))));
        assert_eq!(
            stream.recv().await.unwrap(),
            CoreEvent::Task(TaskEvent::Loaded { count: 3 })
        );
    }

    #[test]
    fn test_severity_and_description() {
        let failed = CoreEvent::Session(SessionEvent::RefreshFailed {
            reason: "HTTP 401".to_string(),
        });

        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(terminated().severity(), EventSeverity::Warning);
        assert_eq!(
            CoreEvent::Session(SessionEvent::SignedIn).severity(),
            EventSeverity::Info
        );
        assert_eq!(updated("1").severity(), EventSeverity::Debug);
        assert_eq!(terminated().description(), "Session terminated");
    }

    #[test]
    fn test_events_serialize_with_tags() {
        let json = serde_json::to_value(terminated()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "Session",
                "payload": { "event": "Terminated", "redirect_to": "/login" }
            })
        );
    }
}
