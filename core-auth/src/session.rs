//! Session state tracking and forced termination.

use crate::credential_store::CredentialStore;
use crate::types::SessionState;
use bridge_traits::Navigator;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Observable session state.
///
/// Transitions are made atomically on a `watch` channel so "who moved the
/// session out of the active state" has exactly one answer.
pub struct SessionTracker {
    state: watch::Sender<SessionState>,
}

impl SessionTracker {
    pub fn new(initial: SessionState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that yields every state change; the current value is marked seen.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Unconditionally set the state, returning the previous one.
    pub fn set(&self, next: SessionState) -> SessionState {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Session state changed");
        }
        previous
    }

    /// Enter `Refreshing`.
    pub fn begin_refresh(&self) {
        self.set(SessionState::Refreshing);
    }

    /// Enter `Authenticated` unless the session ended meanwhile.
    ///
    /// Returns false when the state was `NoSession`.
    pub fn resume(&self) -> bool {
        let mut alive = true;
        self.state.send_if_modified(|state| match state {
            SessionState::NoSession => {
                alive = false;
                false
            }
            SessionState::Refreshing => {
                *state = SessionState::Authenticated;
                true
            }
            SessionState::Authenticated => false,
        });
        alive
    }

    /// Move to `NoSession`.
    ///
    /// Returns true only for the caller that performed the transition out of
    /// an active state.
    pub fn end(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_active() {
                *state = SessionState::NoSession;
                true
            } else {
                false
            }
        })
    }
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(SessionState::NoSession)
    }
}

/// Ends the session when credentials cannot be recovered.
///
/// Clears the [`CredentialStore`] and then asks the host to show the login
/// route, both as [`SessionEvent::Terminated`] on the event bus and through
/// the optional [`Navigator`]. Any number of concurrent calls produce a
/// single navigation.
pub struct SessionTerminator {
    credentials: Arc<CredentialStore>,
    tracker: Arc<SessionTracker>,
    event_bus: EventBus,
    navigator: Option<Arc<dyn Navigator>>,
    login_route: String,
}

impl SessionTerminator {
    pub fn new(
        credentials: Arc<CredentialStore>,
        tracker: Arc<SessionTracker>,
        event_bus: EventBus,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            tracker,
            event_bus,
            navigator: None,
            login_route: login_route.into(),
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Clear credentials and request navigation to the login route.
    ///
    /// Returns whether this call emitted the navigation.
    #[instrument(skip(self))]
    pub async fn terminate(&self) -> bool {
        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "Credentials could not be erased from storage during termination");
        }

        if !self.tracker.end() {
            debug!("Session already ended, skipping navigation");
            return false;
        }

        info!(redirect_to = %self.login_route, "Session terminated");

        let event = CoreEvent::Session(SessionEvent::Terminated {
            redirect_to: self.login_route.clone(),
        });
        let _ = self.event_bus.emit(event);

        if let Some(navigator) = &self.navigator {
            navigator.navigate(&self.login_route);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CredentialPair;
    use bridge_desktop::MemorySecureStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    async fn terminator(
        state: SessionState,
    ) -> (
        Arc<SessionTerminator>,
        Arc<CredentialStore>,
        Arc<SessionTracker>,
        Arc<RecordingNavigator>,
        EventBus,
    ) {
        let credentials = Arc::new(CredentialStore::new(
            Arc::new(MemorySecureStore::new()),
            "test.session",
        ));
        credentials
            .set(CredentialPair::new("a-1", "r-1"))
            .await
            .unwrap();
        let tracker = Arc::new(SessionTracker::new(state));
        let navigator = Arc::new(RecordingNavigator::default());
        let bus = EventBus::new(16);
        let terminator = SessionTerminator::new(
            credentials.clone(),
            tracker.clone(),
            bus.clone(),
            "/login",
        )
        .with_navigator(navigator.clone());

        (Arc::new(terminator), credentials, tracker, navigator, bus)
    }

    #[test]
    fn test_tracker_end_reports_single_winner() {
        let tracker = SessionTracker::new(SessionState::Refreshing);

        assert!(tracker.end());
        assert!(!tracker.end());
        assert_eq!(tracker.state(), SessionState::NoSession);
    }

    #[test]
    fn test_resume_does_not_revive_ended_session() {
        let tracker = SessionTracker::new(SessionState::Authenticated);
        tracker.begin_refresh();
        assert!(tracker.resume());
        assert_eq!(tracker.state(), SessionState::Authenticated);

        tracker.begin_refresh();
        tracker.end();
        assert!(!tracker.resume());
        assert_eq!(tracker.state(), SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let tracker = SessionTracker::new(SessionState::Authenticated);
        let mut rx = tracker.subscribe();

        tracker.begin_refresh();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Refreshing);

        tracker.end();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::NoSession);
    }

    #[tokio::test]
    async fn test_terminate_clears_and_navigates() {
        let (terminator, credentials, tracker, navigator, bus) =
            terminator(SessionState::Authenticated).await;
        let mut events = bus.subscribe();

        assert!(terminator.terminate().await);

        assert!(credentials.get().await.is_none());
        assert_eq!(tracker.state(), SessionState::NoSession);
        assert_eq!(*navigator.routes.lock().unwrap(), vec!["/login".to_string()]);
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::Terminated {
                redirect_to: "/login".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_concurrent_terminate_navigates_once() {
        let (terminator, _credentials, _tracker, navigator, bus) =
            terminator(SessionState::Refreshing).await;
        let mut events = bus.subscribe();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let terminator = terminator.clone();
                tokio::spawn(async move { terminator.terminate().await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(navigator.routes.lock().unwrap().len(), 1);
        assert!(events.recv().await.is_ok());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_terminate_without_session_only_clears() {
        let (terminator, credentials, _tracker, navigator, _bus) =
            terminator(SessionState::NoSession).await;

        assert!(!terminator.terminate().await);
        assert!(credentials.get().await.is_none());
        assert!(navigator.routes.lock().unwrap().is_empty());
    }
}
