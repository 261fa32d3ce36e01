//! Host Navigation
//!
//! The core never drives a UI directly. When it needs the host to change
//! route (for example after the session is terminated) it calls a
//! [`Navigator`].

/// Route changes requested by the core
///
/// Implementations should treat `navigate` as a full reload of the target
/// route: state held by the current view is discarded.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::navigation::Navigator;
///
/// struct ShellNavigator(tauri::Window);
///
/// impl Navigator for ShellNavigator {
///     fn navigate(&self, route: &str) {
///         let _ = self.0.eval(&format!("window.location.assign('{}')", route));
///     }
/// }
/// ```
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator for hosts that only listen to session events.
#[derive(Debug, Clone, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _route: &str) {}
}
