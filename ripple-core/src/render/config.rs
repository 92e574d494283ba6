//! Options for bindings and render queues.

use std::borrow::Cow;
use std::time::Duration;

/// Options for [`Binding::bind_with`](super::Binding::bind_with).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOptions {
    /// Name used in log output.
    pub label: Option<Cow<'static, str>>,

    /// Request a re-render for the replayed value at bind time.
    pub rerender_on_bind: bool,

    /// Log absorbed failures at `debug` instead of `warn`.
    pub quiet_failures: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            label: None,
            rerender_on_bind: true,
            quiet_failures: false,
        }
    }
}

impl BindOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the binding in log output.
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether binding itself requests a re-render.
    pub fn rerender_on_bind(mut self, enabled: bool) -> Self {
        self.rerender_on_bind = enabled;
        self
    }

    /// Log absorbed failures at `debug` instead of `warn`.
    pub fn quiet_failures(mut self, quiet: bool) -> Self {
        self.quiet_failures = quiet;
        self
    }
}

/// Options for a [`RenderQueue`](super::RenderQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Most distinct components that may be pending. `None` is unbounded.
    pub capacity: Option<usize>,

    /// Longest a notification waits for the queue lock before giving up
    /// with [`RerenderError::Busy`](crate::RerenderError::Busy).
    pub lock_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            lock_timeout: Duration::from_millis(5),
        }
    }
}

impl QueueConfig {
    /// An unbounded queue with the default lock timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of distinct pending components.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set how long a request waits for the queue lock.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_options_defaults() {
        let options = BindOptions::default();
        assert!(options.rerender_on_bind);
        assert!(!options.quiet_failures);
        assert!(options.label.is_none());
    }

    #[test]
    fn builders_override_fields() {
        let options = BindOptions::new()
            .label("cart-total")
            .rerender_on_bind(false)
            .quiet_failures(true);
        assert_eq!(options.label.as_deref(), Some("cart-total"));
        assert!(!options.rerender_on_bind);
        assert!(options.quiet_failures);

        let config = QueueConfig::new()
            .capacity(16)
            .lock_timeout(Duration::from_millis(1));
        assert_eq!(config.capacity, Some(16));
        assert_eq!(config.lock_timeout, Duration::from_millis(1));
    }
}
