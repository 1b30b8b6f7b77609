//! One-shot lazy construction of provider clients.

use std::sync::Mutex;
use tracing::warn;

/// Where a lazily created client stands.
#[derive(Debug, Clone)]
pub enum LazyState<T> {
    Uninitialized,
    Ready(T),
    /// Construction failed once; the reason is kept and never retried.
    Failed(String),
}

/// A client that is built on first use.
///
/// A failed construction is remembered so later calls return `None`
/// immediately instead of probing the provider again.
#[derive(Debug)]
pub struct LazyClient<T> {
    name: String,
    state: Mutex<LazyState<T>>,
}

impl<T: Clone> LazyClient<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(LazyState::Uninitialized),
        }
    }

    /// Return the client, building it with `init` if this is the first call.
    pub fn get_or_init<F>(&self, init: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, String>,
    {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match &*state {
            LazyState::Ready(client) => return Some(client.clone()),
            LazyState::Failed(_) => return None,
            LazyState::Uninitialized => {}
        }

        match init() {
            Ok(client) => {
                *state = LazyState::Ready(client.clone());
                Some(client)
            }
            Err(reason) => {
                warn!("{} unavailable: {}", self.name, reason);
                *state = LazyState::Failed(reason);
                None
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self.state.lock().as_deref(),
            Ok(LazyState::Ready(_))
        )
    }

    /// Why construction failed, if it did.
    pub fn failure_reason(&self) -> Option<String> {
        match self.state.lock().as_deref() {
            Ok(LazyState::Failed(reason)) => Some(reason.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_builds_once() {
        let lazy = LazyClient::new("test");
        let calls = Cell::new(0);

        for _ in 0..3 {
            let value = lazy.get_or_init(|| {
                calls.set(calls.get() + 1);
                Ok::<_, String>(42)
            });
            assert_eq!(value, Some(42));
        }
        assert_eq!(calls.get(), 1);
        assert!(lazy.is_ready());
    }

    #[test]
    fn test_failure_is_cached() {
        let lazy: LazyClient<u32> = LazyClient::new("test");
        let calls = Cell::new(0);

        for _ in 0..3 {
            let value = lazy.get_or_init(|| {
                calls.set(calls.get() + 1);
                Err("no api key".to_string())
            });
            assert_eq!(value, None);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(lazy.failure_reason().as_deref(), Some("no api key"));
        assert!(!lazy.is_ready());
    }
}
