//! Per-unit-of-work holder of the current principal.
//!
//! Storage is a tokio task-local: every logical request runs inside
//! [`SecurityContext::scope`] (async) or [`SecurityContext::sync_scope`]
//! (threaded work), and the binding lives exactly as long as that scope.
//! When the scoped future completes, fails, panics, or is dropped mid-flight
//! (cancellation, timeout), the binding is gone. Nothing is shared between
//! scopes, so no lock is involved.
//!
//! Task-locals are not inherited by `tokio::spawn`; use
//! [`SecurityContext::propagate`] to carry the binding into a spawned task.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::futures::TaskLocalFuture;

use crate::Principal;

type Slot = RefCell<Option<Arc<Principal>>>;

tokio::task_local! {
    static CURRENT: Slot;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// `bind` was called outside any [`SecurityContext::scope`].
    #[error("no security context scope is active for this unit of work")]
    NoScope,
}

/// Access to the principal bound to the current unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityContext;

impl SecurityContext {
    /// Run `fut` as one unit of work, optionally pre-bound to `principal`.
    pub fn scope<F>(principal: Option<Principal>, fut: F) -> TaskLocalFuture<Slot, F>
    where
        F: Future,
    {
        CURRENT.scope(RefCell::new(principal.map(Arc::new)), fut)
    }

    /// Synchronous counterpart of [`SecurityContext::scope`] for thread-based work.
    pub fn sync_scope<R>(principal: Option<Principal>, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(RefCell::new(principal.map(Arc::new)), f)
    }

    /// Run `fut` in a new scope carrying the caller's current binding.
    ///
    /// Intended for futures handed to `tokio::spawn`.
    pub fn propagate<F>(fut: F) -> TaskLocalFuture<Slot, F>
    where
        F: Future,
    {
        CURRENT.scope(RefCell::new(Self::current()), fut)
    }

    /// Bind `principal` to the current unit of work, replacing any previous binding.
    pub fn bind(principal: Principal) -> Result<(), ContextError> {
        CURRENT
            .try_with(|slot| {
                *slot.borrow_mut() = Some(Arc::new(principal));
            })
            .map_err(|_| ContextError::NoScope)
    }

    /// The principal bound to the current unit of work, if any.
    pub fn current() -> Option<Arc<Principal>> {
        CURRENT.try_with(|slot| slot.borrow().clone()).ok().flatten()
    }

    /// Remove the binding. No-op outside a scope.
    pub fn clear() {
        let _ = CURRENT.try_with(|slot| slot.borrow_mut().take());
    }

    pub fn is_active() -> bool {
        CURRENT.try_with(|_| ()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Barrier;
    use warden_core::SubjectId;

    use super::*;

    fn principal(subject: &str) -> Principal {
        Principal::new(SubjectId::new(subject.to_owned()).unwrap(), ["ROLE_USER"]).into_authenticated()
    }

    #[tokio::test]
    async fn unbound_outside_scope() {
        assert!(SecurityContext::current().is_none());
        assert!(!SecurityContext::is_active());
        assert_eq!(
            SecurityContext::bind(principal("alice")),
            Err(ContextError::NoScope)
        );
        SecurityContext::clear();
    }

    #[tokio::test]
    async fn bind_current_clear_within_scope() {
        SecurityContext::scope(None, async {
            assert!(SecurityContext::is_active());
            assert!(SecurityContext::current().is_none());

            SecurityContext::bind(principal("alice")).unwrap();
            assert_eq!(SecurityContext::current().unwrap().subject(), "alice");

            SecurityContext::clear();
            assert!(SecurityContext::current().is_none());
        })
        .await;

        assert!(SecurityContext::current().is_none());
    }

    #[tokio::test]
    async fn binding_ends_with_scope_even_on_error() {
        let result: Result<(), &str> = SecurityContext::scope(Some(principal("alice")), async {
            assert!(SecurityContext::current().is_some());
            Err("operation failed")
        })
        .await;

        assert!(result.is_err());
        assert!(SecurityContext::current().is_none());
    }

    #[tokio::test]
    async fn binding_ends_when_scope_is_cancelled() {
        let slow = SecurityContext::scope(Some(principal("alice")), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;

        assert!(timed_out.is_err());
        assert!(SecurityContext::current().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_scopes_never_observe_each_other() {
        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();

        for subject in ["alice", "bob"] {
            let barrier = barrier.clone();
            handles.push(tokio::spawn(SecurityContext::scope(
                Some(principal(subject)),
                async move {
                    for _ in 0..100 {
                        barrier.wait().await;
                        let seen = SecurityContext::current().unwrap();
                        assert_eq!(seen.subject(), subject);
                        tokio::task::yield_now().await;
                    }
                },
            )));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn propagate_carries_binding_into_spawned_task() {
        SecurityContext::scope(Some(principal("alice")), async {
            let plain = tokio::spawn(async { SecurityContext::current() });
            assert!(plain.await.unwrap().is_none());

            let carried = tokio::spawn(SecurityContext::propagate(async {
                SecurityContext::current().map(|p| p.subject().to_string())
            }));
            assert_eq!(carried.await.unwrap().as_deref(), Some("alice"));
        })
        .await;
    }

    #[test]
    fn sync_scope_does_not_leak_into_next_unit_on_same_thread() {
        SecurityContext::sync_scope(Some(principal("alice")), || {
            assert_eq!(SecurityContext::current().unwrap().subject(), "alice");
        });
        // Same thread, next request: nothing left behind.
        SecurityContext::sync_scope(None, || {
            assert!(SecurityContext::current().is_none());
        });
        assert!(SecurityContext::current().is_none());
    }

    #[test]
    fn threads_are_isolated() {
        std::thread::scope(|s| {
            for subject in ["alice", "bob", "carol"] {
                s.spawn(move || {
                    SecurityContext::sync_scope(Some(principal(subject)), || {
                        for _ in 0..1_000 {
                            assert_eq!(SecurityContext::current().unwrap().subject(), subject);
                            std::thread::yield_now();
                        }
                    });
                });
            }
        });
    }
}
