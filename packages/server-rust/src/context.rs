//! Request-scoped context store.
//!
//! Each logical request runs inside a task-local scope holding its
//! [`RequestContext`]. Lookups only ever see the scope of the task that is
//! currently being polled, so interleaved requests on the same runtime never
//! observe each other's context. The slot is released when the scoped future
//! completes or is dropped.

use std::cell::RefCell;
use std::future::Future;

use correlate_core::RequestContext;

use crate::trace;

tokio::task_local! {
    static REQUEST_CONTEXT: RefCell<Option<RequestContext>>;
}

/// Errors from mutating the request context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("no request context scope is active for this task")]
    NoScope,
}

/// Runs `fut` inside a fresh, empty request scope.
pub fn scope<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    REQUEST_CONTEXT.scope(RefCell::new(None), fut)
}

/// Runs `fut` inside a request scope pre-populated with `ctx`.
pub fn scope_with<F: Future>(ctx: RequestContext, fut: F) -> impl Future<Output = F::Output> {
    REQUEST_CONTEXT.scope(RefCell::new(Some(ctx)), fut)
}

/// Replaces the context visible to the current request.
///
/// # Errors
///
/// Returns [`ContextError::NoScope`] when called outside [`scope`] or
/// [`scope_with`].
pub fn set(ctx: RequestContext) -> Result<(), ContextError> {
    REQUEST_CONTEXT
        .try_with(|slot| {
            *slot.borrow_mut() = Some(ctx);
        })
        .map_err(|_| ContextError::NoScope)
}

/// Edits the current request's context, starting from an empty context if
/// none has been set yet.
///
/// `f` runs on a copy with no borrow of the slot held, so it may log or read
/// the context; those reads see the value from before the edit. The copy is
/// written back once `f` returns.
///
/// # Errors
///
/// Returns [`ContextError::NoScope`] when called outside a request scope.
pub fn update(f: impl FnOnce(&mut RequestContext)) -> Result<(), ContextError> {
    let mut ctx = REQUEST_CONTEXT
        .try_with(|slot| slot.borrow().clone().unwrap_or_default())
        .map_err(|_| ContextError::NoScope)?;
    f(&mut ctx);
    set(ctx)
}

/// Returns a snapshot of the current request's context, if any.
#[must_use]
pub fn get() -> Option<RequestContext> {
    REQUEST_CONTEXT
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

/// Carries the caller's request context and active trace context into `fut`.
///
/// Task-locals do not follow `tokio::spawn`; wrap the spawned future with
/// this so logs and spans inside it stay attached to the originating request.
pub fn inherit<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    let ctx = get();
    let cx = trace::current_context();
    REQUEST_CONTEXT.scope(RefCell::new(ctx), trace::with_context(cx, fut))
}
