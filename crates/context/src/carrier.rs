//! Installing, reading and propagating the request context.
//!
//! There is no free-standing "set" or "clear": [`ContextCarrier::scope`] does
//! both, installing the context for exactly the lifetime of the wrapped
//! future. Work handed to the runtime goes through [`ContextCarrier::spawn`] /
//! [`ContextCarrier::spawn_blocking`] / [`ContextCarrier::propagate`], which
//! capture the submitter's context at submission time.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::task::futures::TaskLocalFuture;

use rowgate_core::{GuardError, GuardResult, TenantId, UserContext};

use crate::RequestContext;
use crate::selection::{DataSourceSelection, PoolHandle, SelectionTicket};

tokio::task_local! {
    static CURRENT: RequestContext;
    static TENANT_LINE_SUSPENDED: bool;
}

/// Access point for the context of the running task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextCarrier;

impl ContextCarrier {
    /// Run `fut` with `ctx` installed. The context is dropped when the
    /// returned future finishes or is dropped.
    pub fn scope<F: Future>(ctx: RequestContext, fut: F) -> TaskLocalFuture<RequestContext, F> {
        tracing::trace!(tenant_id = ?ctx.tenant_id(), "request context installed");
        CURRENT.scope(ctx, fut)
    }

    /// Synchronous counterpart of [`ContextCarrier::scope`]; also cleans up on unwind.
    pub fn sync_scope<R>(ctx: RequestContext, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(ctx, f)
    }

    /// Snapshot of the installed context, if any.
    pub fn current() -> Option<RequestContext> {
        CURRENT.try_with(RequestContext::clone).ok()
    }

    /// Borrow the installed context without cloning it.
    pub fn with<R>(f: impl FnOnce(&RequestContext) -> R) -> Option<R> {
        CURRENT.try_with(f).ok()
    }

    pub fn is_active() -> bool {
        CURRENT.try_with(|_| ()).is_ok()
    }

    pub fn tenant_id() -> Option<TenantId> {
        Self::with(RequestContext::tenant_id).flatten()
    }

    pub fn user() -> Option<Arc<UserContext>> {
        Self::with(RequestContext::shared_user).flatten()
    }

    /// Run `fut` with the tenant-line filter suspended for every statement
    /// it issues. Data-scope filtering is unaffected.
    pub fn without_tenant_line<F: Future>(fut: F) -> TaskLocalFuture<bool, F> {
        TENANT_LINE_SUSPENDED.scope(true, fut)
    }

    pub fn tenant_line_suspended() -> bool {
        TENANT_LINE_SUSPENDED.try_with(|s| *s).unwrap_or(false)
    }

    /// Push a datasource key onto the running task's selection stack.
    pub fn push_datasource(key: impl Into<String>) -> GuardResult<SelectionTicket> {
        let key = key.into();
        CURRENT
            .try_with(|ctx| ctx.push_datasource(key))
            .map_err(|_| GuardError::NoActiveContext)
    }

    /// Push a datasource key and its pool onto the running task's stack.
    pub fn select_datasource(key: impl Into<String>, pool: PoolHandle) -> GuardResult<SelectionTicket> {
        let key = key.into();
        CURRENT
            .try_with(|ctx| ctx.select_datasource(key, pool))
            .map_err(|_| GuardError::NoActiveContext)
    }

    pub fn current_selection() -> Option<DataSourceSelection> {
        Self::with(RequestContext::current_selection).flatten()
    }

    pub fn pop_datasource() -> Option<String> {
        Self::with(RequestContext::pop_datasource).flatten()
    }

    pub fn current_datasource() -> Option<String> {
        Self::with(RequestContext::current_datasource).flatten()
    }

    pub fn datasource_depth() -> usize {
        Self::with(RequestContext::datasource_depth).unwrap_or(0)
    }

    /// Wrap `fut` so that, wherever it is polled, it observes the context the
    /// caller holds right now.
    pub fn propagate<F>(fut: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let ctx = Self::current();
        let suspended = Self::tenant_line_suspended();
        async move {
            match ctx {
                Some(ctx) if suspended => {
                    CURRENT.scope(ctx, TENANT_LINE_SUSPENDED.scope(true, fut)).await
                }
                Some(ctx) => CURRENT.scope(ctx, fut).await,
                None => fut.await,
            }
        }
    }

    /// `tokio::spawn` carrying the caller's context into the new task.
    pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(Self::propagate(fut))
    }

    /// `tokio::task::spawn_blocking` carrying the caller's context onto the
    /// blocking pool thread for the duration of `f`.
    pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let ctx = Self::current();
        let suspended = Self::tenant_line_suspended();
        tokio::task::spawn_blocking(move || {
            let run = move || {
                if suspended {
                    TENANT_LINE_SUSPENDED.sync_scope(true, f)
                } else {
                    f()
                }
            };
            match ctx {
                Some(ctx) => CURRENT.sync_scope(ctx, run),
                None => run(),
            }
        })
    }
}
