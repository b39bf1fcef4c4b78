//! # Hook execution engine
//!
//! Every repository operation runs through [`run_hooked`], which
//! surrounds the backend call with lifecycle notifications:
//!
//! ```text
//! interceptor(pre) → before hook → operation → interceptor(post) → after hook
//!                                      └─ on failure → error hook
//! ```
//!
//! Hooks are strictly observational. The operation's success/failure
//! and its return value are determined solely by the operation itself;
//! a hook that fails is logged and contained, never propagated to the
//! caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{ErrorKind, StashError, StashResult};

/// Operation categories a hook can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationCategory {
    Create,
    Read,
    Update,
    Delete,
    Query,
}

/// Name + category of one repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub category: OperationCategory,
}

impl Operation {
    pub const fn new(name: &'static str, category: OperationCategory) -> Self {
        Self { name, category }
    }
}

/// When in the pipeline the interceptor is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptStage {
    Pre,
    Post,
}

/// Which hook failed, for the synthetic `hook_error` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Before,
    After,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::Before => "before",
            HookStage::After => "after",
        }
    }
}

/// Observable summary of the operation's failure.
///
/// The thrown `anyhow::Error` itself is owned by the engine and
/// re-raised unchanged; the context carries this snapshot so hooks can
/// react to the kind and message without taking ownership.
#[derive(Debug, Clone)]
pub struct ErrorSnapshot {
    /// Set when the error is a structured [`StashError`].
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl ErrorSnapshot {
    pub fn capture(err: &anyhow::Error) -> Self {
        match StashError::from_anyhow(err) {
            Some(stash) => Self {
                kind: Some(stash.kind),
                message: stash.message.clone(),
            },
            None => Self {
                kind: None,
                message: err.to_string(),
            },
        }
    }
}

/// Per-call state threaded through every lifecycle stage.
///
/// Created fresh at the start of each wrapped operation, mutated in
/// place as it passes through the stages, discarded when the call
/// returns. Never persisted or shared across calls.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub operation: &'static str,
    pub category: OperationCategory,
    /// The operation's input payload, when it has one.
    pub data: Option<Value>,
    /// The operation's output, populated after success.
    pub result: Option<Value>,
    /// Populated after failure.
    pub error: Option<ErrorSnapshot>,
    /// Free-form bag; always contains `duration` (milliseconds) once
    /// the operation has completed either way.
    pub metadata: Map<String, Value>,
    pub started_at: Instant,
}

impl HookContext {
    pub fn new(operation: Operation, data: Option<Value>) -> Self {
        Self {
            operation: operation.name,
            category: operation.category,
            data,
            result: None,
            error: None,
            metadata: Map::new(),
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Record the elapsed duration into the metadata bag.
    pub(crate) fn finish(&mut self) {
        self.metadata
            .insert("duration".to_string(), Value::from(self.elapsed_ms()));
    }

    /// Observable fields as JSON, for nesting into another context.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "operation": self.operation,
            "category": self.category,
            "data": self.data,
            "result": self.result,
            "error": self.error.as_ref().map(|e| e.message.clone()),
            "metadata": Value::Object(self.metadata.clone()),
        })
    }
}

/// A before/after/error hook.
///
/// The hook gets synchronous mutable access to the context (read the
/// payload, annotate metadata) and returns a future for any async
/// follow-up work. The future must not borrow the context.
pub type HookFuture = BoxFuture<'static, Result<()>>;
pub type HookFn = Arc<dyn Fn(&mut HookContext) -> HookFuture + Send + Sync>;

/// The generic interceptor: runs at both stages of every operation and
/// may return a replacement context.
pub type InterceptFn = Arc<
    dyn Fn(InterceptStage, HookContext) -> BoxFuture<'static, Result<HookContext>> + Send + Sync,
>;

/// Wrap a closure into a [`HookFn`].
pub fn hook_fn<F>(f: F) -> HookFn
where
    F: Fn(&mut HookContext) -> HookFuture + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure into an [`InterceptFn`].
pub fn intercept_fn<F>(f: F) -> InterceptFn
where
    F: Fn(InterceptStage, HookContext) -> BoxFuture<'static, Result<HookContext>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// The registration table: optional callbacks keyed by lifecycle stage
/// and operation category, plus one error hook and one interceptor.
#[derive(Clone, Default)]
pub struct RepositoryHooks {
    before: HashMap<OperationCategory, HookFn>,
    after: HashMap<OperationCategory, HookFn>,
    on_error: Option<HookFn>,
    intercept: Option<InterceptFn>,
}

impl RepositoryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, category: OperationCategory, hook: HookFn) -> Self {
        self.before.insert(category, hook);
        self
    }

    pub fn after(mut self, category: OperationCategory, hook: HookFn) -> Self {
        self.after.insert(category, hook);
        self
    }

    pub fn on_error(mut self, hook: HookFn) -> Self {
        self.on_error = Some(hook);
        self
    }

    pub fn intercept(mut self, interceptor: InterceptFn) -> Self {
        self.intercept = Some(interceptor);
        self
    }

    pub fn set_before(&mut self, category: OperationCategory, hook: HookFn) {
        self.before.insert(category, hook);
    }

    pub fn remove_before(&mut self, category: OperationCategory) {
        self.before.remove(&category);
    }

    pub fn set_after(&mut self, category: OperationCategory, hook: HookFn) {
        self.after.insert(category, hook);
    }

    pub fn remove_after(&mut self, category: OperationCategory) {
        self.after.remove(&category);
    }

    pub fn set_error(&mut self, hook: HookFn) {
        self.on_error = Some(hook);
    }

    pub fn remove_error(&mut self) {
        self.on_error = None;
    }

    pub fn set_intercept(&mut self, interceptor: InterceptFn) {
        self.intercept = Some(interceptor);
    }

    pub fn remove_intercept(&mut self) {
        self.intercept = None;
    }
}

/// The hook table as held by a repository instance.
///
/// Mutable at runtime; every wrapped call takes a [`snapshot`] at
/// entry, so a mutation mid-flight only affects calls started after
/// it. Registration is expected to be startup-time configuration, not
/// a hot-path activity.
///
/// [`snapshot`]: SharedHooks::snapshot
#[derive(Clone, Default)]
pub struct SharedHooks {
    inner: Arc<RwLock<RepositoryHooks>>,
}

impl SharedHooks {
    pub fn new(initial: RepositoryHooks) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Clone the current table (cheap: the callbacks are `Arc`s).
    pub fn snapshot(&self) -> RepositoryHooks {
        self.inner.read().clone()
    }

    pub fn set_before(&self, category: OperationCategory, hook: HookFn) {
        self.inner.write().set_before(category, hook);
    }

    pub fn remove_before(&self, category: OperationCategory) {
        self.inner.write().remove_before(category);
    }

    pub fn set_after(&self, category: OperationCategory, hook: HookFn) {
        self.inner.write().set_after(category, hook);
    }

    pub fn remove_after(&self, category: OperationCategory) {
        self.inner.write().remove_after(category);
    }

    pub fn set_error(&self, hook: HookFn) {
        self.inner.write().set_error(hook);
    }

    pub fn remove_error(&self) {
        self.inner.write().remove_error();
    }

    pub fn set_intercept(&self, interceptor: InterceptFn) {
        self.inner.write().set_intercept(interceptor);
    }

    pub fn remove_intercept(&self) {
        self.inner.write().remove_intercept();
    }
}

/// Execute `op` exactly once, surrounded by lifecycle notifications.
///
/// Stage order and failure semantics:
/// 1. A fresh [`HookContext`] is built from the operation name and
///    input payload.
/// 2. The interceptor (pre stage) may replace the context. If it
///    fails, the pre-interceptor context is kept and the failure is
///    only logged.
/// 3. The before hook for the operation's category runs. If it fails,
///    the failure is logged, the error hook is notified once with a
///    synthetic `hook_error` context, and the operation proceeds.
/// 4. `op` runs. This is the only stage whose error reaches the
///    caller.
/// 5. On success: result and duration are attached, the interceptor
///    (post stage) and the after hook run with the same isolation as
///    steps 2–3, and the operation's value is returned.
/// 6. On failure: error and duration are attached, the error hook runs
///    (its own failure is logged, never re-forwarded), and the
///    original error is re-raised unchanged.
pub async fn run_hooked<T, F, Fut>(
    hooks: &RepositoryHooks,
    operation: Operation,
    data: Option<Value>,
    op: F,
) -> StashResult<T>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = StashResult<T>>,
{
    let mut ctx = HookContext::new(operation, data);

    if let Some(intercept) = &hooks.intercept {
        match intercept(InterceptStage::Pre, ctx.clone()).await {
            Ok(replaced) => ctx = replaced,
            Err(err) => {
                warn!(operation = operation.name, error = %err, "interceptor failed at pre stage, continuing with original context");
            }
        }
    }

    if let Some(before) = hooks.before.get(&operation.category) {
        if let Err(err) = before(&mut ctx).await {
            warn!(operation = operation.name, error = %err, "before hook failed, operation proceeds");
            notify_hook_failure(hooks, &ctx, HookStage::Before, &err).await;
        }
    }

    match op().await {
        Ok(value) => {
            ctx.result = serde_json::to_value(&value).ok();
            ctx.finish();

            if let Some(intercept) = &hooks.intercept {
                match intercept(InterceptStage::Post, ctx.clone()).await {
                    Ok(replaced) => ctx = replaced,
                    Err(err) => {
                        warn!(operation = operation.name, error = %err, "interceptor failed at post stage, continuing with original context");
                    }
                }
            }

            if let Some(after) = hooks.after.get(&operation.category) {
                if let Err(err) = after(&mut ctx).await {
                    warn!(operation = operation.name, error = %err, "after hook failed");
                    notify_hook_failure(hooks, &ctx, HookStage::After, &err).await;
                }
            }

            Ok(value)
        }
        Err(err) => {
            ctx.error = Some(ErrorSnapshot::capture(&err));
            ctx.finish();

            if let Some(on_error) = &hooks.on_error {
                if let Err(hook_err) = on_error(&mut ctx).await {
                    // Stops here; error-hook failures are never re-forwarded.
                    warn!(operation = operation.name, error = %hook_err, "error hook failed");
                }
            }

            Err(err)
        }
    }
}

/// Forward a before/after hook failure to the error hook, once, with a
/// synthetic context describing what failed.
async fn notify_hook_failure(
    hooks: &RepositoryHooks,
    origin: &HookContext,
    stage: HookStage,
    err: &anyhow::Error,
) {
    let Some(on_error) = &hooks.on_error else {
        return;
    };

    let mut ctx = HookContext::new(Operation::new("hook_error", origin.category), None);
    ctx.error = Some(ErrorSnapshot {
        kind: None,
        message: err.to_string(),
    });
    ctx.metadata
        .insert("stage".to_string(), Value::from(stage.as_str()));
    ctx.metadata
        .insert("origin_context".to_string(), origin.to_json());

    if let Err(hook_err) = on_error(&mut ctx).await {
        warn!(error = %hook_err, "error hook failed while handling a hook failure");
    }
}
