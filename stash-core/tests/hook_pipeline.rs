use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use stash_core::{
    hook_fn, intercept_fn, run_hooked, ErrorKind, HookContext, HookFn, InterceptStage, Operation,
    OperationCategory, RepositoryHooks, SharedHooks, StashError, StashResult,
};

/// Test factory functions
fn create_op() -> Operation {
    Operation::new("create_file", OperationCategory::Create)
}

fn logging_hook(log: Arc<Mutex<Vec<String>>>, label: &'static str) -> HookFn {
    hook_fn(move |_ctx: &mut HookContext| {
        log.lock().unwrap().push(label.to_string());
        Box::pin(async { Ok(()) })
    })
}

async fn succeed_with(value: u64) -> StashResult<u64> {
    Ok(value)
}

/// 1. Stages run in strict sequence
#[tokio::test]
async fn test_stage_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let intercept_log = log.clone();
    let hooks = RepositoryHooks::new()
        .before(OperationCategory::Create, logging_hook(log.clone(), "before"))
        .after(OperationCategory::Create, logging_hook(log.clone(), "after"))
        .intercept(intercept_fn(move |stage, ctx| {
            let label = match stage {
                InterceptStage::Pre => "intercept:pre",
                InterceptStage::Post => "intercept:post",
            };
            intercept_log.lock().unwrap().push(label.to_string());
            Box::pin(async move { Ok(ctx) })
        }));

    let op_log = log.clone();
    let result = run_hooked(&hooks, create_op(), Some(json!({ "key": "k1" })), || {
        let op_log = op_log.clone();
        async move {
            op_log.lock().unwrap().push("operation".to_string());
            Ok(42u64)
        }
    })
    .await
    .unwrap();

    assert_eq!(result, 42);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["intercept:pre", "before", "operation", "intercept:post", "after"]
    );
}

/// 2. Hook failures never alter the operation outcome
#[tokio::test]
async fn test_before_hook_failure_is_isolated() {
    let hooks = RepositoryHooks::new().before(
        OperationCategory::Create,
        hook_fn(|_ctx: &mut HookContext| Box::pin(async { Err(anyhow::anyhow!("before blew up")) })),
    );

    let result = run_hooked(&hooks, create_op(), None, || succeed_with(7)).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test]
async fn test_after_hook_failure_is_isolated() {
    let hooks = RepositoryHooks::new().after(
        OperationCategory::Create,
        hook_fn(|_ctx: &mut HookContext| Box::pin(async { Err(anyhow::anyhow!("after blew up")) })),
    );

    let result = run_hooked(&hooks, create_op(), None, || succeed_with(7)).await;
    assert_eq!(result.unwrap(), 7);
}

/// 3. Failing hooks notify the error hook with a synthetic context
#[tokio::test]
async fn test_hook_failure_notifies_error_hook() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_hook = seen.clone();
    let hooks = RepositoryHooks::new()
        .before(
            OperationCategory::Create,
            hook_fn(|_ctx: &mut HookContext| {
                Box::pin(async { Err(anyhow::anyhow!("audit sink down")) })
            }),
        )
        .on_error(hook_fn(move |ctx: &mut HookContext| {
            seen_hook.lock().unwrap().push(ctx.to_json());
            Box::pin(async { Ok(()) })
        }));

    let result = run_hooked(&hooks, create_op(), Some(json!({ "key": "k1" })), || {
        succeed_with(1)
    })
    .await;
    assert_eq!(result.unwrap(), 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["operation"], "hook_error");
    assert_eq!(seen[0]["error"], "audit sink down");
    assert_eq!(seen[0]["metadata"]["stage"], "before");
    assert_eq!(seen[0]["metadata"]["origin_context"]["operation"], "create_file");
}

/// 4. Error hook runs exactly once and the error is re-raised unchanged
#[tokio::test]
async fn test_operation_failure_reaches_error_hook_and_caller() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let kinds = Arc::new(Mutex::new(Vec::new()));

    let invocations_hook = invocations.clone();
    let kinds_hook = kinds.clone();
    let hooks = RepositoryHooks::new().on_error(hook_fn(move |ctx: &mut HookContext| {
        invocations_hook.fetch_add(1, Ordering::SeqCst);
        if let Some(snapshot) = &ctx.error {
            kinds_hook.lock().unwrap().push((snapshot.kind, snapshot.message.clone()));
        }
        Box::pin(async { Ok(()) })
    }));

    let result: StashResult<u64> = run_hooked(&hooks, create_op(), None, || async {
        Err(StashError::not_found("file not found")
            .with_data(json!({ "id": "f1" }))
            .into_anyhow())
    })
    .await;

    let err = result.unwrap_err();
    let stash = StashError::from_anyhow(&err).expect("structured error preserved");
    assert_eq!(stash.kind, ErrorKind::NotFound);
    assert_eq!(stash.message, "file not found");
    assert_eq!(stash.data, Some(json!({ "id": "f1" })));

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(
        *kinds.lock().unwrap(),
        vec![(Some(ErrorKind::NotFound), "file not found".to_string())]
    );
}

/// 5. Error-hook failures are swallowed, not re-forwarded
#[tokio::test]
async fn test_error_hook_failure_does_not_mask_original_error() {
    let hooks = RepositoryHooks::new().on_error(hook_fn(|_ctx: &mut HookContext| {
        Box::pin(async { Err(anyhow::anyhow!("error hook also broken")) })
    }));

    let result: StashResult<u64> = run_hooked(&hooks, create_op(), None, || async {
        Err(StashError::conflict("duplicate key").into_anyhow())
    })
    .await;

    let err = result.unwrap_err();
    let stash = StashError::from_anyhow(&err).unwrap();
    assert_eq!(stash.kind, ErrorKind::Conflict);
    assert_eq!(stash.message, "duplicate key");
}

/// 6. Interceptor may replace the working context
#[tokio::test]
async fn test_interceptor_replaces_context() {
    let observed = Arc::new(Mutex::new(None));

    let observed_hook = observed.clone();
    let hooks = RepositoryHooks::new()
        .intercept(intercept_fn(|stage, mut ctx| {
            if stage == InterceptStage::Pre {
                ctx.metadata.insert("trace_id".to_string(), json!("t-123"));
            }
            Box::pin(async move { Ok(ctx) })
        }))
        .before(
            OperationCategory::Create,
            hook_fn(move |ctx: &mut HookContext| {
                *observed_hook.lock().unwrap() = ctx.metadata.get("trace_id").cloned();
                Box::pin(async { Ok(()) })
            }),
        );

    run_hooked(&hooks, create_op(), None, || succeed_with(1))
        .await
        .unwrap();

    assert_eq!(*observed.lock().unwrap(), Some(json!("t-123")));
}

/// 7. Interceptor failure falls back to the original context
#[tokio::test]
async fn test_interceptor_failure_keeps_original_context() {
    let observed = Arc::new(Mutex::new(None));

    let observed_hook = observed.clone();
    let hooks = RepositoryHooks::new()
        .intercept(intercept_fn(|_stage, _ctx| {
            Box::pin(async { Err(anyhow::anyhow!("interceptor refused")) })
        }))
        .before(
            OperationCategory::Create,
            hook_fn(move |ctx: &mut HookContext| {
                *observed_hook.lock().unwrap() = ctx.data.clone();
                Box::pin(async { Ok(()) })
            }),
        );

    let result = run_hooked(&hooks, create_op(), Some(json!({ "key": "k1" })), || {
        succeed_with(9)
    })
    .await;

    // Operation never aborted because of interceptor failure.
    assert_eq!(result.unwrap(), 9);
    // Before hook saw the pre-interceptor context.
    assert_eq!(*observed.lock().unwrap(), Some(json!({ "key": "k1" })));
}

/// 8. Post-stage interceptor sees the result
#[tokio::test]
async fn test_post_interceptor_sees_result_and_duration() {
    let observed = Arc::new(Mutex::new(None));

    let observed_hook = observed.clone();
    let hooks = RepositoryHooks::new().intercept(intercept_fn(move |stage, ctx| {
        if stage == InterceptStage::Post {
            *observed_hook.lock().unwrap() =
                Some((ctx.result.clone(), ctx.metadata.get("duration").cloned()));
        }
        Box::pin(async move { Ok(ctx) })
    }));

    run_hooked(&hooks, create_op(), None, || succeed_with(11))
        .await
        .unwrap();

    let (result, duration) = observed.lock().unwrap().take().unwrap();
    assert_eq!(result, Some(json!(11)));
    assert!(matches!(duration, Some(Value::Number(_))));
}

/// 9. Duration is attached on the failure path too
#[tokio::test]
async fn test_duration_attached_on_failure() {
    let duration = Arc::new(Mutex::new(None));

    let duration_hook = duration.clone();
    let hooks = RepositoryHooks::new().on_error(hook_fn(move |ctx: &mut HookContext| {
        *duration_hook.lock().unwrap() = ctx.metadata.get("duration").cloned();
        Box::pin(async { Ok(()) })
    }));

    let result: StashResult<u64> = run_hooked(&hooks, create_op(), None, || async {
        Err(StashError::internal("backend down").into_anyhow())
    })
    .await;

    assert!(result.is_err());
    assert!(matches!(
        duration.lock().unwrap().take(),
        Some(Value::Number(_))
    ));
}

/// 10. Counter hook survives its own failures
#[tokio::test]
async fn test_counter_hook_with_one_throwing_invocation() {
    let counter = Arc::new(AtomicUsize::new(0));

    let counter_hook = counter.clone();
    let hooks = RepositoryHooks::new().after(
        OperationCategory::Create,
        hook_fn(move |_ctx: &mut HookContext| {
            let n = counter_hook.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move {
                if n == 2 {
                    Err(anyhow::anyhow!("flaky hook"))
                } else {
                    Ok(())
                }
            })
        }),
    );

    for _ in 0..3 {
        let result = run_hooked(&hooks, create_op(), None, || succeed_with(1)).await;
        assert_eq!(result.unwrap(), 1);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

/// 11. Snapshot-at-entry: mutations apply only to later calls
#[tokio::test]
async fn test_shared_hooks_snapshot_semantics() {
    let counter = Arc::new(AtomicUsize::new(0));
    let shared = SharedHooks::new(RepositoryHooks::new());

    // Snapshot taken before registration: hook must not fire.
    let stale = shared.snapshot();

    let counter_hook = counter.clone();
    shared.set_after(
        OperationCategory::Create,
        hook_fn(move |_ctx: &mut HookContext| {
            counter_hook.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }),
    );

    run_hooked(&stale, create_op(), None, || succeed_with(1))
        .await
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    // A fresh snapshot picks the hook up.
    let fresh = shared.snapshot();
    run_hooked(&fresh, create_op(), None, || succeed_with(1))
        .await
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Removal behaves the same way.
    shared.remove_after(OperationCategory::Create);
    run_hooked(&shared.snapshot(), create_op(), None, || succeed_with(1))
        .await
        .unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
