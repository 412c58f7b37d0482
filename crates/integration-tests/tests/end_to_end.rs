//! End-to-end behavior over a real Unix socket: client, server, registry and
//! middleware chain together.

use serde_json::{json, Value};
use sockrpc_api_rpc::{
    code, ErrorObject, Middleware, Outcome, Registry, Request, RpcServer, RpcServerConfig,
    ServerHandle,
};
use sockrpc_sdk::{CallContext, CancelCause, Error, RpcClient};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

type Log = Arc<Mutex<Vec<String>>>;

/// Appends `<name>.pre` / `<name>.post` to a shared log.
struct Recorder {
    name: &'static str,
    log: Log,
}

impl Recorder {
    fn boxed(name: &'static str, log: &Log) -> Arc<dyn Middleware> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
        })
    }
}

impl Middleware for Recorder {
    fn process_request(&self, _request: &Request) -> Result<(), ErrorObject> {
        self.log.lock().unwrap().push(format!("{}.pre", self.name));
        Ok(())
    }

    fn process_response(&self, outcome: Outcome) -> Outcome {
        self.log.lock().unwrap().push(format!("{}.post", self.name));
        outcome
    }
}

struct Fixture {
    _dir: TempDir,
    handle: ServerHandle,
    client: RpcClient,
}

impl Fixture {
    async fn start(registry: Registry) -> Self {
        let dir = tempdir().unwrap();
        let config = RpcServerConfig::new(dir.path().join("e2e.sock"));
        let handle = RpcServer::new(config, registry)
            .start()
            .await
            .unwrap();
        let client = RpcClient::new(handle.socket_path());
        Self {
            _dir: dir,
            handle,
            client,
        }
    }

    async fn shutdown(self) {
        self.handle.stop();
        self.handle.stopped().await;
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_hello_scenario() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry
        .register(
            "hello",
            |_req: Request| async { Outcome::Ok(json!("Hello World")) },
            vec![Recorder::boxed("logger", &log)],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let reply: String = fx
        .client
        .call(&CallContext::background(), "hello", ())
        .await
        .unwrap();

    assert_eq!(reply, "Hello World");
    assert_eq!(entries(&log), vec!["logger.pre", "logger.post"]);
    fx.shutdown().await;
}

#[tokio::test]
async fn test_post_hooks_run_in_registration_order() {
    let log: Log = Arc::default();
    let handler_log = Arc::clone(&log);
    let mut registry = Registry::new();
    registry
        .register(
            "work",
            move |_req: Request| {
                let log = Arc::clone(&handler_log);
                async move {
                    log.lock().unwrap().push("handler".into());
                    Outcome::Ok(Value::Null)
                }
            },
            vec![Recorder::boxed("m1", &log), Recorder::boxed("m2", &log)],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let _: Value = fx
        .client
        .call(&CallContext::background(), "work", ())
        .await
        .unwrap();

    assert_eq!(
        entries(&log),
        vec!["m1.pre", "m2.pre", "handler", "m1.post", "m2.post"]
    );
    fx.shutdown().await;
}

#[tokio::test]
async fn test_global_middleware_wraps_method_middleware() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.use_middleware(Recorder::boxed("global", &log));
    registry
        .register(
            "work",
            |_req: Request| async { Outcome::Ok(Value::Null) },
            vec![Recorder::boxed("local", &log)],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let _: Value = fx
        .client
        .call(&CallContext::background(), "work", ())
        .await
        .unwrap();

    assert_eq!(
        entries(&log),
        vec!["global.pre", "local.pre", "global.post", "local.post"]
    );
    fx.shutdown().await;
}

#[tokio::test]
async fn test_unknown_method_runs_no_middleware() {
    let log: Log = Arc::default();
    let mut registry = Registry::new();
    registry.use_middleware(Recorder::boxed("global", &log));
    registry
        .register(
            "hello",
            |_req: Request| async { Outcome::Ok(json!("Hello World")) },
            vec![Recorder::boxed("logger", &log)],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let err = fx
        .client
        .call::<_, Value>(&CallContext::background(), "ghost", ())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(entries(&log).is_empty());
    fx.shutdown().await;
}

#[tokio::test]
async fn test_handler_error_reaches_caller() {
    let mut registry = Registry::new();
    registry
        .register(
            "fail",
            |_req: Request| async {
                let data = json!({"free": 0});
                Outcome::Err(ErrorObject::application("disk full").with_data(data))
            },
            vec![],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let err = fx
        .client
        .call::<_, Value>(&CallContext::background(), "fail", ())
        .await
        .unwrap_err();

    match err {
        Error::Handler(obj) => {
            assert_eq!(obj.code, code::APPLICATION_ERROR);
            assert_eq!(obj.message, "disk full");
            assert_eq!(obj.data, Some(json!({"free": 0})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    fx.shutdown().await;
}

#[tokio::test]
async fn test_params_are_delivered() {
    #[derive(serde::Deserialize)]
    struct Add {
        a: i64,
        b: i64,
    }

    let mut registry = Registry::new();
    registry
        .register(
            "add",
            |req: Request| async move {
                req.parse_params::<Add>()
                    .map(|args| json!(args.a + args.b))
            },
            vec![],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let sum: i64 = fx
        .client
        .call(&CallContext::background(), "add", json!({"a": 2, "b": 40}))
        .await
        .unwrap();
    assert_eq!(sum, 42);

    let err = fx
        .client
        .call::<_, Value>(&CallContext::background(), "add", json!({"a": "two"}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Handler(ref obj) if obj.code == code::INVALID_PARAMS));
    fx.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_calls_get_distinct_ids() {
    let mut registry = Registry::new();
    registry
        .register(
            "whoami",
            |req: Request| async move { Outcome::Ok(json!(req.id)) },
            vec![],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let mut tasks = Vec::new();
    for _ in 0..32 {
        let client = fx.client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .call::<_, u64>(&CallContext::background(), "whoami", ())
                .await
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for task in tasks {
        assert!(ids.insert(task.await.unwrap()), "duplicate id");
    }
    assert_eq!(ids.len(), 32);
    fx.shutdown().await;
}

#[tokio::test]
async fn test_client_timeout_leaves_server_running() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let mut registry = Registry::new();
    registry
        .register(
            "slow",
            move |_req: Request| {
                let flag = Arc::clone(&flag);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    flag.store(true, Ordering::SeqCst);
                    Outcome::Ok(json!("done"))
                }
            },
            vec![],
        )
        .unwrap()
        .register(
            "hello",
            |_req: Request| async { Outcome::Ok(json!("Hello World")) },
            vec![],
        )
        .unwrap();
    let fx = Fixture::start(registry).await;

    let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
    let err = fx
        .client
        .call::<_, Value>(&ctx, "slow", ())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled(CancelCause::Deadline)));

    // The handler still runs to completion on the server
    tokio::time::timeout(Duration::from_secs(2), async {
        while !finished.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handler should finish after the client gave up");

    let reply: String = fx
        .client
        .call(&CallContext::background(), "hello", ())
        .await
        .unwrap();
    assert_eq!(reply, "Hello World");
    fx.shutdown().await;
}
