//! End-to-end tests for the assembled prober.
//!
//! Runs the real runner against local HTTP fixtures with the metrics
//! collector attached, and checks what the query surface reports.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use tokio::sync::watch;
use tower::ServiceExt;

use siteprobe_api::build_router;
use siteprobe_core::{ProberConfig, TargetResult};
use siteprobe_metrics::ProbeMetrics;
use siteprobe_probe::{NON_SUCCESS_STATUS, Runner};

async fn fixture(status: StatusCode) -> String {
    let app = Router::new().route("/", get(move || async move { status }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/")
}

fn refused_target() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn wait_ready(runner: &Runner) {
    for _ in 0..500 {
        if runner.ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("runner never became ready");
}

struct Stack {
    runner: Runner,
    router: Router,
    shutdown: watch::Sender<bool>,
    handle: siteprobe_probe::RunnerHandle,
}

fn start_stack(targets: Vec<String>, interval: Duration) -> Stack {
    let config = ProberConfig {
        targets,
        interval,
        timeout: Duration::from_secs(2),
        ..ProberConfig::default()
    };
    let metrics = Arc::new(ProbeMetrics::new());
    let runner = Runner::new(&config)
        .unwrap()
        .with_observer(metrics.observer());
    let (shutdown, rx) = watch::channel(false);
    let handle = runner.start(rx).unwrap();
    let router = build_router(runner.clone(), metrics);
    Stack {
        runner,
        router,
        shutdown,
        handle,
    }
}

impl Stack {
    async fn stop(self) {
        let _ = self.shutdown.send(true);
        assert!(self.handle.join(Duration::from_secs(3)).await);
    }
}

#[tokio::test]
async fn results_reflect_each_target_outcome() {
    let ok = fixture(StatusCode::OK).await;
    let unavailable = fixture(StatusCode::SERVICE_UNAVAILABLE).await;
    let down = refused_target();

    let stack = start_stack(
        vec![ok.clone(), unavailable.clone(), down.clone()],
        Duration::from_secs(60),
    );
    wait_ready(&stack.runner).await;

    let resp = stack.router.clone().oneshot(get_req("/results")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let results: Vec<TargetResult> = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(results.len(), 3);

    let find = |t: &str| results.iter().find(|r| r.target == t).unwrap().clone();

    let ok_result = find(&ok);
    assert_eq!(ok_result.status, 200);
    assert!(ok_result.up);
    assert!(ok_result.error.is_empty());
    assert_eq!(ok_result.consecutive_failures, 0);

    let unavailable_result = find(&unavailable);
    assert_eq!(unavailable_result.status, 503);
    assert!(!unavailable_result.up);
    assert_eq!(unavailable_result.error, NON_SUCCESS_STATUS);
    assert_eq!(unavailable_result.consecutive_failures, 1);

    let down_result = find(&down);
    assert_eq!(down_result.status, 0);
    assert!(!down_result.up);
    assert!(!down_result.error.is_empty());
    assert_eq!(down_result.consecutive_failures, 1);

    stack.stop().await;
}

#[tokio::test]
async fn readyz_flips_after_first_round() {
    let ok = fixture(StatusCode::OK).await;
    let stack = start_stack(vec![ok], Duration::from_secs(60));

    wait_ready(&stack.runner).await;
    let resp = stack.router.clone().oneshot(get_req("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");

    let resp = stack.router.clone().oneshot(get_req("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    stack.stop().await;
}

#[tokio::test]
async fn metrics_expose_probe_series() {
    let ok = fixture(StatusCode::OK).await;
    let unavailable = fixture(StatusCode::SERVICE_UNAVAILABLE).await;
    let down = refused_target();

    let stack = start_stack(
        vec![ok.clone(), unavailable.clone(), down.clone()],
        Duration::from_secs(60),
    );
    wait_ready(&stack.runner).await;

    let resp = stack.router.clone().oneshot(get_req("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;

    assert!(body.contains(&format!("site_prober_up{{target=\"{ok}\"}} 1")));
    assert!(body.contains(&format!("site_prober_up{{target=\"{unavailable}\"}} 0")));
    assert!(body.contains(&format!("site_prober_up{{target=\"{down}\"}} 0")));
    assert!(body.contains(&format!(
        "site_prober_consecutive_failures{{target=\"{down}\"}} 1"
    )));
    assert!(body.contains(&format!(
        "site_prober_request_duration_seconds_count{{target=\"{ok}\",code=\"success\"}} 1"
    )));
    assert!(body.contains(&format!(
        "site_prober_request_duration_seconds_count{{target=\"{unavailable}\",code=\"503\"}} 1"
    )));
    assert!(body.contains(&format!(
        "site_prober_request_duration_seconds_count{{target=\"{down}\",code=\"error\"}} 1"
    )));

    stack.stop().await;
}

#[tokio::test]
async fn streak_grows_while_target_stays_down() {
    let down = refused_target();
    let stack = start_stack(vec![down.clone()], Duration::from_millis(30));
    wait_ready(&stack.runner).await;

    let mut latest = None;
    for _ in 0..300 {
        let result = stack.runner.store().get(&down).await.unwrap();
        if result.consecutive_failures >= 3 {
            latest = Some(result);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let latest = latest.expect("streak never reached 3");
    assert!(!latest.up);
    assert!(stack.runner.ready());

    stack.stop().await;
}

#[tokio::test]
async fn empty_configuration_is_ready_with_no_results() {
    let stack = start_stack(Vec::new(), Duration::from_secs(60));

    let resp = stack.router.clone().oneshot(get_req("/readyz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = stack.router.clone().oneshot(get_req("/results")).await.unwrap();
    let results: Vec<TargetResult> = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(results.is_empty());

    stack.stop().await;
}
