// Tests for the enumeration engine

use dirgraph_scanner::baseline::collect_baseline;
use dirgraph_scanner::client::build_scan_client;
use dirgraph_scanner::enumerate::Enumerator;
use dirgraph_scanner::BaselineSignature;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn candidates(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// The canonical scenario: a real page, a forbidden page and a soft-404
/// catch-all that answers 200 for everything else.
#[tokio::test]
async fn test_soft_404_scenario() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Page Not Found"))
        .mount(&mock_server)
        .await;

    let client = build_scan_client(5).unwrap();
    let base = Url::parse(&mock_server.uri()).unwrap();

    let baseline = collect_baseline(&client, &base, 3).await.unwrap();
    assert_eq!(baseline.len(), 1);

    let found_paths: Arc<std::sync::Mutex<Vec<String>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let found_clone = found_paths.clone();

    let enumerator = Enumerator::new(client, base)
        .with_concurrency(4)
        .with_found_callback(Arc::new(move |finding| {
            found_clone.lock().unwrap().push(finding.path.clone());
        }));

    let outcome = enumerator
        .run(&candidates(&["/admin", "/secret", "/missing1"]), &baseline)
        .await
        .unwrap();

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.completed, 3);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.findings.len(), 2);

    let admin = outcome
        .findings
        .iter()
        .find(|f| f.path == "/admin")
        .expect("admin should be found");
    assert_eq!(admin.status, 200);
    assert!(admin.note.is_none());

    let secret = outcome
        .findings
        .iter()
        .find(|f| f.path == "/secret")
        .expect("secret should be found");
    assert_eq!(secret.status, 403);
    assert_eq!(secret.note.as_deref(), Some("auth-required"));

    assert!(!outcome.findings.iter().any(|f| f.path == "/missing1"));

    let published = found_paths.lock().unwrap();
    assert_eq!(published.len(), 2);
    assert!(!published.contains(&"/missing1".to_string()));
}

/// Every candidate produces exactly one done increment, no loss and no
/// double counting, for concurrency well below the candidate count.
#[tokio::test]
async fn test_exactly_once_accounting() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let client = build_scan_client(5).unwrap();
    let base = Url::parse(&mock_server.uri()).unwrap();

    let total_candidates = 50;
    let paths: Vec<String> = (0..total_candidates).map(|i| format!("/p{}", i)).collect();

    let increments = Arc::new(AtomicUsize::new(0));
    let increments_clone = increments.clone();
    let last_completed = Arc::new(AtomicUsize::new(0));
    let last_clone = last_completed.clone();

    let enumerator = Enumerator::new(client, base)
        .with_concurrency(7)
        .with_progress_callback(Arc::new(move |completed, total| {
            increments_clone.fetch_add(1, Ordering::SeqCst);
            // progress values arrive in order from the aggregator
            assert!(completed > last_clone.swap(completed, Ordering::SeqCst));
            assert_eq!(total, total_candidates);
        }));

    let outcome = enumerator
        .run(&paths, &BaselineSignature::default())
        .await
        .unwrap();

    assert_eq!(outcome.completed, total_candidates);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(increments.load(Ordering::SeqCst), total_candidates);
    assert_eq!(last_completed.load(Ordering::SeqCst), total_candidates);
}

/// Cancellation mid-run: accounting still balances and nothing is found
/// after the flag is observed.
#[tokio::test]
async fn test_cancellation_mid_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("hello")
                .set_delay(std::time::Duration::from_millis(25)),
        )
        .mount(&mock_server)
        .await;

    let client = build_scan_client(5).unwrap();
    let base = Url::parse(&mock_server.uri()).unwrap();

    let paths: Vec<String> = (0..60).map(|i| format!("/page{}", i)).collect();
    let cancel = Arc::new(AtomicBool::new(false));

    let cancel_clone = cancel.clone();
    let found_count = Arc::new(AtomicUsize::new(0));
    let found_clone = found_count.clone();

    let enumerator = Enumerator::new(client, base)
        .with_concurrency(4)
        .with_cancel_flag(cancel.clone())
        .with_found_callback(Arc::new(move |_finding| {
            found_clone.fetch_add(1, Ordering::SeqCst);
            // cancel as soon as the first finding lands
            cancel_clone.store(true, Ordering::SeqCst);
        }));

    let outcome = enumerator
        .run(&paths, &BaselineSignature::default())
        .await
        .unwrap();

    assert!(outcome.skipped > 0, "cancellation should skip candidates");
    assert_eq!(outcome.completed + outcome.skipped, outcome.total);
    // findings recorded == found events published, all before the cancel
    assert_eq!(outcome.findings.len(), found_count.load(Ordering::SeqCst));
}

/// Transport failures after retries count as done without being found, and
/// never abort the run.
#[tokio::test]
async fn test_unreachable_candidates_counted_not_found() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = build_scan_client(1).unwrap();
    let base = Url::parse(&format!("http://{}", addr)).unwrap();

    let enumerator = Enumerator::new(client, base)
        .with_concurrency(3)
        .with_retries(1)
        .with_retry_backoff(std::time::Duration::from_millis(10));

    let outcome = enumerator
        .run(
            &candidates(&["/a", "/b", "/c"]),
            &BaselineSignature::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.completed, 3);
    assert!(outcome.findings.is_empty());
}

/// Redirect statuses are findings in their own right.
#[tokio::test]
async fn test_redirects_recorded_with_note() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old-section"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "/new-section/"),
        )
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let client = build_scan_client(5).unwrap();
    let base = Url::parse(&mock_server.uri()).unwrap();
    let baseline = collect_baseline(&client, &base, 2).await.unwrap();

    let enumerator = Enumerator::new(client, base).with_concurrency(2);
    let outcome = enumerator
        .run(&candidates(&["/old-section", "/nothing-here"]), &baseline)
        .await
        .unwrap();

    assert_eq!(outcome.findings.len(), 1);
    let finding = &outcome.findings[0];
    assert_eq!(finding.status, 301);
    assert_eq!(finding.note.as_deref(), Some("redirect"));
    assert_eq!(finding.redirected_to.as_deref(), Some("/new-section/"));
}
