use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::time::timeout;
use rtstatus_client::{Client, ClientConfig};
use rtstatus_common::{ErrorResponse, Limits, RtStatusError};
use rtstatus_server::{Server, ServerConfig};

const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(60);

struct Running {
    client: Client,
    root: TempDir,
}

async fn start_server(limits: Limits, listen_file: Option<PathBuf>) -> Running {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("index.html"), b"<h1>it works</h1>").unwrap();
    std::fs::write(root.path().join("small.txt"), vec![b's'; 100]).unwrap();
    std::fs::write(root.path().join("large.bin"), vec![0u8; 4096]).unwrap();

    let (ready_tx, ready_rx) = oneshot::channel();

    let server = Server::new(ServerConfig {
        address: "127.0.0.1:0".parse().unwrap(),
        limits,
        document_root: root.path().to_path_buf(),
        listen_file,
    });

    tokio::spawn(async move {
        server.run(ready_tx).await.expect("server failed");
    });

    let addr = timeout(SERVER_READY_TIMEOUT, ready_rx)
        .await
        .expect("server did not start within 60 seconds")
        .expect("server ready signal dropped");

    Running { client: Client::new(ClientConfig { addr: addr.to_string() }), root }
}

async fn start_default() -> Running {
    start_server(Limits::new(2, 4), None).await
}

#[tokio::test]
async fn test_fresh_server_reports_zero() {
    let server = start_default().await;
    let report = server.client.report().await.expect("report failed");

    assert_eq!(report.get_u64("TotalAccesses"), Ok(0));
    assert_eq!(report.get_u64("Avg_ResponseTime"), Ok(0));
    assert_eq!(report.get_u64("90Percentil_ResponseTime"), Ok(0));
    assert_eq!(report.percentile_array(), Ok(vec![]));
    assert_eq!(report.get_u64("ServerLimit"), Ok(2));
    assert_eq!(report.get_u64("ThreadLimit"), Ok(4));
    assert_eq!(report.get("DocumentRoot"), Some(server.root.path().to_str().unwrap()));
    assert!(report.get("Listen").unwrap().starts_with("http://127.0.0.1:"));
    // Only the slot rendering this report is in use.
    assert_eq!(report.get("Scoreboard"), Some("R......."));
}

#[tokio::test]
async fn test_requests_are_counted_by_class_and_bytes() {
    let server = start_default().await;
    let client = &server.client;

    assert_eq!(client.get("/").await, Ok(200));
    assert_eq!(client.get("/small.txt").await, Ok(200));
    assert_eq!(client.get("/large.bin").await, Ok(200));
    assert_eq!(client.get("/nope.txt").await, Ok(404));

    let report = client.report().await.expect("report failed");
    assert_eq!(report.get_u64("NB_Reqs_200"), Ok(3));
    assert_eq!(report.get_u64("NB_Reqs_404"), Ok(1));
    let index_len = "<h1>it works</h1>".len() as u64;
    assert_eq!(report.get_u64("NB_Bytes_200"), Ok(index_len + 100 + 4096));
    assert_eq!(report.get_u64("TotalKBytes").unwrap(), report_total_bytes(&report) >> 10);
}

fn report_total_bytes(report: &rtstatus_common::Report) -> u64 {
    report
        .entries()
        .iter()
        .filter(|(k, _)| k.starts_with("NB_Bytes_"))
        .map(|(_, v)| v.parse::<u64>().unwrap())
        .sum()
}

#[tokio::test]
async fn test_report_requests_count_after_they_complete() {
    let server = start_default().await;
    let client = &server.client;

    assert_eq!(client.attribute_u64("TotalAccesses").await, Ok(0));
    assert_eq!(client.attribute_u64("TotalAccesses").await, Ok(1));
    assert_eq!(client.attribute_u64("totalaccesses").await, Ok(2));
}

#[tokio::test]
async fn test_unknown_attribute() {
    let server = start_default().await;
    let result = server.client.attribute("NoSuchAttribute").await;
    assert!(matches!(result, Err(RtStatusError::UnknownAttribute(name)) if name == "NoSuchAttribute"));
}

#[tokio::test]
async fn test_concurrent_requests_reconcile() {
    const REQUESTS: usize = 64;

    let server = start_server(Limits::new(4, 16), None).await;
    let client = Arc::new(server.client);

    let tasks: Vec<_> = (0..REQUESTS)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let path = if i % 4 == 0 { "/missing" } else { "/small.txt" };
                client.get(path).await
            })
        })
        .collect();

    let mut ok = 0;
    let mut not_found = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(200) => ok += 1,
            Ok(404) => not_found += 1,
            other => panic!("unexpected result: {other:?}"),
        }
    }

    let report = client.report().await.expect("report failed");
    assert_eq!(report.get_u64("NB_Reqs_200"), Ok(ok));
    assert_eq!(report.get_u64("NB_Reqs_404"), Ok(not_found));
    assert_eq!(report.get_u64("TotalAccesses"), Ok(REQUESTS as u64));
    assert_eq!(report.get_u64("NB_Bytes_200"), Ok(ok * 100));

    let histogram: u64 = report
        .entries()
        .iter()
        .filter(|(k, _)| k.starts_with("NB_Reqs_") && k.ends_with('s'))
        .map(|(_, v)| v.parse::<u64>().unwrap())
        .sum();
    assert_eq!(histogram, REQUESTS as u64);
}

#[tokio::test]
async fn test_worker_rows_after_traffic() {
    let server = start_server(Limits::new(1, 2), None).await;
    let client = &server.client;

    for _ in 0..3 {
        assert_eq!(client.get("/small.txt").await, Ok(200));
    }

    let report = client.report().await.expect("report failed");
    let workers = report.workers().expect("worker rows");
    let served: u64 = workers.iter().map(|w| w.accesses).sum();
    assert_eq!(served, 3);
    // The report request itself holds a slot while rendering.
    assert!(workers.iter().any(|w| w.state == "Read"));
    assert!(workers.iter().all(|w| w.server == 0 && w.thread < 2));

    let addr = &client.config.addr;
    for w in &workers {
        assert_eq!(w.client, "127.0.0.1");
        assert_eq!(&w.vhost, addr);
        if w.state == "Read" {
            assert!(w.request.starts_with("GET /server-status-text "));
        } else {
            assert_eq!(w.request, "GET /small.txt HTTP/1.1");
        }
    }
}

#[tokio::test]
async fn test_listen_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("listen");

    let server = start_server(Limits::new(1, 1), Some(path.clone())).await;
    let text = std::fs::read_to_string(&path).expect("listen file");

    assert!(text.contains(&format!("DocumentRoot: {}\n", server.root.path().display())));
    assert!(text.contains(&format!("Listen[0]: http://{}\n", server.client.config.addr)));
}

#[tokio::test]
async fn test_raw_http_responses() {
    let server = start_default().await;
    let base = format!("http://{}", server.client.config.addr);
    let http = reqwest::Client::new();

    let response = http.get(format!("{base}/server-status-text?uptime")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    let body = response.text().await.unwrap();
    assert!(body.ends_with('\n'));
    assert!(body.trim_end().parse::<u64>().is_ok());

    let response = http.get(format!("{base}/server-status-text?Bogus")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Unknown attribute: Bogus");

    let response = http.post(format!("{base}/server-status-text")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
}
