use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use arrow::record_batch::RecordBatch;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::Router;
use tower_http::services::ServeDir;

use tripdata_core::config::SourceConfig;
use tripdata_core::TripCategory;
use tripdata_ingest::TripSource;

use crate::helpers::*;

/// What the server saw of one request.
#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    path: String,
    range: Option<String>,
    category: Option<String>,
    date: Option<String>,
}

type RequestLog = Arc<Mutex<Vec<SeenRequest>>>;

fn header(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Serve `dir` under `/trip-data/` from a background runtime and record every
/// request. The server lives until the test process exits.
fn serve(dir: PathBuf) -> (SocketAddr, RequestLog) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    let log = RequestLog::default();
    let recorded = log.clone();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let app = Router::new()
                .nest_service("/trip-data", ServeDir::new(dir))
                .layer(middleware::from_fn(move |req: Request, next: Next| {
                    let recorded = recorded.clone();
                    async move {
                        recorded.lock().unwrap().push(SeenRequest {
                            method: req.method().to_string(),
                            path: req.uri().path().to_string(),
                            range: header(&req, "range"),
                            category: header(&req, "x-report-category"),
                            date: header(&req, "x-report-date"),
                        });
                        next.run(req).await
                    }
                }));
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    (addr, log)
}

fn source_for(addr: SocketAddr, batch_size: usize) -> TripSource {
    let config = SourceConfig {
        base_url: format!("http://{addr}/trip-data"),
        batch_size,
        probe_workers: 4,
        ..SourceConfig::default()
    };
    TripSource::from_config(&config).unwrap()
}

fn requests(log: &RequestLog, method: &str) -> Vec<SeenRequest> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|r| r.method == method)
        .cloned()
        .collect()
}

#[test]
fn http_mirror_probes_and_streams_with_range_reads() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "yellow_tripdata_2023-01.parquet", 300);
    write_yellow_file(dir.path(), "yellow_tripdata_2023-02.parquet", 40);
    let (addr, _) = serve(dir.path().to_path_buf());
    let source = source_for(addr, 128);

    let logs = CapturedLogs::default();
    let resources = logs
        .capture(|| {
            source.resources(
                &[TripCategory::Yellow, TripCategory::Green],
                &months_2023(1, 3),
            )
        })
        .unwrap();

    let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["yellow:2023-01", "yellow:2023-02"]);
    assert_eq!(logs.lines_at("WARN").len(), 2, "logs were:\n{}", logs.contents());

    let january = &resources[0];
    let on_disk = std::fs::metadata(dir.path().join("yellow_tripdata_2023-01.parquet"))
        .unwrap()
        .len();
    assert_eq!(january.rows.metadata().content_length, Some(on_disk));

    let mut resources = resources;
    let batches: Vec<RecordBatch> = resources
        .remove(0)
        .rows
        .collect::<Result<_, _>>()
        .unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
    assert_eq!(sizes, vec![128, 128, 44]);
    assert_eq!(distances(&batches), (0..300).map(|i| i as f64).collect::<Vec<_>>());
}

#[test]
fn existence_checks_carry_category_and_month_headers() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "yellow_tripdata_2023-01.parquet", 10);
    let (addr, log) = serve(dir.path().to_path_buf());

    let resources = source_for(addr, 128)
        .resources(
            &[TripCategory::Yellow, TripCategory::Green],
            &months_2023(1, 3),
        )
        .unwrap();
    assert_eq!(resources.len(), 1);

    let mut heads: Vec<(String, Option<String>, Option<String>)> = requests(&log, "HEAD")
        .into_iter()
        .map(|r| (r.path, r.category, r.date))
        .collect();
    heads.sort();
    let expected = |category: &str, month: &str| {
        (
            format!("/trip-data/{category}_tripdata_2023-{month}.parquet"),
            Some(category.to_string()),
            Some(format!("2023-{month}-01")),
        )
    };
    assert_eq!(
        heads,
        vec![
            expected("green", "01"),
            expected("green", "02"),
            expected("yellow", "01"),
            expected("yellow", "02"),
        ]
    );
    assert!(requests(&log, "GET").is_empty(), "resolving must not read row data");
}

#[test]
fn streaming_uses_few_bounded_range_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_paged_yellow_file(dir.path(), "yellow_tripdata_2023-01.parquet", 20_000);
    let (addr, log) = serve(dir.path().to_path_buf());

    let mut resources = source_for(addr, 10_000)
        .resources(&[TripCategory::Yellow], &months_2023(1, 2))
        .unwrap();
    let batches: Vec<RecordBatch> = resources
        .remove(0)
        .rows
        .collect::<Result<_, _>>()
        .unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
    assert_eq!(sizes, vec![10_000, 10_000]);
    assert_eq!(distances(&batches), (0..20_000).map(|i| i as f64).collect::<Vec<_>>());

    let gets = requests(&log, "GET");
    assert!(!gets.is_empty());
    assert!(gets.len() <= 10, "too many range requests: {gets:?}");
    for get in &gets {
        let range = get.range.as_deref().unwrap_or_default();
        let bounds = range.strip_prefix("bytes=").unwrap_or_default();
        let (first, last) = bounds.split_once('-').unwrap_or_default();
        let first: u64 = first.parse().unwrap_or_else(|_| panic!("bad range {range:?}"));
        let last: u64 = last.parse().unwrap_or_else(|_| panic!("open-ended range {range:?}"));
        assert!(first <= last, "empty range {range:?}");
    }
}
