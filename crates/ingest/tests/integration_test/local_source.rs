use std::path::Path;

use arrow::record_batch::RecordBatch;
use url::Url;

use tripdata_core::config::SourceConfig;
use tripdata_core::{TableEngine, TripCategory, WriteDisposition};
use tripdata_ingest::{limit_resources, IngestError, Period, TripSource};

use crate::helpers::*;

fn mirror_config(dir: &Path, batch_size: usize) -> SourceConfig {
    SourceConfig {
        base_url: Url::from_directory_path(dir).unwrap().to_string(),
        batch_size,
        probe_workers: 2,
        ..SourceConfig::default()
    }
}

#[test]
fn missing_month_is_skipped_with_one_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "yellow_tripdata_2023-01.parquet", 10);
    write_yellow_file(dir.path(), "yellow_tripdata_2023-03.parquet", 10);

    let source = TripSource::from_config(&mirror_config(dir.path(), 100)).unwrap();
    let logs = CapturedLogs::default();
    let resources = logs
        .capture(|| source.resources(&[TripCategory::Yellow], &months_2023(1, 4)))
        .unwrap();

    let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["yellow:2023-01", "yellow:2023-03"]);
    for resource in &resources {
        assert_eq!(resource.table_name, "yellow");
        assert_eq!(resource.write_disposition, WriteDisposition::Merge);
        assert_eq!(
            resource.identity_key,
            vec!["VendorID", "tpep_pickup_datetime", "tpep_dropoff_datetime"]
        );
        assert_eq!(resource.hints.table_engine, Some(TableEngine::MergeTree));
    }

    let warnings = logs.lines_at("WARN");
    assert_eq!(warnings.len(), 1, "logs were:\n{}", logs.contents());
    assert!(warnings[0].contains("yellow:2023-02"));
    assert!(warnings[0].contains("failed to be fetched"));
}

#[test]
fn rows_stream_in_exact_batches_and_file_order() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "yellow_tripdata_2023-01.parquet", 250);

    let source = TripSource::from_config(&mirror_config(dir.path(), 100)).unwrap();
    let mut resources = source
        .resources(&[TripCategory::Yellow], &months_2023(1, 2))
        .unwrap();
    assert_eq!(resources.len(), 1);

    let resource = resources.remove(0);
    let batches: Vec<RecordBatch> = resource.rows.collect::<Result<_, _>>().unwrap();
    let sizes: Vec<usize> = batches.iter().map(|b| b.num_rows()).collect();
    assert_eq!(sizes, vec![100, 100, 50]);

    let expected: Vec<f64> = (0..250).map(|i| i as f64).collect();
    assert_eq!(distances(&batches), expected);
}

#[test]
fn repeated_runs_resolve_the_same_resources() {
    let dir = tempfile::tempdir().unwrap();
    for name in [
        "green_tripdata_2023-01.parquet",
        "green_tripdata_2023-02.parquet",
        "yellow_tripdata_2023-02.parquet",
    ] {
        write_yellow_file(dir.path(), name, 30);
    }

    let source = TripSource::from_config(&mirror_config(dir.path(), 7)).unwrap();
    let categories = [TripCategory::Yellow, TripCategory::Green];

    let summarize = || -> Vec<(String, usize)> {
        source
            .resources(&categories, &months_2023(1, 3))
            .unwrap()
            .into_iter()
            .map(|r| {
                let rows = r.rows.map(|b| b.unwrap().num_rows()).sum();
                (r.name, rows)
            })
            .collect()
    };

    let first = summarize();
    assert_eq!(
        first,
        vec![
            ("green:2023-01".to_string(), 30),
            ("green:2023-02".to_string(), 30),
            ("yellow:2023-02".to_string(), 30),
        ]
    );
    assert_eq!(summarize(), first);
}

#[test]
fn keyless_category_merges_as_append() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "fhvhv_tripdata_2023-05.parquet", 5);

    let source = TripSource::from_config(&mirror_config(dir.path(), 100)).unwrap();
    let resources = source
        .resources(&[TripCategory::Fhvhv], &months_2023(5, 6))
        .unwrap();

    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].table_name, "fhvhv");
    assert!(resources[0].identity_key.is_empty());
    assert_eq!(resources[0].write_disposition, WriteDisposition::Append);
}

#[test]
fn limit_caps_resources_handed_downstream() {
    let dir = tempfile::tempdir().unwrap();
    for month in 1..=4 {
        write_yellow_file(dir.path(), &format!("yellow_tripdata_2023-{month:02}.parquet"), 3);
    }

    let source = TripSource::from_config(&mirror_config(dir.path(), 100)).unwrap();
    let resources = source
        .resources(&[TripCategory::Yellow], &months_2023(1, 5))
        .unwrap();
    let names: Vec<String> = limit_resources(resources, Some(2)).map(|r| r.name).collect();
    assert_eq!(names, vec!["yellow:2023-01", "yellow:2023-02"]);
}

#[test]
fn corrupt_file_fails_only_its_own_stream() {
    let dir = tempfile::tempdir().unwrap();
    write_yellow_file(dir.path(), "green_tripdata_2023-01.parquet", 12);
    std::fs::write(dir.path().join("green_tripdata_2023-02.parquet"), b"truncated").unwrap();

    let source = TripSource::from_config(&mirror_config(dir.path(), 100)).unwrap();
    let resources = source
        .resources(&[TripCategory::Green], &months_2023(1, 3))
        .unwrap();
    assert_eq!(resources.len(), 2);

    let mut outcomes = resources.into_iter().map(|r| r.rows.collect::<Result<Vec<_>, _>>());
    assert_eq!(outcomes.next().unwrap().unwrap()[0].num_rows(), 12);
    assert!(matches!(
        outcomes.next().unwrap(),
        Err(IngestError::StreamRead { .. })
    ));
}

#[test]
fn inverted_period_is_rejected() {
    let result = Period::new(utc(2023, 3), utc(2023, 1));
    assert!(matches!(result, Err(IngestError::InvalidPeriod { .. })));
}
