use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use tripdata_ingest::Period;

/// Period covering whole months `[from, to)` of 2023.
pub fn months_2023(from: u32, to: u32) -> Period {
    Period::new(utc(2023, from), utc(2023, to)).unwrap()
}

pub fn utc(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap()
}

/// A yellow-taxi shaped batch: key columns plus a couple of measures.
/// `trip_distance` holds the row index so order can be checked after reading.
pub fn yellow_batch(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("VendorID", DataType::Int32, true),
        Field::new(
            "tpep_pickup_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new(
            "tpep_dropoff_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("passenger_count", DataType::Int64, true),
        Field::new("trip_distance", DataType::Float64, true),
    ]));

    let base = 1_672_531_200_000_000i64; // 2023-01-01T00:00:00Z
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from_iter_values((0..rows).map(|i| (i % 2 + 1) as i32))),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            (0..rows).map(|i| base + i as i64 * 60_000_000),
        )),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            (0..rows).map(|i| base + i as i64 * 60_000_000 + 600_000_000),
        )),
        Arc::new(Int64Array::from_iter_values((0..rows).map(|i| (i % 4) as i64))),
        Arc::new(Float64Array::from_iter_values((0..rows).map(|i| i as f64))),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

/// Write `rows` yellow rows to `dir/name` with small row groups so the
/// reader has to cross group boundaries.
pub fn write_yellow_file(dir: &Path, name: &str, rows: usize) {
    let props = WriterProperties::builder()
        .set_max_row_group_size(64)
        .build();
    write_yellow_file_with(dir, name, rows, props);
}

/// One row group split into many small data pages, the layout that makes a
/// reader issue one page read after another within a column chunk.
pub fn write_paged_yellow_file(dir: &Path, name: &str, rows: usize) {
    let props = WriterProperties::builder()
        .set_max_row_group_size(rows)
        .set_data_page_row_count_limit(500)
        .set_write_batch_size(100)
        .build();
    write_yellow_file_with(dir, name, rows, props);
}

fn write_yellow_file_with(dir: &Path, name: &str, rows: usize, props: WriterProperties) {
    let batch = yellow_batch(rows);
    let file = std::fs::File::create(dir.join(name)).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

pub fn distances(batches: &[RecordBatch]) -> Vec<f64> {
    batches
        .iter()
        .flat_map(|b| {
            let idx = b.schema().index_of("trip_distance").unwrap();
            let col = b.column(idx).as_any().downcast_ref::<Float64Array>().unwrap();
            col.values().to_vec()
        })
        .collect()
}

/// In-memory log sink for asserting on emitted warnings.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines_at(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| l.contains(level))
            .map(|l| l.to_string())
            .collect()
    }

    /// Run `f` with a subscriber that writes plain text into this sink.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
