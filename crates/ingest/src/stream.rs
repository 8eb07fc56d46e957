//! Lazy, single-pass row batch production for one probed file.

use std::fmt;

use arrow::compute::concat_batches;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use tracing::debug;

use crate::error::IngestError;
use crate::probe::ProbeMetadata;
use crate::store::RemoteStore;

/// Regroups an upstream batch sequence into batches of exactly `batch_size`
/// rows, except possibly the last. Row order is preserved and at most about
/// two target batches are buffered at a time.
pub struct Rebatch<I> {
    inner: I,
    batch_size: usize,
    pending: Vec<RecordBatch>,
    pending_rows: usize,
    exhausted: bool,
}

impl<I> Rebatch<I>
where
    I: Iterator<Item = Result<RecordBatch, ArrowError>>,
{
    pub fn new(inner: I, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            pending_rows: 0,
            exhausted: false,
        }
    }

    /// Split the first `rows` buffered rows off into their own batch.
    fn take(&mut self, rows: usize) -> Result<RecordBatch, ArrowError> {
        if self.pending.len() == 1 && self.pending_rows == rows {
            self.pending_rows = 0;
            return Ok(self.pending.remove(0));
        }

        let schema = self.pending[0].schema();
        let combined = concat_batches(&schema, &self.pending)?;
        let total = combined.num_rows();
        let head = combined.slice(0, rows);

        self.pending.clear();
        if total > rows {
            self.pending.push(combined.slice(rows, total - rows));
        }
        self.pending_rows = total - rows;
        Ok(head)
    }
}

impl<I> Iterator for Rebatch<I>
where
    I: Iterator<Item = Result<RecordBatch, ArrowError>>,
{
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pending_rows >= self.batch_size {
                return Some(self.take(self.batch_size));
            }
            if self.exhausted {
                if self.pending_rows == 0 {
                    return None;
                }
                return Some(self.take(self.pending_rows));
            }
            match self.inner.next() {
                Some(Ok(batch)) => {
                    if batch.num_rows() > 0 {
                        self.pending_rows += batch.num_rows();
                        self.pending.push(batch);
                    }
                }
                Some(Err(e)) => {
                    self.exhausted = true;
                    self.pending.clear();
                    self.pending_rows = 0;
                    return Some(Err(e));
                }
                None => self.exhausted = true,
            }
        }
    }
}

enum State {
    /// Nothing has been read yet; the file is opened on the first pull.
    Pending,
    Reading(Rebatch<ParquetRecordBatchReader>),
    Done,
}

/// Pull-driven batch source for one confirmed-existing file.
///
/// Yields batches of `batch_size` rows in on-disk order, the last one
/// possibly shorter. After an error, or once drained, it only yields `None`;
/// re-reading a file needs a fresh streamer.
pub struct BatchStreamer {
    store: RemoteStore,
    meta: ProbeMetadata,
    batch_size: usize,
    state: State,
    rows_read: usize,
    batches_read: usize,
}

impl BatchStreamer {
    pub fn new(store: RemoteStore, meta: ProbeMetadata, batch_size: usize) -> Self {
        Self {
            store,
            meta,
            batch_size: batch_size.max(1),
            state: State::Pending,
            rows_read: 0,
            batches_read: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn metadata(&self) -> &ProbeMetadata {
        &self.meta
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    fn open(&self) -> Result<ParquetRecordBatchReader, IngestError> {
        let reader = self.store.open(&self.meta)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(reader)
            .and_then(|builder| builder.with_batch_size(self.batch_size).build())
            .map_err(|e| self.read_failure(e))?;
        debug!(locator = %self.meta.locator, batch_size = self.batch_size, "opened parquet stream");
        Ok(reader)
    }

    fn read_failure(&self, e: impl fmt::Display) -> IngestError {
        IngestError::StreamRead {
            locator: self.meta.locator.to_string(),
            reason: e.to_string(),
        }
    }
}

impl Iterator for BatchStreamer {
    type Item = Result<RecordBatch, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Pending = self.state {
            match self.open() {
                Ok(reader) => self.state = State::Reading(Rebatch::new(reader, self.batch_size)),
                Err(e) => {
                    self.state = State::Done;
                    return Some(Err(e));
                }
            }
        }

        let State::Reading(batches) = &mut self.state else {
            return None;
        };
        match batches.next() {
            Some(Ok(batch)) => {
                self.rows_read += batch.num_rows();
                self.batches_read += 1;
                Some(Ok(batch))
            }
            Some(Err(e)) => {
                self.state = State::Done;
                Some(Err(self.read_failure(e)))
            }
            None => {
                self.state = State::Done;
                debug!(
                    locator = %self.meta.locator,
                    rows = self.rows_read,
                    batches = self.batches_read,
                    "parquet stream drained"
                );
                None
            }
        }
    }
}

impl fmt::Debug for BatchStreamer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchStreamer")
            .field("locator", &self.meta.locator.as_str())
            .field("batch_size", &self.batch_size)
            .field("rows_read", &self.rows_read)
            .finish()
    }
}
