//! Random-access byte sources for the parquet reader.
//!
//! Remote files are never downloaded whole. Every request is a bounded HTTP
//! range of at most [`WINDOW_BYTES`]; the last window is kept so that the
//! many small page reads inside a column chunk are served from memory.

use std::fs::File;
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Buf, Bytes};
use parquet::errors::{ParquetError, Result as ParquetResult};
use parquet::file::reader::{ChunkReader, Length};
use reqwest::blocking::Client;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use url::Url;

/// Size of one range request issued for sequential reads.
pub const WINDOW_BYTES: u64 = 1 << 20;

#[derive(Debug)]
struct Window {
    start: u64,
    data: Bytes,
}

impl Window {
    fn covers(&self, start: u64, length: usize) -> bool {
        start >= self.start && start + length as u64 <= self.start + self.data.len() as u64
    }

    fn slice(&self, start: u64, length: usize) -> Bytes {
        let from = (start - self.start) as usize;
        self.data.slice(from..from + length)
    }
}

/// Exclusive end of the window that starts at `offset`.
fn window_end(offset: u64, len: u64) -> u64 {
    offset.saturating_add(WINDOW_BYTES).min(len)
}

/// Range-request reader over a file whose length is already known from its
/// probe. Clones share the cached window.
#[derive(Debug, Clone)]
pub struct HttpRangeReader {
    client: Client,
    url: Url,
    len: u64,
    window: Arc<Mutex<Option<Window>>>,
}

impl HttpRangeReader {
    pub fn new(client: Client, url: Url, len: u64) -> Self {
        Self {
            client,
            url,
            len,
            window: Arc::new(Mutex::new(None)),
        }
    }

    /// Exactly the bytes `[start, end)`. A server that ignores the range
    /// header is only acceptable when reading from the beginning.
    fn fetch(&self, start: u64, end: u64) -> ParquetResult<Bytes> {
        let expected = (end - start) as usize;
        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, format!("bytes={start}-{}", end - 1))
            .send()
            .map_err(|e| ParquetError::External(Box::new(e)))?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::OK if start == 0 => {}
            status => {
                return Err(ParquetError::General(format!(
                    "range request for {} at offset {start} returned {status}",
                    self.url
                )))
            }
        }

        let mut buf = Vec::with_capacity(expected);
        response.take(expected as u64).read_to_end(&mut buf)?;
        if buf.len() != expected {
            return Err(ParquetError::EOF(format!(
                "expected {expected} bytes at offset {start} of {}, got {}",
                self.url,
                buf.len()
            )));
        }
        Ok(Bytes::from(buf))
    }

    fn lock(&self) -> ParquetResult<MutexGuard<'_, Option<Window>>> {
        self.window
            .lock()
            .map_err(|_| ParquetError::General(format!("range cache for {} poisoned", self.url)))
    }

    fn cached(&self, start: u64, length: usize) -> ParquetResult<Option<Bytes>> {
        Ok(self
            .lock()?
            .as_ref()
            .filter(|w| w.covers(start, length))
            .map(|w| w.slice(start, length)))
    }

    /// Fetch and cache the window starting at `offset`.
    fn load_window(&self, offset: u64) -> ParquetResult<Bytes> {
        if offset >= self.len {
            return Err(ParquetError::EOF(format!(
                "offset {offset} is past the end of {} ({} bytes)",
                self.url, self.len
            )));
        }
        let data = self.fetch(offset, window_end(offset, self.len))?;
        *self.lock()? = Some(Window {
            start: offset,
            data: data.clone(),
        });
        Ok(data)
    }

    /// Bytes from `offset` to the end of the window that contains it.
    fn window_at(&self, offset: u64) -> ParquetResult<Bytes> {
        let cached = self
            .lock()?
            .as_ref()
            .filter(|w| w.covers(offset, 1))
            .map(|w| w.data.slice((offset - w.start) as usize..));
        match cached {
            Some(data) => Ok(data),
            None => self.load_window(offset),
        }
    }
}

impl Length for HttpRangeReader {
    fn len(&self) -> u64 {
        self.len
    }
}

impl ChunkReader for HttpRangeReader {
    type T = WindowedRead;

    fn get_read(&self, start: u64) -> ParquetResult<Self::T> {
        Ok(WindowedRead {
            source: self.clone(),
            pos: start,
            current: Bytes::new(),
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> ParquetResult<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        if let Some(bytes) = self.cached(start, length)? {
            return Ok(bytes);
        }
        if length as u64 <= WINDOW_BYTES {
            let window = self.load_window(start)?;
            if window.len() >= length {
                return Ok(window.slice(..length));
            }
        }
        self.fetch(start, start + length as u64)
    }
}

/// Sequential reader that pulls one window at a time, only as far as the
/// caller actually reads.
pub struct WindowedRead {
    source: HttpRangeReader,
    pos: u64,
    current: Bytes,
}

impl Read for WindowedRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.current.is_empty() {
            if self.pos >= self.source.len {
                return Ok(0);
            }
            self.current = self.source.window_at(self.pos).map_err(io::Error::other)?;
        }
        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        self.pos += n as u64;
        Ok(n)
    }
}

/// Byte source handed to the parquet reader.
pub enum ObjectReader {
    Http(HttpRangeReader),
    Local(File),
}

impl Length for ObjectReader {
    fn len(&self) -> u64 {
        match self {
            ObjectReader::Http(r) => r.len(),
            ObjectReader::Local(f) => Length::len(f),
        }
    }
}

impl ChunkReader for ObjectReader {
    type T = Box<dyn Read + Send>;

    fn get_read(&self, start: u64) -> ParquetResult<Self::T> {
        match self {
            ObjectReader::Http(r) => Ok(Box::new(r.get_read(start)?)),
            ObjectReader::Local(f) => Ok(Box::new(ChunkReader::get_read(f, start)?)),
        }
    }

    fn get_bytes(&self, start: u64, length: usize) -> ParquetResult<Bytes> {
        match self {
            ObjectReader::Http(r) => r.get_bytes(start, length),
            ObjectReader::Local(f) => ChunkReader::get_bytes(f, start, length),
        }
    }
}
