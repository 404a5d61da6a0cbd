//! Lazy, cancellable CSV record reader.
//!
//! The first non-blank line is always the header and is discarded. Blank
//! lines are skipped, and rows that fail [`CsvRecord::from_line`] are
//! counted and dropped without surfacing an error.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio_util::sync::CancellationToken;

use crate::StreamError;
use crate::row::CsvRecord;

/// Counts of what the reader has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Records yielded to the caller.
    pub emitted: u64,
    /// Data lines dropped as malformed.
    pub dropped: u64,
}

/// Reads records of type `T` from a CSV file one line at a time.
pub struct RecordReader<T> {
    path: PathBuf,
    /// `None` once the file is exhausted or the reader is cancelled.
    source: Option<BufReader<File>>,
    cancel: CancellationToken,
    buf: Vec<u8>,
    header_seen: bool,
    stats: ReaderStats,
    _record: PhantomData<fn() -> T>,
}

impl<T: CsvRecord> RecordReader<T> {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::NotFound`] if `path` does not exist or is not
    /// a regular file, or [`StreamError::Io`] if it cannot be opened.
    pub async fn open(path: &Path, cancel: CancellationToken) -> Result<Self, StreamError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StreamError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StreamError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let file = File::open(path).await?;

        Ok(Self {
            path: path.to_path_buf(),
            source: Some(BufReader::new(file)),
            cancel,
            buf: Vec::new(),
            header_seen: false,
            stats: ReaderStats::default(),
            _record: PhantomData,
        })
    }

    /// Returns the next valid record, or `None` when the file is exhausted
    /// or the reader has been cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Io`] if reading from the file fails.
    pub async fn next_record(&mut self) -> Result<Option<T>, StreamError> {
        loop {
            if self.cancel.is_cancelled() {
                self.source = None;
                return Ok(None);
            }
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };

            self.buf.clear();
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                read = source.read_until(b'\n', &mut self.buf) => Some(read),
            };

            let Some(read) = read else {
                self.source = None;
                return Ok(None);
            };
            if read? == 0 {
                log::debug!(
                    "Reached end of {} ({} emitted, {} dropped)",
                    self.path.display(),
                    self.stats.emitted,
                    self.stats.dropped
                );
                self.source = None;
                return Ok(None);
            }

            let text = String::from_utf8_lossy(&self.buf);
            let line = text.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            if !self.header_seen {
                self.header_seen = true;
                continue;
            }

            if let Some(record) = T::from_line(line) {
                self.stats.emitted += 1;
                return Ok(Some(record));
            }
            self.stats.dropped += 1;
            log::trace!("Dropping malformed row: {line}");
        }
    }

    /// Stops the reader and closes the underlying file.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.source = None;
    }

    /// Whether the reader was stopped by its cancellation token.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the underlying file handle is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Counts of emitted and dropped rows so far.
    #[must_use]
    pub const fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use safety_map_stream_models::EmergencyCall;
    use tempfile::NamedTempFile;

    use super::*;

    fn csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    async fn read_all(reader: &mut RecordReader<EmergencyCall>) -> Vec<EmergencyCall> {
        let mut out = Vec::new();
        while let Some(record) = reader.next_record().await.unwrap() {
            out.push(record);
        }
        out
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dial112.csv");
        let result = RecordReader::<EmergencyCall>::open(&path, CancellationToken::new()).await;
        assert!(matches!(result, Err(StreamError::NotFound { .. })));
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = RecordReader::<EmergencyCall>::open(dir.path(), CancellationToken::new()).await;
        assert!(matches!(result, Err(StreamError::NotFound { .. })));
    }

    #[tokio::test]
    async fn skips_header_and_blank_lines() {
        let file = csv(
            "\n   \nid,event,station,type,lat,lng,received\n\n1,E1,S,T,20.0,73.8,a\n\n2,E2,S,T,20.1,73.9,b\n",
        );
        let mut reader = RecordReader::<EmergencyCall>::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        let records = read_all(&mut reader).await;
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(reader.stats().dropped, 0);
        assert!(!reader.is_open());
    }

    #[tokio::test]
    async fn header_is_skipped_even_if_it_looks_like_data() {
        let file = csv("1,E1,S,T,20.0,73.8,a\n2,E2,S,T,20.1,73.9,b\n");
        let mut reader = RecordReader::<EmergencyCall>::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        let records = read_all(&mut reader).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "2");
    }

    #[tokio::test]
    async fn drops_malformed_rows_and_keeps_going() {
        let file = csv(
            "h\n1,E1,S,T,20.0,73.8,a\n2,E2,S,20.0,73.8\n3,E3,S,T,north,73.8,c\n4,E4,S,T,20.2,73.7,d\r\n",
        );
        let mut reader = RecordReader::<EmergencyCall>::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        let records = read_all(&mut reader).await;
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "4"]);
        assert_eq!(records[1].received_at, "d");
        assert!(records.iter().all(|r| r.latitude.is_finite() && r.longitude.is_finite()));
        assert_eq!(
            reader.stats(),
            ReaderStats {
                emitted: 2,
                dropped: 2
            }
        );
    }

    #[tokio::test]
    async fn tolerates_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"h\n1,E1,St\xff,T,20.0,73.8,a\n").unwrap();
        file.flush().unwrap();
        let mut reader = RecordReader::<EmergencyCall>::open(file.path(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(read_all(&mut reader).await.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_reading_and_closes_file() {
        let file = csv("h\n1,E,S,T,20.0,73.8,a\n2,E,S,T,20.0,73.8,b\n3,E,S,T,20.0,73.8,c\n");
        let token = CancellationToken::new();
        let mut reader = RecordReader::<EmergencyCall>::open(file.path(), token.clone())
            .await
            .unwrap();

        assert!(reader.next_record().await.unwrap().is_some());
        token.cancel();
        assert!(reader.next_record().await.unwrap().is_none());
        assert!(reader.is_cancelled());
        assert!(!reader.is_open());
        assert_eq!(reader.stats().emitted, 1);
    }
}
