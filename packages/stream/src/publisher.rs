//! Event-stream publisher.
//!
//! [`publish`] spawns one producer task per client. The task writes
//! `text/event-stream` frames into a bounded channel that backs the HTTP
//! response body, so a slow client applies backpressure to the file reader
//! and a dropped response body stops it.

use futures::Stream;
use safety_map_stream_models::{STREAM_START_COMMENT, StreamEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::StreamError;
use crate::reader::{ReaderStats, RecordReader};
use crate::row::CsvRecord;

/// Default number of frames buffered between the reader and the socket.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A single encoded frame, or the error that ended the stream.
pub type Frame = Result<String, StreamError>;

/// Lifecycle of one published stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// Created but not yet writing.
    Idle,
    /// Writing frames.
    Streaming,
    /// The reader was exhausted and the `done` frame was sent.
    Completed,
    /// The client went away before the reader was exhausted.
    Cancelled,
    /// The reader failed.
    Errored,
}

impl PublisherState {
    /// Whether the stream has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }

    const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Streaming | Self::Cancelled)
                | (
                    Self::Streaming,
                    Self::Completed | Self::Cancelled | Self::Errored
                )
        )
    }
}

/// Tuning for [`publish`].
#[derive(Debug, Clone, Copy)]
pub struct PublishOptions {
    /// Frames buffered ahead of the client.
    pub channel_capacity: usize,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// How a published stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Terminal state.
    pub state: PublisherState,
    /// `row` frames handed to the channel.
    pub rows_sent: u64,
    /// Reader counters at the end of the stream.
    pub stats: ReaderStats,
}

/// A running stream: the frame receiver plus the producer task.
pub struct Publication {
    /// Encoded frames, in order.
    pub frames: mpsc::Receiver<Frame>,
    /// Producer task. Resolves once the stream reaches a terminal state.
    pub task: JoinHandle<PublishOutcome>,
}

impl Publication {
    /// Converts the frame receiver into a [`Stream`] suitable for a
    /// streaming HTTP body. The producer task keeps running detached.
    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        let mut frames = self.frames;
        async_stream::stream! {
            while let Some(frame) = frames.recv().await {
                yield frame;
            }
        }
    }
}

/// Starts streaming `reader` on a new task.
///
/// Must be called from within a tokio runtime.
pub fn publish<T>(reader: RecordReader<T>, options: PublishOptions) -> Publication
where
    T: CsvRecord + Send + 'static,
{
    let (tx, frames) = mpsc::channel(options.channel_capacity.max(1));
    let task = tokio::spawn(Publisher::new(reader, tx).run());
    Publication { frames, task }
}

struct Publisher<T> {
    reader: RecordReader<T>,
    tx: mpsc::Sender<Frame>,
    state: PublisherState,
    rows_sent: u64,
}

impl<T: CsvRecord> Publisher<T> {
    const fn new(reader: RecordReader<T>, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            reader,
            tx,
            state: PublisherState::Idle,
            rows_sent: 0,
        }
    }

    fn transition(&mut self, next: PublisherState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid publisher transition {:?} -> {next:?}",
            self.state
        );
        log::trace!("Publisher {:?} -> {next:?}", self.state);
        self.state = next;
    }

    async fn send(&self, event: StreamEvent) -> bool {
        self.tx.send(Ok(event.to_frame())).await.is_ok()
    }

    async fn run(mut self) -> PublishOutcome {
        let path = self.reader.path().display().to_string();
        log::info!("Starting event stream from {path}");

        if !self
            .send(StreamEvent::Comment(STREAM_START_COMMENT.to_string()))
            .await
        {
            self.cancel();
            return self.outcome();
        }
        self.transition(PublisherState::Streaming);

        loop {
            let next = tokio::select! {
                biased;
                () = self.tx.closed() => None,
                next = self.reader.next_record() => Some(next),
            };

            let Some(next) = next else {
                self.cancel();
                break;
            };

            match next {
                Ok(Some(record)) => {
                    let json = match serde_json::to_string(&record) {
                        Ok(json) => json,
                        Err(e) => {
                            self.fail(e.into()).await;
                            break;
                        }
                    };
                    if !self.send(StreamEvent::Row(json)).await {
                        self.cancel();
                        break;
                    }
                    self.rows_sent += 1;
                }
                Ok(None) if self.reader.is_cancelled() => {
                    self.cancel();
                    break;
                }
                Ok(None) => {
                    if self.send(StreamEvent::Done).await {
                        let stats = self.reader.stats();
                        log::info!(
                            "Streamed {} records from {path} ({} malformed rows dropped)",
                            stats.emitted,
                            stats.dropped
                        );
                        self.transition(PublisherState::Completed);
                    } else {
                        self.cancel();
                    }
                    break;
                }
                Err(e) => {
                    self.fail(e).await;
                    break;
                }
            }
        }

        self.outcome()
    }

    fn cancel(&mut self) {
        log::info!(
            "Client disconnected, stopping {} after {} records",
            self.reader.path().display(),
            self.rows_sent
        );
        self.reader.cancel();
        self.transition(PublisherState::Cancelled);
    }

    async fn fail(&mut self, error: StreamError) {
        log::error!(
            "Event stream from {} failed: {error}",
            self.reader.path().display()
        );
        self.reader.cancel();
        self.transition(PublisherState::Errored);
        // The client may already be gone; nothing left to report to.
        let _ = self.tx.send(Err(error)).await;
    }

    const fn outcome(&self) -> PublishOutcome {
        PublishOutcome {
            state: self.state,
            rows_sent: self.rows_sent,
            stats: self.reader.stats(),
        }
    }
}
