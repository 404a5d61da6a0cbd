//! Event stream subscription.
//!
//! [`subscribe`] opens a dataset's stream endpoint on a background task and
//! reports every `row` event to a callback. The completion callback runs
//! exactly once when the stream ends for any reason, unless the
//! [`Subscription`] is closed first.

use futures::StreamExt as _;
use safety_map_stream_models::{DONE_EVENT, ROW_EVENT};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::ClientError;
use crate::sse::SseDecoder;

/// Events forwarded from a subscription to the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent<T> {
    /// A parsed record.
    Row(T),
    /// The stream ended.
    Done,
}

/// Handle to a running subscription.
///
/// Dropping or closing the handle stops listening and closes the
/// connection. The server notices on its next write.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stops listening and closes the connection. The completion callback
    /// is not invoked.
    pub fn close(self) {
        drop(self);
    }

    /// Whether the stream has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribes to the event stream at `url`.
///
/// `on_row` is called once per `row` event with the decoded record; rows
/// whose payload fails to decode are skipped. `on_done` is called once on
/// the `done` event, on a transport error, on a non-success status, or when
/// the body ends without `done`.
///
/// Must be called from within a tokio runtime.
pub fn subscribe<T, R, D>(client: &reqwest::Client, url: &str, on_row: R, on_done: D) -> Subscription
where
    T: DeserializeOwned + Send + 'static,
    R: FnMut(T) + Send + 'static,
    D: FnOnce() + Send + 'static,
{
    let request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream");
    let url = url.to_string();

    let task = tokio::spawn(async move {
        log::info!("Subscribing to {url}");
        match consume(request, on_row).await {
            Ok(rows) => log::info!("Event stream {url} complete ({rows} rows)"),
            Err(e) => log::warn!("Event stream {url} ended: {e}"),
        }
        on_done();
    });

    Subscription { task }
}

async fn consume<T, R>(request: reqwest::RequestBuilder, mut on_row: R) -> Result<u64, ClientError>
where
    T: DeserializeOwned,
    R: FnMut(T),
{
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
        });
    }

    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut rows = 0_u64;

    while let Some(chunk) = body.next().await {
        for event in decoder.feed(&chunk?) {
            match event.event.as_deref() {
                Some(ROW_EVENT) => match serde_json::from_str::<T>(&event.data) {
                    Ok(record) => {
                        rows += 1;
                        on_row(record);
                    }
                    Err(e) => log::debug!("Skipping malformed row: {e}"),
                },
                Some(DONE_EVENT) => return Ok(rows),
                _ => {}
            }
        }
    }

    log::debug!("Event stream closed without a done event");
    Ok(rows)
}
