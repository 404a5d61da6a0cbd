//! Drives one stream lifecycle into a layer's cache.

use std::time::Duration;

use safety_map_stream_models::Dataset;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::accumulator::Accumulator;
use crate::layer::LoadTicket;
use crate::scheduler::{DEFAULT_FRAME_PERIOD, FrameClock};
use crate::subscription::{SubscriptionEvent, subscribe};

/// Tuning for a load.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Buffered records that trigger a flush.
    pub flush_threshold: usize,
    /// Delay between scheduling and performing a flush.
    pub frame_period: Duration,
}

impl LoadOptions {
    /// Default options for `dataset`.
    #[must_use]
    pub const fn for_dataset(dataset: Dataset) -> Self {
        Self {
            flush_threshold: dataset.flush_threshold(),
            frame_period: DEFAULT_FRAME_PERIOD,
        }
    }
}

/// Consumes `events` into the ticket's cache until the stream ends.
///
/// Records are batched through an [`Accumulator`] and flushed at most once
/// per frame. On `Done`, or when the sender side goes away, the remaining
/// buffer is flushed and the ticket is released. Returns the number of
/// records cached.
pub async fn load<T>(
    ticket: LoadTicket<T>,
    mut events: mpsc::UnboundedReceiver<SubscriptionEvent<T>>,
    options: LoadOptions,
) -> usize {
    let dataset = ticket.dataset();
    let mut accumulator = Accumulator::new(
        options.flush_threshold,
        FrameClock::new(options.frame_period),
    );

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            () = accumulator.scheduler_mut().tick() => {
                accumulator.flush(&mut ticket.cache().write());
                continue;
            }
        };

        match event {
            Some(SubscriptionEvent::Row(record)) => accumulator.push(record),
            Some(SubscriptionEvent::Done) | None => break,
        }
    }

    let total = {
        let mut cache = ticket.cache().write();
        accumulator.finish(&mut cache);
        cache.len()
    };
    log::info!("{dataset} load complete: {total} records cached");

    drop(ticket);
    total
}

/// Subscribes to `url` and loads it into the ticket's cache on a new task.
///
/// The subscription lives as long as the load; the returned handle resolves
/// to the number of records cached.
pub fn spawn_load<T>(
    client: &reqwest::Client,
    url: &str,
    ticket: LoadTicket<T>,
    options: LoadOptions,
) -> JoinHandle<usize>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let done_tx = tx.clone();

    let subscription = subscribe(
        client,
        url,
        move |record| {
            let _ = tx.send(SubscriptionEvent::Row(record));
        },
        move || {
            let _ = done_tx.send(SubscriptionEvent::Done);
        },
    );

    tokio::spawn(async move {
        let total = load(ticket, rx, options).await;
        drop(subscription);
        total
    })
}

#[cfg(test)]
mod tests {
    use safety_map_stream_models::EmergencyCall;

    use super::*;
    use crate::layer::{DatasetLayer, LayerKind};
    use crate::test_server;

    fn call(id: usize) -> EmergencyCall {
        EmergencyCall {
            id: id.to_string(),
            event_id: format!("E{id}"),
            police_station: "S".to_string(),
            call_type: "T".to_string(),
            latitude: 20.0,
            longitude: 73.8,
            received_at: "now".to_string(),
        }
    }

    fn options(threshold: usize) -> LoadOptions {
        LoadOptions {
            flush_threshold: threshold,
            frame_period: Duration::from_millis(16),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_everything_on_done() {
        let mut layer = DatasetLayer::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        for i in 0..250 {
            tx.send(SubscriptionEvent::Row(call(i))).unwrap();
        }
        tx.send(SubscriptionEvent::Done).unwrap();

        let total = load(ticket, rx, options(100)).await;
        assert_eq!(total, 250);
        assert_eq!(layer.cached_len(), 250);
        assert!(!layer.is_loading());

        let cache = layer.cache().read();
        let ids: Vec<usize> = cache
            .as_slice()
            .iter()
            .map(|c| c.id.parse().unwrap())
            .collect();
        assert_eq!(ids, (0..250).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_on_frame_while_streaming() {
        let mut layer = DatasetLayer::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        let cache = ticket.cache().clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(load(ticket, rx, options(50)));
        for i in 0..120 {
            tx.send(SubscriptionEvent::Row(call(i))).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 120 rows crossed the threshold; one frame moved the whole buffer.
        assert_eq!(cache.len(), 120);
        assert!(layer.is_loading());

        drop(tx);
        assert_eq!(task.await.unwrap(), 120);
        assert!(!layer.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn below_threshold_waits_for_done() {
        let mut layer = DatasetLayer::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Heatmap, true).unwrap();
        let cache = ticket.cache().clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(load(ticket, rx, options(100)));
        for i in 0..10 {
            tx.send(SubscriptionEvent::Row(call(i))).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.len(), 0);

        tx.send(SubscriptionEvent::Done).unwrap();
        assert_eq!(task.await.unwrap(), 10);
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test]
    async fn spawn_load_fills_cache_from_server() {
        let rows: Vec<String> = (0..130)
            .map(|i| serde_json::to_string(&call(i)).unwrap())
            .collect();
        let (base, server) =
            test_server::serve("200 OK", test_server::frames(&rows, true)).await;

        let mut layer = DatasetLayer::<EmergencyCall>::new(Dataset::Dial112);
        let ticket = layer.set_visible(LayerKind::Points, true).unwrap();
        let handle = spawn_load(
            &reqwest::Client::new(),
            &format!("{base}/api/dial112/stream"),
            ticket,
            LoadOptions::for_dataset(Dataset::Dial112),
        );

        assert_eq!(handle.await.unwrap(), 130);
        assert_eq!(layer.cached_len(), 130);
        assert!(!layer.is_loading());
        server.abort();
    }
}
