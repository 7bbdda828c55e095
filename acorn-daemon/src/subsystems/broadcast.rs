//! Subscriber registry and event fan-out.
//!
//! Connections that send `Subscribe` hand their write half over here and
//! become "page contexts": passive receivers of [`AcornEvent`] frames.
//! Fan-out is an explicit loop over every registered sink; a destination
//! that fails to accept a frame is logged and dropped without affecting
//! delivery to the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use acorn_core::ipc::AcornEvent;
use bytes::Bytes;
use futures::SinkExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};

pub type EventSink = FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>;

#[derive(Clone, Default)]
pub struct Subscribers {
    sinks: Arc<Mutex<HashMap<u64, EventSink>>>,
    next_id: Arc<AtomicU64>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink and return its id for later removal.
    pub async fn add(&self, sink: EventSink) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().await.insert(id, sink);
        tracing::debug!(subscriber = id, "Page context subscribed");
        id
    }

    pub async fn remove(&self, id: u64) {
        if self.sinks.lock().await.remove(&id).is_some() {
            tracing::debug!(subscriber = id, "Page context unsubscribed");
        }
    }

    pub async fn len(&self) -> usize {
        self.sinks.lock().await.len()
    }

    /// Push an event to every subscriber. Failed destinations are dropped
    /// from the registry; one dead page context never blocks the others.
    pub async fn broadcast(&self, event: &AcornEvent) {
        let bytes = match rmp_serde::to_vec_named(event) {
            Ok(b) => Bytes::from(b),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event");
                return;
            }
        };

        let mut sinks = self.sinks.lock().await;
        let mut dead = Vec::new();

        for (id, sink) in sinks.iter_mut() {
            if let Err(e) = sink.send(bytes.clone()).await {
                tracing::debug!(subscriber = id, error = %e, "Dropping unreachable page context");
                dead.push(*id);
            }
        }
        for id in dead {
            sinks.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::net::UnixStream;
    use tokio_util::codec::FramedRead;

    fn le_codec() -> LengthDelimitedCodec {
        LengthDelimitedCodec::builder().little_endian().new_codec()
    }

    #[tokio::test]
    async fn broadcast_reaches_live_subscribers() {
        let subscribers = Subscribers::new();

        let (client, server) = UnixStream::pair().unwrap();
        let (_server_read, server_write) = server.into_split();
        subscribers
            .add(FramedWrite::new(server_write, le_codec()))
            .await;

        subscribers
            .broadcast(&AcornEvent::CaptureModeChanged { enabled: true })
            .await;

        let (client_read, _client_write) = client.into_split();
        let mut framed = FramedRead::new(client_read, le_codec());
        let frame = framed.next().await.unwrap().unwrap();
        let event: AcornEvent = rmp_serde::from_slice(&frame).unwrap();

        match event {
            AcornEvent::CaptureModeChanged { enabled } => assert!(enabled),
            other => panic!("wrong event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn dead_subscriber_does_not_break_fanout() {
        let subscribers = Subscribers::new();

        // First subscriber's peer goes away entirely
        let (dead_client, dead_server) = UnixStream::pair().unwrap();
        let (_r, dead_write) = dead_server.into_split();
        subscribers.add(FramedWrite::new(dead_write, le_codec())).await;
        drop(dead_client);

        let (live_client, live_server) = UnixStream::pair().unwrap();
        let (_r2, live_write) = live_server.into_split();
        subscribers.add(FramedWrite::new(live_write, le_codec())).await;

        // Two broadcasts: the first may only observe the failure on write,
        // the second must still reach the live context
        for _ in 0..2 {
            subscribers
                .broadcast(&AcornEvent::VectorizeProgress { current: 1, total: 5 })
                .await;
        }

        let (live_read, _w) = live_client.into_split();
        let mut framed = FramedRead::new(live_read, le_codec());
        let frame = framed.next().await.unwrap().unwrap();
        let event: AcornEvent = rmp_serde::from_slice(&frame).unwrap();
        assert!(matches!(event, AcornEvent::VectorizeProgress { current: 1, total: 5 }));

        assert_eq!(subscribers.len().await, 1, "dead context should be dropped");
    }
}
