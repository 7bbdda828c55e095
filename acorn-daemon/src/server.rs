use std::path::Path;

use acorn_core::ipc::{AcornRequest, AcornResponse};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

use crate::router;
use crate::state::AppState;
use crate::subsystems::broadcast::EventSink;

// Wire format: 4-byte little-endian length prefix + MessagePack payload
fn le_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

pub async fn run_unix_server(
    socket_path: &str,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    tracing::info!("IPC server listening on {}", socket_path);

    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, _) = res?;
                let state = state.clone();
                tokio::spawn(handle_connection(stream, state));
            }
            _ = shutdown.recv() => {
                tracing::info!("Shutting down IPC server...");
                break;
            }
        }
    }

    if Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path)?;
    }

    Ok(())
}

async fn handle_connection(stream: UnixStream, state: AppState) {
    let (read, write) = stream.into_split();
    let mut framed_read = FramedRead::new(read, le_codec());
    // Becomes None once this connection subscribes and the write half moves
    // into the event registry
    let mut framed_write: Option<EventSink> = Some(FramedWrite::new(write, le_codec()));
    let mut subscriber_id: Option<u64> = None;

    while let Some(frame) = framed_read.next().await {
        let bytes_mut = match frame {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Frame error: {}", e);
                break;
            }
        };

        let request: AcornRequest = match rmp_serde::from_slice(&bytes_mut) {
            Ok(req) => req,
            Err(e) => {
                let resp = AcornResponse::err(format!("Deserialization error: {}", e));
                if !send_response(&mut framed_write, &resp).await {
                    break;
                }
                continue;
            }
        };

        if matches!(request, AcornRequest::Subscribe) {
            match framed_write.take() {
                Some(mut sink) => {
                    let resp = AcornResponse::ok(serde_json::json!({"subscribed": true}));
                    match rmp_serde::to_vec_named(&resp) {
                        Ok(bytes) => {
                            if sink.send(Bytes::from(bytes)).await.is_ok() {
                                subscriber_id = Some(state.subscribers.add(sink).await);
                            }
                        }
                        Err(e) => tracing::error!("Failed to serialize response: {}", e),
                    }
                }
                None => tracing::warn!("Duplicate subscribe on connection, ignoring"),
            }
            continue;
        }

        if framed_write.is_none() {
            tracing::warn!("Ignoring request on a subscribed connection");
            continue;
        }

        let response = router::handle_request(request, &state).await;
        if !send_response(&mut framed_write, &response).await {
            break;
        }
    }

    if let Some(id) = subscriber_id {
        state.subscribers.remove(id).await;
    }
}

/// Serialize and send one response. Returns false when the connection is
/// gone and the read loop should stop.
async fn send_response(sink: &mut Option<EventSink>, response: &AcornResponse) -> bool {
    let Some(sink) = sink.as_mut() else {
        return true;
    };

    match rmp_serde::to_vec_named(response) {
        Ok(bytes) => {
            if let Err(e) = sink.send(Bytes::from(bytes)).await {
                tracing::error!("Failed to send response: {}", e);
                return false;
            }
            true
        }
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            false
        }
    }
}
