//! Line-delimited JSON host for the reader bridge.
//!
//! Each input line is one method call, optionally tagged with an `id` that
//! is echoed on the matching response:
//!
//! ```text
//! > {"id":1,"method":"initialize"}
//! < {"id":1,"status":"success","value":true}
//! > {"id":2,"method":"readCard"}
//! < {"event":"tag","uid":"04A1B2C3","timestamp":1760601600000}
//! < {"id":2,"status":"success","value":{"uid":"04A1B2C3","timestamp":1760601600000}}
//! ```
//!
//! `readCard` runs on its own task so a later `disposeReader` can cancel
//! it. Every other call is handled in input order. End of input disposes
//! the reader.

use anyhow::Context;
use futures::{SinkExt, StreamExt};
use mifare_bridge::{MethodCall, MethodResponse, ReaderBridge};
use mifare_core::constants::methods;
use mifare_hardware::CardReader;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

const OUTPUT_BUFFER: usize = 32;

/// A parsed input line.
#[derive(Debug)]
struct Request {
    id: Option<Value>,
    call: MethodCall,
}

impl Request {
    fn parse(line: &str) -> serde_json::Result<Self> {
        let mut raw: Value = serde_json::from_str(line)?;
        let id = raw.as_object_mut().and_then(|fields| fields.remove("id"));
        let call = serde_json::from_value(raw)?;
        Ok(Self { id, call })
    }
}

/// Render a response line, echoing the request id when there is one.
fn response_line(id: Option<Value>, response: &MethodResponse) -> String {
    let mut value = serde_json::to_value(response).unwrap_or_else(|e| {
        json!({ "status": "error", "code": "READ_ERROR", "message": e.to_string() })
    });
    if let (Some(id), Some(fields)) = (id, value.as_object_mut()) {
        fields.insert("id".to_string(), id);
    }
    value.to_string()
}

/// Serve method calls from `input` until end of input, writing responses
/// and tag events to `output`.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written.
pub async fn serve<R, I, O>(bridge: ReaderBridge<R>, input: I, output: O) -> anyhow::Result<()>
where
    R: CardReader + 'static,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(OUTPUT_BUFFER);

    let writer = tokio::spawn(async move {
        let mut sink = FramedWrite::new(output, LinesCodec::new());
        while let Some(line) = rx.recv().await {
            sink.send(line).await?;
        }
        Ok::<_, LinesCodecError>(())
    });

    let forwarder = tokio::spawn(forward_tags(bridge.subscribe_tags(), tx.clone()));

    info!(channel = %bridge.channel(), "Serving method calls");

    let mut lines = FramedRead::new(input, LinesCodec::new());
    let mut reads = JoinSet::new();

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read method call")?;
        if line.trim().is_empty() {
            continue;
        }

        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed method call: {}", e);
                send(&tx, response_line(None, &MethodResponse::NotImplemented)).await;
                continue;
            }
        };

        if request.call.method == methods::READ_CARD {
            let bridge = bridge.clone();
            let tx = tx.clone();
            reads.spawn(async move {
                let response = bridge.handle(&request.call).await;
                send(&tx, response_line(request.id, &response)).await;
            });
        } else {
            let response = bridge.handle(&request.call).await;
            send(&tx, response_line(request.id, &response)).await;
        }
    }

    debug!("Input closed, disposing reader");
    bridge.dispose_reader().await;
    while let Some(joined) = reads.join_next().await {
        if let Err(e) = joined {
            warn!("Read task failed: {}", e);
        }
    }

    // Dropping the last bridge closes the tag stream, which ends the forwarder.
    drop(bridge);
    if let Err(e) = forwarder.await {
        warn!("Tag forwarder failed: {}", e);
    }
    drop(tx);

    writer
        .await
        .context("output writer panicked")?
        .context("failed to write response")?;
    Ok(())
}

async fn forward_tags(
    mut tags: broadcast::Receiver<mifare_bridge::TagEvent>,
    tx: mpsc::Sender<String>,
) {
    loop {
        match tags.recv().await {
            Ok(event) => {
                let line = json!({
                    "event": "tag",
                    "uid": event.uid.to_hex(),
                    "timestamp": event.timestamp.timestamp_millis(),
                });
                if tx.send(line.to_string()).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Tag listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send(tx: &mpsc::Sender<String>, line: String) {
    if tx.send(line).await.is_err() {
        warn!("Output closed, dropping response");
    }
}
