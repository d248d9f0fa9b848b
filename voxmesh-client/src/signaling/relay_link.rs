use anyhow::Result;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use voxmesh_core::{ClientMessage, RelayMessage};

/// A bidirectional, ordered message channel to the relay.
///
/// The transport behind it is either a WebSocket (`connect`) or an in-memory
/// pair (`pair`), used when the relay lives in the same process.
pub struct RelayLink {
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub inbound: mpsc::UnboundedReceiver<RelayMessage>,
}

/// The relay-side half of an in-memory link.
pub struct RelayEndpoint {
    pub inbound: mpsc::UnboundedReceiver<ClientMessage>,
    pub outbound: mpsc::UnboundedSender<RelayMessage>,
}

impl RelayLink {
    pub fn pair() -> (RelayLink, RelayEndpoint) {
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        (
            RelayLink {
                outbound: client_tx,
                inbound: relay_rx,
            },
            RelayEndpoint {
                inbound: client_rx,
                outbound: relay_tx,
            },
        )
    }

    /// Open a WebSocket to the relay at `url`.
    ///
    /// The inbound queue ends when the socket closes; dropping every outbound
    /// sender closes the socket.
    pub async fn connect(url: &str) -> Result<RelayLink> {
        let (ws, _) = connect_async(url).await?;
        info!("Connected to relay at {}", url);
        let (mut sink, mut stream) = ws.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<RelayMessage>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode relay message: {:?}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
            debug!("Relay writer stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay socket error: {:?}", e);
                        break;
                    }
                };
                match serde_json::from_str::<RelayMessage>(text.as_str()) {
                    Ok(msg) => {
                        if in_tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping malformed relay message: {:?}", e),
                }
            }
            info!("Relay connection closed");
        });

        Ok(RelayLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
