use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::connection::{Connector, EventSender, Link, TransportEvent};
use crate::error::ConnectError;

/// Checks that `endpoint` can be handed to a WebSocket client.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, ConnectError> {
    let url = Url::parse(endpoint)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConnectError::UnsupportedScheme(other.to_string())),
    }
}

/// WebSocket connector. Each link runs on its own task in the current
/// tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, endpoint: &str, events: EventSender) -> Result<Link, ConnectError> {
        let url = parse_endpoint(endpoint)?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| ConnectError::NoRuntime)?;
        let (link, shutdown) = Link::pair();
        handle.spawn(run_link(url, events, shutdown));
        Ok(link)
    }
}

/// Drives one connection until the peer closes, the stream fails, or the
/// link is closed locally. Always finishes with `Closed`.
async fn run_link(url: Url, events: EventSender, mut shutdown: oneshot::Receiver<()>) {
    let id = events.id();

    let ws = tokio::select! {
        res = connect_async(url.as_str()) => match res {
            Ok((ws, _)) => ws,
            Err(e) => {
                tracing::warn!("link {} handshake with {} failed: {}", id, url, e);
                events.send(TransportEvent::Failed(e.to_string()));
                events.send(TransportEvent::Closed);
                return;
            }
        },
        _ = &mut shutdown => {
            events.send(TransportEvent::Closed);
            return;
        }
    };

    events.send(TransportEvent::Opened);
    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    tracing::debug!("link {} close frame not sent: {}", id, e);
                }
                break;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if !events.send(TransportEvent::Frame(text)) {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // receive-only role: binary, ping and pong frames carry nothing for us
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("link {} read error: {}", id, e);
                    events.send(TransportEvent::Failed(e.to_string()));
                    break;
                }
            }
        }
    }

    events.send(TransportEvent::Closed);
}
