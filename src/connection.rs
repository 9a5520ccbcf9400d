//! Connection manager: owns the single live link and drives the dashboard
//! state from transport events.
//!
//! Transport callbacks are modelled as tagged [`TransportEvent`] values sent
//! over a channel, so the state machine in [`ConnectionManager::apply`] can
//! be driven without a socket.

use tokio::sync::{mpsc, oneshot};

use crate::error::ConnectError;
use crate::history::DashboardState;
use crate::types::{ActivityEvent, ConnectionId, ConnectionStatus};
use crate::validator::validate;

pub const MSG_CONNECTING: &str = "Connecting...";
pub const MSG_CONNECTED: &str = "Connected to stream.";
pub const MSG_DISCONNECTED: &str = "Disconnected from stream.";
pub const MSG_TRANSPORT_ERROR: &str = "WebSocket error occurred.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    /// Transport-level failure; the detail is logged, not shown.
    Failed(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: ConnectionId,
    pub event: TransportEvent,
}

/// Sending half handed to a transport; stamps every event with its link id.
#[derive(Debug, Clone)]
pub struct EventSender {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSender {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns false once the manager is gone.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.tx.send(Envelope { id: self.id, event }).is_ok()
    }
}

/// Close signal for one live transport. Dropping it also closes the transport.
#[derive(Debug)]
pub struct Link {
    shutdown: Option<oneshot::Sender<()>>,
}

impl Link {
    pub fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }

    /// A link paired with the receiver its transport should watch.
    pub fn pair() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx), rx)
    }

    pub fn close(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.signal();
    }
}

/// Creates transports. Construction is synchronous and may fail; everything
/// after that is reported through `events`.
pub trait Connector {
    fn open(&self, endpoint: &str, events: EventSender) -> Result<Link, ConnectError>;
}

struct LiveLink {
    id: ConnectionId,
    link: Link,
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    live: Option<LiveLink>,
    next_id: u64,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    state: DashboardState,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, state: DashboardState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connector,
            live: None,
            next_id: 0,
            tx,
            rx,
            state,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Id of the link currently held, if any.
    pub fn live_id(&self) -> Option<ConnectionId> {
        self.live.as_ref().map(|l| l.id)
    }

    /// Opens a new link to `endpoint`, tearing down any held one first.
    /// Construction failures are logged, never returned.
    pub fn connect(&mut self, endpoint: &str) {
        self.disconnect();

        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        let sender = EventSender {
            id,
            tx: self.tx.clone(),
        };

        match self.connector.open(endpoint, sender) {
            Ok(link) => {
                tracing::info!("link {} opening to {}", id, endpoint);
                self.live = Some(LiveLink { id, link });
                self.state.status = ConnectionStatus::Connecting;
                self.record(MSG_CONNECTING);
            }
            Err(e) => {
                tracing::warn!("could not create link to {}: {}", endpoint, e);
                self.state.log.push(ActivityEvent::now(format!("Connection error: {}", e)));
            }
        }
    }

    /// Closes the held link, if any. Calling it again is a no-op.
    pub fn disconnect(&mut self) {
        if let Some(live) = self.live.take() {
            tracing::info!("closing link {}", live.id);
            live.link.close();
            self.end_session();
        }
    }

    /// Waits until the transport of link `id` reports `Closed`, applying
    /// whatever arrives before it.
    pub async fn settle(&mut self, id: ConnectionId) {
        while let Some(env) = self.rx.recv().await {
            let done = env.id == id && env.event == TransportEvent::Closed;
            self.apply(env);
            if done {
                break;
            }
        }
    }

    /// Waits for the next transport event and applies it. Returns false only
    /// if the channel is closed, which cannot happen while `self` is alive.
    pub async fn next_event(&mut self) -> bool {
        match self.rx.recv().await {
            Some(env) => {
                self.apply(env);
                true
            }
            None => false,
        }
    }

    /// Applies every event already queued, without waiting.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Ok(env) = self.rx.try_recv() {
            self.apply(env);
            n += 1;
        }
        n
    }

    /// Applies one transport event. Events from a superseded link are dropped.
    pub fn apply(&mut self, env: Envelope) {
        if self.live_id() != Some(env.id) {
            tracing::debug!("ignoring {:?} from stale link {}", env.event, env.id);
            return;
        }

        match env.event {
            TransportEvent::Opened => {
                self.state.status = ConnectionStatus::Connected;
                self.record(MSG_CONNECTED);
            }
            TransportEvent::Frame(raw) => match validate(&raw) {
                Ok(packet) => {
                    tracing::debug!("accepted packet for segment {}", packet.segment);
                    self.state.history.append(packet);
                    self.state.accepted += 1;
                }
                Err(rejection) => {
                    tracing::warn!("link {}: {}", env.id, rejection);
                    self.state.log.push(ActivityEvent::now(rejection.to_string()));
                }
            },
            TransportEvent::Failed(detail) => {
                tracing::warn!("transport error on link {}: {}", env.id, detail);
                self.state.log.push(ActivityEvent::now(MSG_TRANSPORT_ERROR));
            }
            TransportEvent::Closed => {
                self.live = None;
                self.end_session();
            }
        }
    }

    /// The packet history belongs to one session and goes with it.
    fn end_session(&mut self) {
        self.state.status = ConnectionStatus::Disconnected;
        self.state.history.clear();
        self.record(MSG_DISCONNECTED);
    }

    fn record(&mut self, message: impl Into<String>) {
        let event = ActivityEvent::now(message);
        tracing::info!("{}", event.message);
        self.state.log.push(event);
    }
}
