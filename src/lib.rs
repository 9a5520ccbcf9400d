//! Live traffic telemetry dashboard core.
//!
//! A [`ConnectionManager`] holds one streaming link, validates every inbound
//! frame, and keeps a rolling history plus an activity log. [`DashboardView`]
//! turns that state into display-ready values.

pub mod config;
pub mod connection;
pub mod error;
pub mod history;
pub mod transport;
pub mod types;
pub mod validator;
pub mod view;

pub use config::DashboardConfig;
pub use connection::{ConnectionManager, Connector, Envelope, EventSender, Link, TransportEvent};
pub use error::{ConfigError, ConnectError, Rejection};
pub use history::{DashboardState, EventLog, HistoryStore};
pub use transport::WsConnector;
pub use types::{ActivityEvent, ConnectionId, ConnectionStatus, TrafficPacket};
pub use validator::validate;
pub use view::{ChartView, DashboardView, StatsView, StatusTier};
