/// End-to-end tests against a local WebSocket server.
///
/// Run with: cargo test --test stream_integration -- --nocapture
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use traffic_dashboard::{ConnectionManager, ConnectionStatus, DashboardState, WsConnector};

const WAIT: Duration = Duration::from_secs(5);

/// Accepts one dashboard, pushes `frames`, then optionally closes. Resolves
/// to true once the client's close frame (or end of stream) was seen.
async fn serve_once(frames: Vec<String>, close_after: bool) -> (String, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        let (mut write, mut read) = ws.split();
        for f in frames {
            write.send(Message::Text(f)).await.unwrap();
        }
        if close_after {
            let _ = write.send(Message::Close(None)).await;
        }
        while let Some(msg) = read.next().await {
            match msg {
                Ok(m) if m.is_close() => return true,
                Ok(_) => {}
                Err(_) => return true,
            }
        }
        true
    });

    (format!("ws://{}/stream?role=dashboard", addr), handle)
}

fn messages(m: &ConnectionManager<WsConnector>) -> Vec<String> {
    m.state().log().iter().map(|e| e.message.clone()).collect()
}

#[tokio::test]
async fn test_stream_until_peer_close() {
    println!("\n=== Test: Stream Until Peer Close ===");
    let frames = vec![
        r#"{"segment":"S1","pred_speed":67.5,"avg_speed":62.1,"occupancy":0.82,"status":"High Traffic","actual_speed":63.3,"timestamp":"2025-10-27 14:52:00"}"#.to_string(),
        "not-json".to_string(),
        r#"{"segment":"S1","pred_speed":50,"actual_speed":48}"#.to_string(),
        r#"{"segment":"S2","pred_speed":40,"actual_speed":41,"timestamp":"2025-10-27 14:52:05"}"#.to_string(),
    ];
    let (url, server) = serve_once(frames, true).await;

    let mut m = ConnectionManager::new(WsConnector, DashboardState::default());
    m.connect(&url);
    assert_eq!(m.status(), ConnectionStatus::Connecting);

    timeout(WAIT, async {
        while m.state().accepted() < 2 {
            m.next_event().await;
        }
    })
    .await
    .expect("packets did not arrive");
    assert_eq!(m.state().history().len(), 2);
    assert_eq!(m.state().latest().unwrap().segment, "S2");

    timeout(WAIT, async {
        while m.live_id().is_some() {
            m.next_event().await;
        }
    })
    .await
    .expect("stream did not close");

    assert_eq!(m.status(), ConnectionStatus::Disconnected);
    assert!(m.state().history().is_empty());

    let log = messages(&m);
    println!("✓ log: {:?}", log);
    assert_eq!(log.first().map(String::as_str), Some("Disconnected from stream."));
    assert_eq!(log.last().map(String::as_str), Some("Connecting..."));
    assert!(log.iter().any(|l| l == "Connected to stream."));
    assert_eq!(log.iter().filter(|l| l.starts_with("Failed to parse message: ")).count(), 1);
    assert_eq!(log.iter().filter(|l| l.starts_with("Received non-conforming packet: ")).count(), 1);

    timeout(WAIT, server).await.expect("server hung").unwrap();
}

#[tokio::test]
async fn test_local_disconnect_closes_transport() {
    println!("\n=== Test: Local Disconnect ===");
    let frame = r#"{"segment":"S9","pred_speed":30,"actual_speed":29,"timestamp":"x"}"#.to_string();
    let (url, server) = serve_once(vec![frame], false).await;

    let mut m = ConnectionManager::new(WsConnector, DashboardState::default());
    m.connect(&url);

    timeout(WAIT, async {
        while m.state().accepted() < 1 {
            m.next_event().await;
        }
    })
    .await
    .expect("no packet arrived");
    assert_eq!(m.status(), ConnectionStatus::Connected);

    let id = m.live_id().unwrap();
    m.disconnect();
    assert_eq!(m.status(), ConnectionStatus::Disconnected);
    assert!(m.state().history().is_empty());
    let count = m.state().log().len();

    // the link task finishes and reports Closed for the released link
    timeout(WAIT, m.settle(id)).await.expect("link task never finished");
    assert_eq!(m.state().log().len(), count);

    let saw_close = timeout(WAIT, server)
        .await
        .expect("server never saw the close")
        .unwrap();
    assert!(saw_close);
    println!("✓ server observed close, no duplicate log line");
}

#[tokio::test]
async fn test_refused_connection() {
    println!("\n=== Test: Refused Connection ===");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut m = ConnectionManager::new(WsConnector, DashboardState::default());
    m.connect(&format!("ws://{}/stream?role=dashboard", addr));

    timeout(WAIT, async {
        while m.live_id().is_some() {
            m.next_event().await;
        }
    })
    .await
    .expect("refused connection never closed");

    let log = messages(&m);
    assert_eq!(
        log,
        vec!["Disconnected from stream.", "WebSocket error occurred.", "Connecting..."]
    );
    assert_eq!(m.status(), ConnectionStatus::Disconnected);
    println!("✓ refused connection reported, session still usable");
}

#[tokio::test]
async fn test_bad_scheme_never_spawns() {
    let mut m = ConnectionManager::new(WsConnector, DashboardState::default());
    m.connect("http://localhost:8080/stream");
    assert!(m.live_id().is_none());
    let log = messages(&m);
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("unsupported scheme"));
}
