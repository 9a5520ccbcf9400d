use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use traffic_dashboard::config::{DashboardConfig, GENERATOR_ENDPOINT};
use traffic_dashboard::view::{ChartView, StatsView, NO_EVENTS_TEXT, WAITING_TEXT};
use traffic_dashboard::{ConnectionManager, Connector, DashboardState, WsConnector};

/// How long a closing link may take to send its close frame at exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

const SAMPLE_PACKET: &str = r#"{"segment":"S1","pred_speed":67.5,"avg_speed":62.1,"occupancy":0.82,"status":"High Traffic","actual_speed":63.3,"timestamp":"2025-10-27 14:52:00"}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = DashboardConfig::from_env()?;
    tracing::info!(
        "history={} log={} chart_window={}",
        cfg.history_capacity,
        cfg.log_capacity,
        cfg.chart_window
    );

    let mut endpoint = cfg.endpoint.clone();
    let state = DashboardState::new(cfg.history_capacity, cfg.log_capacity);
    let mut manager = ConnectionManager::new(WsConnector, state);

    print_help(&endpoint);
    if cfg.auto_connect {
        manager.connect(&endpoint);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seen = manager.state().accepted();

    loop {
        tokio::select! {
            _ = manager.next_event() => {
                let accepted = manager.state().accepted();
                if accepted != seen {
                    seen = accepted;
                    if let Some(p) = manager.state().latest() {
                        println!("{}", render_stats_line(&StatsView::project(p)));
                    }
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !run_command(&mut manager, &mut endpoint, cfg.chart_window, line.trim()) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin closed: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(id) = manager.live_id() {
        manager.disconnect();
        if tokio::time::timeout(SHUTDOWN_GRACE, manager.settle(id)).await.is_err() {
            tracing::warn!("link {} did not close within {:?}", id, SHUTDOWN_GRACE);
        }
    }
    Ok(())
}

/// Handles one line of user input. Returns false when the user asks to quit.
fn run_command<C: Connector>(
    manager: &mut ConnectionManager<C>,
    endpoint: &mut String,
    chart_window: usize,
    line: &str,
) -> bool {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (line, ""),
    };

    match cmd {
        "" => {}
        "connect" => {
            if !arg.is_empty() {
                *endpoint = arg.to_string();
            }
            manager.connect(endpoint);
        }
        "disconnect" => manager.disconnect(),
        "url" => {
            if arg.is_empty() {
                println!("{}", endpoint);
            } else {
                *endpoint = arg.to_string();
                println!("endpoint set to {}", endpoint);
            }
        }
        "status" => println!(
            "{}  endpoint={}  history={}  accepted={}",
            manager.status(),
            endpoint,
            manager.state().history().len(),
            manager.state().accepted()
        ),
        "stats" => match manager.state().latest() {
            Some(p) => print_stats(&StatsView::project(p)),
            None => println!("{}", WAITING_TEXT),
        },
        "log" => {
            let log = manager.state().log();
            if log.is_empty() {
                println!("{}", NO_EVENTS_TEXT);
            }
            for e in log.iter() {
                println!("{}", e);
            }
        }
        "chart" => print_chart(&ChartView::project(manager.state().history(), chart_window)),
        "help" => print_help(endpoint),
        "quit" | "exit" => return false,
        other => println!("unknown command '{}', try 'help'", other),
    }
    true
}

fn render_stats_line(s: &StatsView) -> String {
    format!(
        "[ {} ] pred={}  actual={}  avg={}  occ={}  status={} ({})  {}",
        s.title,
        s.predicted,
        s.actual,
        s.average,
        s.occupancy,
        s.badge,
        s.tier.label(),
        s.footer
    )
}

fn print_stats(s: &StatsView) {
    println!("{}  [{}: {}]", s.title, s.tier.label(), s.badge);
    println!("  Predicted Speed  {}", s.predicted);
    println!("  Actual Speed     {}", s.actual);
    println!("  Average Speed    {}", s.average);
    println!("  Occupancy        {}", s.occupancy);
    println!("  {}", s.footer);
}

fn print_chart(c: &ChartView) {
    println!("Speed Trend (km/h)  scale {}..{}  samples={}", c.min, c.max, c.predicted.len());
    println!("  predicted: {}", c.predicted_path());
    println!("  actual:    {}", c.actual_path());
}

fn print_help(endpoint: &str) {
    println!("Traffic Management Prediction Dashboard");
    println!("  endpoint (role=dashboard): {}", endpoint);
    println!("  generators push packets to dashboards: {}", GENERATOR_ENDPOINT);
    println!("  packet format: {}", SAMPLE_PACKET);
    println!("  commands: connect [url] | disconnect | url [url] | status | stats | log | chart");
    println!("            help | quit");
}
