//! Display projection of the dashboard state.
//!
//! Everything here is a pure function of the history buffer and the latest
//! packet. Values are coerced loosely: a non-numeric speed is shown as `NaN`
//! rather than silently replaced.

use serde::Serialize;
use serde_json::Value;

use crate::history::{DashboardState, HistoryStore};
use crate::types::{display_value, ActivityEvent, ConnectionStatus, TrafficPacket};

pub const CHART_WINDOW: usize = 40;
pub const CHART_WIDTH: f64 = 600.0;
pub const CHART_HEIGHT: f64 = 220.0;
pub const CHART_PADDING: f64 = 24.0;
/// Scale used when the window holds no numeric value.
pub const FALLBACK_RANGE: (f64, f64) = (0.0, 100.0);

pub const WAITING_TEXT: &str = "Waiting for live traffic data...";
pub const NO_EVENTS_TEXT: &str = "No events yet.";

/// Loose numeric coercion of a raw JSON value.
///
/// Null and empty strings give 0, booleans give 0/1, numeric strings parse
/// (including `0x`/`0o`/`0b` literals), an empty array gives 0 and a
/// one-element array coerces its element. Anything else is NaN.
pub fn coerce_number(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => coerce_str(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            // an element is coerced through its text form, where booleans are words
            [Value::Bool(_)] | [Value::Object(_)] => f64::NAN,
            [only] => coerce_number(only),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Coercion of an optional field; an absent field is NaN.
pub fn coerce_field(v: Option<&Value>) -> f64 {
    v.map(coerce_number).unwrap_or(f64::NAN)
}

fn coerce_str(s: &str) -> f64 {
    let s = s.trim();
    match s {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => {
            if let Some(v) = coerce_radix_literal(s) {
                return v;
            }
            // f64::from_str also takes "inf" and "nan" spellings
            let lower = s.to_ascii_lowercase();
            if lower.contains("inf") || lower.contains("nan") {
                f64::NAN
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
    }
}

/// Unsigned `0x`, `0o` and `0b` literals. `None` when `s` has no such prefix.
fn coerce_radix_literal(s: &str) -> Option<f64> {
    let prefix = s.get(..2)?.to_ascii_lowercase();
    let radix = match prefix.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Some(f64::NAN);
    }
    Some(
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64),
    )
}

/// Digits after the point needed to print any finite f64 exactly.
const EXACT_FRACTION_DIGITS: usize = 1100;

/// Fixed-point text rounded once from the exact binary value.
///
/// An exact tie goes to the larger magnitude. Negative zero prints without a
/// sign, while a small negative value that rounds to zero keeps it.
pub fn format_fixed(v: f64, digits: usize) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let exact = format!("{:.*}", EXACT_FRACTION_DIGITS, v.abs());
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac.bytes().take(digits))
        .collect();
    if frac.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        round_up(&mut kept);
    }

    let split = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if v < 0.0 {
        out.push('-');
    }
    out.extend(kept[..split].iter().map(|&b| b as char));
    if digits > 0 {
        out.push('.');
        out.extend(kept[split..].iter().map(|&b| b as char));
    }
    out
}

/// Adds one to the last place of an ASCII digit string, carrying left.
fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

pub fn format_speed(v: f64) -> String {
    format!("{} km/h", format_fixed(v, 1))
}

pub fn format_occupancy(v: f64) -> String {
    format!("{}%", format_fixed(v * 100.0, 0))
}

/// Badge tier derived from the free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusTier {
    Alert,
    Warning,
    Normal,
}

impl StatusTier {
    pub fn classify(status: Option<&str>) -> Self {
        match status.map(str::to_lowercase) {
            Some(s) if s.contains("high") => StatusTier::Alert,
            Some(s) if s.contains("moderate") => StatusTier::Warning,
            _ => StatusTier::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusTier::Alert => "alert",
            StatusTier::Warning => "warning",
            StatusTier::Normal => "normal",
        }
    }
}

/// The stats card for the latest packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub title: String,
    pub badge: String,
    pub tier: StatusTier,
    pub predicted: String,
    pub actual: String,
    pub average: String,
    pub occupancy: String,
    pub footer: String,
}

impl StatsView {
    pub fn project(p: &TrafficPacket) -> Self {
        let status = p.status_text();
        Self {
            title: format!("Segment {}", display_value(&p.segment)),
            badge: p.status.as_ref().map(display_value).unwrap_or_default(),
            tier: StatusTier::classify(status),
            predicted: format_speed(coerce_number(&p.pred_speed)),
            actual: format_speed(coerce_number(&p.actual_speed)),
            average: format_speed(coerce_field(p.avg_speed.as_ref())),
            occupancy: format_occupancy(coerce_field(p.occupancy.as_ref())),
            footer: format!("Last update • {}", display_value(&p.timestamp)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Two polylines on a shared vertical scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub min: f64,
    pub max: f64,
    pub predicted: Vec<Point>,
    pub actual: Vec<Point>,
}

impl ChartView {
    pub fn project(history: &HistoryStore, window: usize) -> Self {
        let samples: Vec<(f64, f64)> = history
            .recent(window.max(1))
            .map(|p| (coerce_number(&p.pred_speed), coerce_number(&p.actual_speed)))
            .collect();
        Self::from_samples(&samples)
    }

    /// Builds the chart from `(predicted, actual)` pairs, oldest first.
    pub fn from_samples(samples: &[(f64, f64)]) -> Self {
        let (min, max) = scale_bounds(samples);

        let inner_w = CHART_WIDTH - CHART_PADDING * 2.0;
        let inner_h = CHART_HEIGHT - CHART_PADDING * 2.0;
        let span = (samples.len().saturating_sub(1)).max(1) as f64;
        let scale_x = |i: usize| (i as f64 / span) * inner_w + CHART_PADDING;
        let scale_y = |v: f64| CHART_HEIGHT - CHART_PADDING - ((v - min) / (max - min)) * inner_h;
        let point = |i: usize, v: f64| Point {
            x: scale_x(i),
            y: scale_y(if v.is_nan() { 0.0 } else { v }),
        };

        Self {
            min,
            max,
            predicted: samples.iter().enumerate().map(|(i, s)| point(i, s.0)).collect(),
            actual: samples.iter().enumerate().map(|(i, s)| point(i, s.1)).collect(),
        }
    }

    pub fn predicted_path(&self) -> String {
        svg_path(&self.predicted)
    }

    pub fn actual_path(&self) -> String {
        svg_path(&self.actual)
    }
}

fn scale_bounds(samples: &[(f64, f64)]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in samples.iter().flat_map(|s| [s.0, s.1]).filter(|v| !v.is_nan()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return FALLBACK_RANGE;
    }
    if max == min {
        max = min + 1.0;
    }
    (min, max)
}

/// `M x y L x y ...` path data for a polyline.
pub fn svg_path(points: &[Point]) -> String {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} {} {}", if i == 0 { "M" } else { "L" }, p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the rendering layer draws, recomputed on every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub status: ConnectionStatus,
    pub stats: Option<StatsView>,
    pub chart: ChartView,
    pub events: Vec<ActivityEvent>,
}

impl DashboardView {
    pub fn project(state: &DashboardState, chart_window: usize) -> Self {
        Self {
            status: state.status(),
            stats: state.latest().map(StatsView::project),
            chart: ChartView::project(state.history(), chart_window),
            events: state.log().snapshot(),
        }
    }
}
