use crate::alert::Alert;
use serde::{Deserialize, Serialize};

pub const ALERT_DOC_TYPE: &str = "alert";

/// Number of alert summaries one aggregation document holds before a new
/// document is started for the chain.
pub const DEFAULT_ALERTS_PER_DOCUMENT: u32 = 1000;

/// One entry of an aggregation document's `alerts` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub origin: String,
    pub alert_name: String,
    pub severity: String,
    pub message: String,
    pub metric: String,
    pub timestamp: String,
}

impl AlertSummary {
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            origin: alert.origin_id.clone(),
            alert_name: alert.alert_code.name.clone(),
            severity: alert.severity.as_str().to_owned(),
            message: alert.message.clone(),
            metric: alert.metric.clone(),
            timestamp: format_timestamp(alert.timestamp),
        }
    }
}

/// A capped per-chain history document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDocument {
    pub doc_type: String,
    pub n_alerts: u32,
    pub alerts: Vec<AlertSummary>,
    pub first: f64,
    pub last: f64,
}

impl AlertDocument {
    /// A fresh document seeded with a single alert.
    pub fn seeded(summary: AlertSummary, timestamp: f64) -> Self {
        Self {
            doc_type: ALERT_DOC_TYPE.to_owned(),
            n_alerts: 1,
            alerts: vec![summary],
            first: timestamp,
            last: timestamp,
        }
    }

    pub fn is_open(&self, capacity: u32) -> bool {
        self.doc_type == ALERT_DOC_TYPE && self.n_alerts < capacity
    }

    pub fn push(&mut self, summary: AlertSummary, timestamp: f64) {
        self.alerts.push(summary);
        self.first = self.first.min(timestamp);
        self.last = self.last.max(timestamp);
        self.n_alerts += 1;
    }
}

/// Renders a timestamp in decimal notation. Integral values keep a trailing
/// `.0`, so a float timestamp such as `1000.0` prints as producers print it.
/// Integer JSON timestamps decode to floats and print with `.0` as well, and
/// magnitudes of `1e16` and above print without an exponent.
pub fn format_timestamp(timestamp: f64) -> String {
    if timestamp.is_finite() && timestamp.fract() == 0.0 && timestamp.abs() < 1e16 {
        format!("{timestamp:.1}")
    } else {
        timestamp.to_string()
    }
}
