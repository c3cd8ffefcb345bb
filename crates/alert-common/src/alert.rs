use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
    Error,
    Info,
    Internal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
            Severity::Internal => "INTERNAL",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Severity::Internal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCode {
    pub code: i64,
    pub name: String,
}

/// An alert event as emitted by the monitors and alerters onto the store exchange.
///
/// For `INTERNAL` alerts `origin_id` names the manager that issued the control
/// event rather than a monitored entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub alert_code: AlertCode,
    pub origin_id: String,
    pub parent_id: String,
    pub message: String,
    pub metric: String,
    pub timestamp: f64,
}

impl Alert {
    /// Decodes a broker payload. Any missing or mistyped field is an error.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn is_internal(&self) -> bool {
        self.severity.is_internal()
    }
}
