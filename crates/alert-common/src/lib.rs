pub mod alert;
pub mod control;
pub mod document;
pub mod heartbeat;
pub mod keys;

pub use alert::{Alert, AlertCode, Severity};
pub use control::{ControlAlert, InternalAlertCode, ResetScope};
pub use document::{AlertDocument, AlertSummary};
pub use heartbeat::Heartbeat;
pub use keys::{KeySchemaError, Metric};
