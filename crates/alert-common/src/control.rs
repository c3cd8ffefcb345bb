use crate::alert::{Alert, Severity};

/// Manager names carried in `origin_id` by internal control alerts.
pub const SYSTEM_ALERTERS_MANAGER: &str = "SystemAlertersManager";
pub const GITHUB_ALERTER_MANAGER: &str = "GithubAlerterManager";

/// Field-name marker of the system alerters' snapshot fields.
pub const SYSTEM_ALERT_MARKER: &str = "alert_system";
/// Field-name marker of the `cannot_access_github` snapshot fields.
pub const GITHUB_ACCESS_ALERT_MARKER: &str = "alert_github2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum InternalAlertCode {
    ComponentResetAllChains = 5000,
    ComponentResetChain = 5001,
}

impl InternalAlertCode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            5000 => Some(Self::ComponentResetAllChains),
            5001 => Some(Self::ComponentResetChain),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Chains affected by an invalidation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetScope {
    AllChains,
    Chain(String),
}

/// The recognised internal control events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAlert {
    ResetAllChainsSystem,
    ResetChainSystem { parent_id: String },
    ResetAllChainsGithub,
}

impl ControlAlert {
    /// Resolves an alert to a control event. Non-internal alerts and unknown
    /// `(code, origin)` pairs resolve to `None`.
    pub fn classify(alert: &Alert) -> Option<Self> {
        if alert.severity != Severity::Internal {
            return None;
        }

        let code = InternalAlertCode::from_code(alert.alert_code.code)?;
        match (code, alert.origin_id.as_str()) {
            (InternalAlertCode::ComponentResetAllChains, SYSTEM_ALERTERS_MANAGER) => {
                Some(Self::ResetAllChainsSystem)
            }
            (InternalAlertCode::ComponentResetChain, SYSTEM_ALERTERS_MANAGER) => {
                Some(Self::ResetChainSystem {
                    parent_id: alert.parent_id.clone(),
                })
            }
            (InternalAlertCode::ComponentResetAllChains, GITHUB_ALERTER_MANAGER) => {
                Some(Self::ResetAllChainsGithub)
            }
            _ => None,
        }
    }

    pub fn scope(&self) -> ResetScope {
        match self {
            Self::ResetAllChainsSystem | Self::ResetAllChainsGithub => ResetScope::AllChains,
            Self::ResetChainSystem { parent_id } => ResetScope::Chain(parent_id.clone()),
        }
    }

    /// Substring a snapshot field name must contain to be removed.
    pub fn field_filter(&self) -> &'static str {
        match self {
            Self::ResetAllChainsSystem | Self::ResetChainSystem { .. } => SYSTEM_ALERT_MARKER,
            Self::ResetAllChainsGithub => GITHUB_ACCESS_ALERT_MARKER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertCode;

    fn internal(code: i64, origin: &str, parent: &str) -> Alert {
        Alert {
            severity: Severity::Internal,
            alert_code: AlertCode {
                code,
                name: "internal".to_owned(),
            },
            origin_id: origin.to_owned(),
            parent_id: parent.to_owned(),
            message: String::new(),
            metric: String::new(),
            timestamp: 0.0,
        }
    }

    #[test]
    fn classifies_the_three_control_combinations() {
        let all_system = internal(5000, SYSTEM_ALERTERS_MANAGER, "*");
        let chain_system = internal(5001, SYSTEM_ALERTERS_MANAGER, "chainX");
        let all_github = internal(5000, GITHUB_ALERTER_MANAGER, "*");

        assert_eq!(
            ControlAlert::classify(&all_system),
            Some(ControlAlert::ResetAllChainsSystem)
        );
        assert_eq!(
            ControlAlert::classify(&chain_system),
            Some(ControlAlert::ResetChainSystem {
                parent_id: "chainX".to_owned()
            })
        );
        assert_eq!(
            ControlAlert::classify(&all_github),
            Some(ControlAlert::ResetAllChainsGithub)
        );
    }

    #[test]
    fn unknown_pairs_are_not_control_alerts() {
        assert_eq!(
            ControlAlert::classify(&internal(5001, GITHUB_ALERTER_MANAGER, "chainX")),
            None
        );
        assert_eq!(
            ControlAlert::classify(&internal(5000, "SomeOtherManager", "*")),
            None
        );
        assert_eq!(
            ControlAlert::classify(&internal(42, SYSTEM_ALERTERS_MANAGER, "*")),
            None
        );
    }

    #[test]
    fn non_internal_alert_with_reset_code_is_not_control() {
        let mut alert = internal(5000, SYSTEM_ALERTERS_MANAGER, "*");
        alert.severity = Severity::Critical;

        assert_eq!(ControlAlert::classify(&alert), None);
    }

    #[test]
    fn scope_and_filter_follow_variant() {
        let chain = ControlAlert::ResetChainSystem {
            parent_id: "chainX".to_owned(),
        };
        assert_eq!(chain.scope(), ResetScope::Chain("chainX".to_owned()));
        assert_eq!(chain.field_filter(), "alert_system");

        assert_eq!(ControlAlert::ResetAllChainsGithub.scope(), ResetScope::AllChains);
        assert_eq!(ControlAlert::ResetAllChainsGithub.field_filter(), "alert_github2");
    }
}
