//! Deterministic key names for the latest-state snapshot store.
//!
//! Every chain owns one hash named [`chain_hash_name`]. Inside it, each
//! `(metric, origin)` pair owns one field built by the metric's registered
//! builder: `<prefix>_<origin_id>`.

use std::{fmt, str::FromStr};
use thiserror::Error;

const CHAIN_HASH_PREFIX: &str = "hash_p1_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySchemaError {
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {metric} has an empty key prefix")]
    EmptyPrefix { metric: &'static str },
    #[error("metrics {first} and {second} share the key prefix {prefix}")]
    DuplicatePrefix {
        first: &'static str,
        second: &'static str,
        prefix: &'static str,
    },
    #[error("key prefix {shorter} of {shorter_metric} is a prefix of {longer} of {longer_metric}")]
    OverlappingPrefix {
        shorter_metric: &'static str,
        shorter: &'static str,
        longer_metric: &'static str,
        longer: &'static str,
    },
}

/// Prefix shared by every chain hash; used to discover chains by scanning.
pub fn chain_hash_prefix() -> &'static str {
    CHAIN_HASH_PREFIX
}

pub fn chain_hash_name(parent_id: &str) -> String {
    format!("{CHAIN_HASH_PREFIX}{parent_id}")
}

/// Metric identifiers the producers may emit, each with its field builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    OpenFileDescriptors,
    SystemCpuUsage,
    SystemStorageUsage,
    SystemRamUsage,
    SystemIsDown,
    MetricNotFound,
    InvalidUrl,
    GithubRelease,
    CannotAccessGithub,
    NodeIsDown,
    MissedBlocks,
    NoChangeInBlockHeight,
    BlockHeightDifference,
    Slashed,
}

impl Metric {
    pub const ALL: [Metric; 14] = [
        Metric::OpenFileDescriptors,
        Metric::SystemCpuUsage,
        Metric::SystemStorageUsage,
        Metric::SystemRamUsage,
        Metric::SystemIsDown,
        Metric::MetricNotFound,
        Metric::InvalidUrl,
        Metric::GithubRelease,
        Metric::CannotAccessGithub,
        Metric::NodeIsDown,
        Metric::MissedBlocks,
        Metric::NoChangeInBlockHeight,
        Metric::BlockHeightDifference,
        Metric::Slashed,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Metric::OpenFileDescriptors => "open_file_descriptors",
            Metric::SystemCpuUsage => "system_cpu_usage",
            Metric::SystemStorageUsage => "system_storage_usage",
            Metric::SystemRamUsage => "system_ram_usage",
            Metric::SystemIsDown => "system_is_down",
            Metric::MetricNotFound => "metric_not_found",
            Metric::InvalidUrl => "invalid_url",
            Metric::GithubRelease => "github_release",
            Metric::CannotAccessGithub => "cannot_access_github",
            Metric::NodeIsDown => "node_is_down",
            Metric::MissedBlocks => "missed_blocks",
            Metric::NoChangeInBlockHeight => "no_change_in_block_height",
            Metric::BlockHeightDifference => "block_height_difference",
            Metric::Slashed => "slashed",
        }
    }

    pub fn key_prefix(&self) -> &'static str {
        match self {
            Metric::OpenFileDescriptors => "alert_system1",
            Metric::SystemCpuUsage => "alert_system2",
            Metric::SystemStorageUsage => "alert_system3",
            Metric::SystemRamUsage => "alert_system4",
            Metric::SystemIsDown => "alert_system5",
            Metric::MetricNotFound => "alert_system6",
            Metric::InvalidUrl => "alert_system7",
            Metric::GithubRelease => "alert_github1",
            Metric::CannotAccessGithub => "alert_github2",
            Metric::NodeIsDown => "alert_node1",
            Metric::MissedBlocks => "alert_node2",
            Metric::NoChangeInBlockHeight => "alert_node3",
            Metric::BlockHeightDifference => "alert_node4",
            Metric::Slashed => "alert_node5",
        }
    }

    /// Snapshot field holding the latest alert of this metric for `origin_id`.
    pub fn field_key(&self, origin_id: &str) -> String {
        format!("{}_{}", self.key_prefix(), origin_id)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for Metric {
    type Err = KeySchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|metric| metric.identifier() == s)
            .ok_or_else(|| KeySchemaError::UnknownMetric(s.to_owned()))
    }
}

/// Builds the snapshot field for an alert's `(metric, origin_id)`.
pub fn metric_field_key(metric: &str, origin_id: &str) -> Result<String, KeySchemaError> {
    Ok(metric.parse::<Metric>()?.field_key(origin_id))
}

/// Checks the registered table for collisions: prefixes must be non-empty,
/// unique, and never a leading substring of one another.
pub fn validate_key_schema() -> Result<(), KeySchemaError> {
    for metric in Metric::ALL {
        if metric.key_prefix().is_empty() {
            return Err(KeySchemaError::EmptyPrefix {
                metric: metric.identifier(),
            });
        }
    }

    for (index, first) in Metric::ALL.iter().enumerate() {
        for second in Metric::ALL.iter().skip(index + 1) {
            let (a, b) = (first.key_prefix(), second.key_prefix());
            if a == b {
                return Err(KeySchemaError::DuplicatePrefix {
                    first: first.identifier(),
                    second: second.identifier(),
                    prefix: a,
                });
            }
            let overlap = if b.starts_with(a) {
                Some((first, second))
            } else if a.starts_with(b) {
                Some((second, first))
            } else {
                None
            };
            if let Some((shorter, longer)) = overlap {
                return Err(KeySchemaError::OverlappingPrefix {
                    shorter_metric: shorter.identifier(),
                    shorter: shorter.key_prefix(),
                    longer_metric: longer.identifier(),
                    longer: longer.key_prefix(),
                });
            }
        }
    }

    Ok(())
}

/// Validates the schema and ensures every permitted identifier has a builder.
pub fn validate_permitted_metrics<S: AsRef<str>>(permitted: &[S]) -> Result<(), KeySchemaError> {
    validate_key_schema()?;

    for identifier in permitted {
        identifier.as_ref().parse::<Metric>()?;
    }

    Ok(())
}
