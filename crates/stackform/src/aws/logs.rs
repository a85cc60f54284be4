//! CloudWatch Logs resources.
use crate::{Expr, HasDependencies};

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct LogGroup {
    pub log_group_name: Expr,
    pub retention_in_days: u32,
}

/// Streams matching log events of a group to a destination.
///
/// A Lambda destination needs no role. Kinesis and Firehose destinations
/// need a role that CloudWatch Logs can assume to put records.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct SubscriptionFilter {
    pub log_group_name: Expr,
    pub destination_arn: Expr,
    pub filter_pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<Expr>,
}
