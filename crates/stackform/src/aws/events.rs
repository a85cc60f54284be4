//! EventBridge resources.
use crate::{Expr, HasDependencies};

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Target {
    pub id: String,
    pub arn: Expr,
    /// A JSON document delivered to the target verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// A scheduled rule.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    pub name: Expr,
    pub description: String,
    pub schedule_expression: Expr,
    pub state: String,
    pub targets: Vec<Target>,
}

impl Rule {
    pub const ENABLED: &'static str = "ENABLED";
}
