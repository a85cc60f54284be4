//! Inputs to the lambda factory.
use std::collections::BTreeMap;

use crate::{aws::lambda::Code, tags::TagConstants, Expr};

pub use crate::aws::lambda::VpcConfig;

use super::{DEFAULT_FILTER_PATTERN, WARMER_SCHEDULE_PARAMETER};

/// The execution role of a function.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    /// A role the factory declares once per name and shares.
    Name(String),
    /// An existing role, referenced as-is.
    Arn(Expr),
}

/// Selects the alias every function is published under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentChannel {
    Production,
    Acceptance,
}

impl DeploymentChannel {
    /// `master` deploys to production, every other branch to acceptance.
    pub fn from_branch(branch: &str) -> Self {
        if branch == "master" {
            DeploymentChannel::Production
        } else {
            DeploymentChannel::Acceptance
        }
    }

    pub fn alias(&self) -> &'static str {
        match self {
            DeploymentChannel::Production => "prd",
            DeploymentChannel::Acceptance => "dta",
        }
    }
}

/// Where function logs are forwarded to.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogDestination {
    /// A log shipping function. It is granted permission to be invoked by
    /// CloudWatch Logs.
    Function {
        arn: Expr,
        #[serde(default)]
        filter_pattern: Option<String>,
    },
    /// A stream written to through a delivery role.
    Stream {
        arn: Expr,
        role_arn: Expr,
        #[serde(default)]
        filter_pattern: Option<String>,
    },
}

impl LogDestination {
    pub fn arn(&self) -> &Expr {
        match self {
            LogDestination::Function { arn, .. } | LogDestination::Stream { arn, .. } => arn,
        }
    }

    pub fn filter_pattern(&self) -> &str {
        match self {
            LogDestination::Function { filter_pattern, .. }
            | LogDestination::Stream { filter_pattern, .. } => filter_pattern
                .as_deref()
                .unwrap_or(DEFAULT_FILTER_PATTERN),
        }
    }

    pub fn role_arn(&self) -> Option<&Expr> {
        match self {
            LogDestination::Function { .. } => None,
            LogDestination::Stream { role_arn, .. } => Some(role_arn),
        }
    }
}

/// Grants a principal permission to invoke a function's alias.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct InvokePermission {
    pub principal: Expr,
    #[serde(default)]
    pub source_arn: Option<Expr>,
}

/// One function to create.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct FunctionDefinition {
    /// Logical id of the function, unique within a batch.
    pub resource_name: String,
    pub function_name: String,
    pub description: String,
    pub handler: String,
    pub code: Code,
    #[serde(default)]
    pub role: Option<RoleSource>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub memory_size: Option<u32>,
    /// Seconds.
    #[serde(default)]
    pub timeout: Option<u32>,
    #[serde(default)]
    pub reserved_concurrency: Option<u32>,
    #[serde(default)]
    pub environment: Option<BTreeMap<String, Expr>>,
    #[serde(default)]
    pub layers: Vec<Expr>,
    #[serde(default)]
    pub vpc: Option<VpcConfig>,
    #[serde(default)]
    pub dead_letter_target: Option<Expr>,
    #[serde(default)]
    pub with_warmer: Option<bool>,
    #[serde(default)]
    pub with_output: bool,
    #[serde(default)]
    pub with_log_forwarding: Option<bool>,
    #[serde(default)]
    pub output_name: Option<String>,
    /// Days.
    #[serde(default)]
    pub log_retention: Option<u32>,
    #[serde(default)]
    pub policy_statements: Vec<Expr>,
    #[serde(default)]
    pub invoke_permission: Option<InvokePermission>,
}

impl FunctionDefinition {
    pub fn new(
        resource_name: impl Into<String>,
        function_name: impl Into<String>,
        description: impl Into<String>,
        handler: impl Into<String>,
        code: Code,
    ) -> Self {
        FunctionDefinition {
            resource_name: resource_name.into(),
            function_name: function_name.into(),
            description: description.into(),
            handler: handler.into(),
            code,
            role: None,
            alias: None,
            memory_size: None,
            timeout: None,
            reserved_concurrency: None,
            environment: None,
            layers: vec![],
            vpc: None,
            dead_letter_target: None,
            with_warmer: None,
            with_output: false,
            with_log_forwarding: None,
            output_name: None,
            log_retention: None,
            policy_statements: vec![],
            invoke_permission: None,
        }
    }

    pub fn with_role(mut self, role: RoleSource) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_memory_size(mut self, megabytes: u32) -> Self {
        self.memory_size = Some(megabytes);
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_environment_variable(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.environment
            .get_or_insert_with(Default::default)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_layer(mut self, layer: Expr) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_vpc(mut self, vpc: VpcConfig) -> Self {
        self.vpc = Some(vpc);
        self
    }

    pub fn warmed(mut self, warmed: bool) -> Self {
        self.with_warmer = Some(warmed);
        self
    }

    pub fn exported(mut self, output_name: Option<String>) -> Self {
        self.with_output = true;
        self.output_name = output_name;
        self
    }

    pub fn forward_logs(mut self, forward: bool) -> Self {
        self.with_log_forwarding = Some(forward);
        self
    }

    pub fn with_policy_statement(mut self, statement: Expr) -> Self {
        self.policy_statements.push(statement);
        self
    }

    pub fn with_invoke_permission(mut self, principal: impl Into<Expr>, source_arn: Option<Expr>) -> Self {
        self.invoke_permission = Some(InvokePermission {
            principal: principal.into(),
            source_arn,
        });
        self
    }
}

/// Defaults shared by every function of a factory.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FactoryProps {
    pub role: Option<RoleSource>,
    pub alias: Option<String>,
    /// Seconds.
    pub timeout: Option<u32>,
    pub environment: Option<BTreeMap<String, Expr>>,
    pub layers: Vec<Expr>,
    pub vpc: Option<VpcConfig>,
    pub with_warmer: bool,
    pub channel: Option<DeploymentChannel>,
    pub runtime: Option<String>,
    pub log_destination: Option<LogDestination>,
    /// Name of the template parameter holding the warmer schedule expression.
    pub warmer_schedule_parameter: String,
    pub tags: TagConstants,
}

impl Default for FactoryProps {
    fn default() -> Self {
        FactoryProps {
            role: None,
            alias: None,
            timeout: None,
            environment: None,
            layers: vec![],
            vpc: None,
            with_warmer: false,
            channel: None,
            runtime: None,
            log_destination: None,
            warmer_schedule_parameter: WARMER_SCHEDULE_PARAMETER.to_owned(),
            tags: TagConstants::default(),
        }
    }
}
