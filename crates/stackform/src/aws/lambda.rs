//! AWS Lambda resources.
use std::{collections::BTreeMap, path::PathBuf};

use serde::ser::SerializeMap;

use crate::{aws::Tag, utils, Expr, HasDependencies};

/// Deployment package of a function or layer.
///
/// An asset is a local path. It is written into the template as a bare path,
/// which is the form `aws cloudformation package` rewrites into an uploaded
/// S3 location.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, HasDependencies)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    Asset(PathBuf),
    S3 {
        bucket: Expr,
        key: Expr,
        #[serde(default)]
        object_version: Option<Expr>,
    },
}

impl Code {
    pub fn asset(path: impl Into<PathBuf>) -> Self {
        Code::Asset(path.into())
    }

    pub fn s3(bucket: impl Into<Expr>, key: impl Into<Expr>) -> Self {
        Code::S3 {
            bucket: bucket.into(),
            key: key.into(),
            object_version: None,
        }
    }

    /// A digest of the package contents.
    ///
    /// An asset that exists on disk is digested by its bytes, otherwise by
    /// its path. S3 code is digested by its location.
    pub fn digest(&self) -> anyhow::Result<String> {
        match self {
            Code::Asset(path) => Ok(match utils::sha256_digest(path)? {
                Some(digest) => digest,
                None => {
                    log::warn!(
                        "code asset {} does not exist, digesting its path",
                        path.display()
                    );
                    utils::sha256_bytes(path.to_string_lossy().as_bytes())
                }
            }),
            s3 => Ok(utils::sha256_bytes(serde_json::to_vec(s3)?)),
        }
    }
}

impl serde::Serialize for Code {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Code::Asset(path) => serializer.serialize_str(&path.to_string_lossy()),
            Code::S3 {
                bucket,
                key,
                object_version,
            } => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("S3Bucket", bucket)?;
                map.serialize_entry("S3Key", key)?;
                if let Some(version) = object_version {
                    map.serialize_entry("S3ObjectVersion", version)?;
                }
                map.end()
            }
        }
    }
}

/// Network placement of a function.
///
/// `Deferred` holds a value resolved at deploy time, typically an `Fn::If`
/// that picks a subnet configuration or `AWS::NoValue`.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, HasDependencies)]
#[serde(rename_all = "snake_case")]
pub enum VpcConfig {
    Concrete {
        subnet_ids: Vec<Expr>,
        security_group_ids: Vec<Expr>,
    },
    Deferred(Expr),
}

impl serde::Serialize for VpcConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            VpcConfig::Concrete {
                subnet_ids,
                security_group_ids,
            } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("SubnetIds", subnet_ids)?;
                map.serialize_entry("SecurityGroupIds", security_group_ids)?;
                map.end()
            }
            VpcConfig::Deferred(expr) => expr.serialize(serializer),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Environment {
    pub variables: BTreeMap<String, Expr>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct TracingConfig {
    pub mode: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig {
            mode: "Active".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct DeadLetterConfig {
    pub target_arn: Expr,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Function {
    pub function_name: Expr,
    pub description: String,
    pub handler: String,
    pub runtime: String,
    pub code: Code,
    pub memory_size: u32,
    pub timeout: u32,
    pub role: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Expr>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
    pub tracing_config: TracingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_concurrent_executions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_config: Option<DeadLetterConfig>,
    pub tags: Vec<Tag>,
}

/// An immutable snapshot of a function's code and configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Version {
    pub function_name: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named pointer to a version.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Alias {
    pub name: String,
    pub function_name: Expr,
    pub function_version: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A resource-based policy statement granting `principal` an action on a
/// function.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Permission {
    pub action: String,
    pub function_name: Expr,
    pub principal: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<Expr>,
}

impl Permission {
    pub const INVOKE: &'static str = "lambda:InvokeFunction";

    pub fn invoke(function_name: Expr, principal: impl Into<Expr>) -> Self {
        Permission {
            action: Self::INVOKE.to_owned(),
            function_name,
            principal: principal.into(),
            source_arn: None,
        }
    }

    pub fn with_source_arn(mut self, source_arn: Expr) -> Self {
        self.source_arn = Some(source_arn);
        self
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct LayerVersion {
    pub layer_name: Expr,
    pub description: String,
    pub content: Code,
    pub compatible_runtimes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_info: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct LayerVersionPermission {
    pub action: String,
    pub layer_version_arn: Expr,
    pub principal: Expr,
}
