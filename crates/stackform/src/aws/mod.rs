//! CloudFormation resource types for AWS.
//!
//! Each resource is a property struct that serializes to the `Properties`
//! block of its declaration. [`ResourceProperties`] ties a property struct to
//! its `Type` string.
use std::ops::Deref;

use crate::{Expr, HasDependencies};

pub mod events;
pub mod iam;
pub mod lambda;
pub mod logs;

/// A resource tag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: Expr,
}

/// Properties of any resource this crate declares, tagged with its type.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(tag = "Type", content = "Properties")]
pub enum ResourceProperties {
    #[serde(rename = "AWS::Lambda::Function")]
    Function(lambda::Function),
    #[serde(rename = "AWS::Lambda::Version")]
    Version(lambda::Version),
    #[serde(rename = "AWS::Lambda::Alias")]
    Alias(lambda::Alias),
    #[serde(rename = "AWS::Lambda::Permission")]
    Permission(lambda::Permission),
    #[serde(rename = "AWS::Lambda::LayerVersion")]
    LayerVersion(lambda::LayerVersion),
    #[serde(rename = "AWS::Lambda::LayerVersionPermission")]
    LayerVersionPermission(lambda::LayerVersionPermission),
    #[serde(rename = "AWS::Logs::LogGroup")]
    LogGroup(logs::LogGroup),
    #[serde(rename = "AWS::Logs::SubscriptionFilter")]
    SubscriptionFilter(logs::SubscriptionFilter),
    #[serde(rename = "AWS::Events::Rule")]
    Rule(events::Rule),
    #[serde(rename = "AWS::IAM::Role")]
    Role(iam::Role),
}

impl ResourceProperties {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Function(_) => lambda::Function::TYPE,
            Self::Version(_) => lambda::Version::TYPE,
            Self::Alias(_) => lambda::Alias::TYPE,
            Self::Permission(_) => lambda::Permission::TYPE,
            Self::LayerVersion(_) => lambda::LayerVersion::TYPE,
            Self::LayerVersionPermission(_) => lambda::LayerVersionPermission::TYPE,
            Self::LogGroup(_) => logs::LogGroup::TYPE,
            Self::SubscriptionFilter(_) => logs::SubscriptionFilter::TYPE,
            Self::Rule(_) => events::Rule::TYPE,
            Self::Role(_) => iam::Role::TYPE,
        }
    }
}

/// A concrete resource property type.
pub trait ResourceType: Clone + HasDependencies + Into<ResourceProperties> + 'static {
    /// The CloudFormation type, eg `AWS::Lambda::Function`.
    const TYPE: &'static str;

    /// Returns the properties if they are of this type.
    fn from_properties(properties: &ResourceProperties) -> Option<&Self>;
}

macro_rules! resource_type {
    ($variant: ident, $ty: ty, $name: literal) => {
        impl ResourceType for $ty {
            const TYPE: &'static str = $name;

            fn from_properties(properties: &ResourceProperties) -> Option<&Self> {
                match properties {
                    ResourceProperties::$variant(p) => Some(p),
                    _ => None,
                }
            }
        }

        impl From<$ty> for ResourceProperties {
            fn from(value: $ty) -> Self {
                ResourceProperties::$variant(value)
            }
        }
    };
}

resource_type!(Function, lambda::Function, "AWS::Lambda::Function");
resource_type!(Version, lambda::Version, "AWS::Lambda::Version");
resource_type!(Alias, lambda::Alias, "AWS::Lambda::Alias");
resource_type!(Permission, lambda::Permission, "AWS::Lambda::Permission");
resource_type!(LayerVersion, lambda::LayerVersion, "AWS::Lambda::LayerVersion");
resource_type!(
    LayerVersionPermission,
    lambda::LayerVersionPermission,
    "AWS::Lambda::LayerVersionPermission"
);
resource_type!(LogGroup, logs::LogGroup, "AWS::Logs::LogGroup");
resource_type!(
    SubscriptionFilter,
    logs::SubscriptionFilter,
    "AWS::Logs::SubscriptionFilter"
);
resource_type!(Rule, events::Rule, "AWS::Events::Rule");
resource_type!(Role, iam::Role, "AWS::IAM::Role");

/// A declared resource: its logical id and its properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Construct<T> {
    logical_id: String,
    properties: T,
}

impl<T> Deref for Construct<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.properties
    }
}

impl<T> AsRef<T> for Construct<T> {
    fn as_ref(&self) -> &T {
        &self.properties
    }
}

impl<T> Construct<T> {
    pub fn new(logical_id: impl Into<String>, properties: T) -> Self {
        Self {
            logical_id: logical_id.into(),
            properties,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn properties(&self) -> &T {
        &self.properties
    }

    /// `{"Ref": "<logical id>"}`.
    pub fn reference(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// `{"Fn::GetAtt": ["<logical id>", "<attribute>"]}`.
    pub fn get_att(&self, attribute: impl Into<String>) -> Expr {
        Expr::get_att(&self.logical_id, attribute)
    }
}
