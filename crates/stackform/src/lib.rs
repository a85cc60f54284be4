//! # Stackform
//!
//! Stackform is a library of infrastructure-as-code construct wrappers. Each
//! wrapper accepts a declarative property object and emits one or more
//! CloudFormation resource declarations into a [`Stack`], following an
//! organization's naming, tagging and configuration conventions.
//!
//! ## Key Features
//!
//! - **Lambda factory**: queue any number of function definitions, then
//!   materialize them in one pass into functions, versions, aliases, log
//!   groups, permissions, shared IAM roles, batched warmer rules, exports and
//!   log-forwarding subscriptions. See [`LambdaFactory`].
//! - **Dependency tracking**: every declaration knows which logical ids it
//!   references, so a [`Stack`] can validate references and compute a deploy
//!   schedule.
//! - **Conventions as code**: tags ([`ResourceTags`]), mandatory template
//!   parameters ([`StackParameters`]) and shared layers ([`LayerFactory`]).
//!
//! ## Usage
//!
//! Stackform is a build-time library. Nothing here talks to a cloud API; a
//! program declares its infrastructure against a [`Stack`] and renders it
//! with [`Stack::template`].
//!
//! ```no_run
//! use form::{factory::*, Code, LambdaFactory, RoleSource, Stack, StackParameters};
//!
//! let mut stack = Stack::default();
//! StackParameters::default().declare(&mut stack)?;
//!
//! let mut factory = LambdaFactory::new(FactoryProps {
//!     role: Some(RoleSource::Name("SharedRole".into())),
//!     ..Default::default()
//! });
//! factory.add_function_resource(FunctionDefinition::new(
//!     "Orders",
//!     "orders",
//!     "Order API",
//!     "index.handler",
//!     Code::asset("dist/orders.zip"),
//! ))?;
//! factory.create_function_resources(&mut stack)?;
//! let alias = factory.get_alias_by_name("Orders")?;
//! println!("{}", serde_json::to_string_pretty(&stack.template()?).unwrap());
//! # let _ = alias;
//! # Ok::<(), form::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Stackform exposes one error enum, [`Error`]. Every fallible operation
//! returns it, and no error is ever logged and then ignored: the caller is
//! expected to abort the build pass on the first failure.

pub use stackform_derive::HasDependencies;

extern crate self as form;

pub mod aws;
pub mod expr;
pub mod factory;
mod has_dependencies_impl;
pub mod layer;
pub mod manifest;
pub mod parameters;
pub mod stack;
pub mod tags;
pub mod utils;

pub use aws::{lambda::Code, Construct, ResourceProperties, ResourceType};
pub use expr::Expr;
pub use factory::{FactoryProps, FunctionDefinition, LambdaFactory, RoleSource, VpcConfig};
pub use layer::LayerFactory;
pub use parameters::StackParameters;
pub use stack::Stack;
pub use tags::ResourceTags;

/// Top-level error enum that encompasses all errors.
#[derive(snafu::Snafu, Debug)]
pub enum Error {
    #[snafu(display("No function definitions found for creation"))]
    EmptyDefinitionSet,

    #[snafu(display("The resources were already created for this factory"))]
    AlreadyMaterialized,

    #[snafu(display("No function was created with the resource name '{name}'"))]
    UnknownResource { name: String },

    #[snafu(display("Function '{resource}' has no role and the factory has no default role"))]
    MissingRoleName { resource: String },

    #[snafu(display("Function resource name '{name}' is defined more than once in the batch"))]
    DuplicateResource { name: String },

    #[snafu(display("Logical id '{id}' is already declared in the stack"))]
    DuplicateLogicalId { id: String },

    #[snafu(display(
        "Function '{resource}' requests log forwarding but the factory has no log destination"
    ))]
    MissingLogDestination { resource: String },

    #[snafu(display(
        "Function '{resource}' adds policy statements to an existing role that is not declared in this stack"
    ))]
    PolicyOnExternalRole { resource: String },

    #[snafu(display("'{id}' references '{reference}', which is not declared in the stack"))]
    MissingReference { id: String, reference: String },

    #[snafu(display("Could not build deploy schedule: {msg}"))]
    Schedule { msg: String },

    #[snafu(display("Could not digest code for '{resource}': {source}"))]
    Digest {
        resource: String,
        source: anyhow::Error,
    },

    #[snafu(display("Could not serialize '{name}': {source}"))]
    Serialize {
        name: String,
        source: serde_json::Error,
    },

    #[snafu(display("Could not parse manifest: {source}"))]
    Manifest { source: toml::de::Error },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Clone, Default, Debug, PartialEq)]
pub struct Dependencies {
    /// Logical ids of the declarations this value references.
    inner: Vec<String>,
}

impl IntoIterator for Dependencies {
    type Item = String;

    type IntoIter = <Vec<String> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl core::fmt::Display for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner.join(", "))
    }
}

impl Dependencies {
    pub fn single(id: impl Into<String>) -> Self {
        Dependencies {
            inner: vec![id.into()],
        }
    }

    /// Concatenates, dropping ids already present.
    pub fn merge(mut self, other: Self) -> Self {
        for id in other.inner {
            if !self.inner.contains(&id) {
                self.inner.push(id);
            }
        }
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.iter().any(|dep| dep == id)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(String::as_str)
    }
}

/// Tracks references between declarations.
///
/// This trait can be derived, and has a default implementation that
/// reports zero dependencies.
pub trait HasDependencies {
    fn dependencies(&self) -> Dependencies {
        Dependencies::default()
    }
}
