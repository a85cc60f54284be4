//! The lambda factory.
//!
//! A [`LambdaFactory`] collects [`FunctionDefinition`]s and then, in one
//! pass, declares everything those functions need:
//!
//! * the function, an immutable version and an alias bound to that version
//! * a log group with a bounded retention
//! * shared execution roles, one per distinct role name
//! * optional invoke permissions, exports and log-forwarding subscriptions
//! * scheduled warmer rules, at most [`WARMER_GROUP_SIZE`] targets each
//!
//! Afterwards the generated constructs can be looked up by resource name.
//!
//! Materialization happens once. It is planned completely before anything is
//! written to the [`Stack`], so a batch that fails leaves the stack as it was
//! and the factory ready to be fixed and retried.
use std::collections::HashMap;

use snafu::prelude::*;

use crate::{
    aws::{
        lambda::{Alias, Function, Version},
        Construct,
    },
    AlreadyMaterializedSnafu, EmptyDefinitionSetSnafu, Result, Stack, UnknownResourceSnafu,
};

pub mod materialize;
mod props;
pub mod roles;
pub mod warmer;

pub use props::*;

/// Alias a function is published under when nothing else selects one.
pub const PUBLISH_ALIAS: &str = "vLatest";
/// Megabytes.
pub const DEFAULT_MEMORY_SIZE: u32 = 512;
/// Seconds.
pub const DEFAULT_TIMEOUT: u32 = 900;
pub const DEFAULT_RUNTIME: &str = "nodejs12.x";
/// Days.
pub const DEFAULT_LOG_RETENTION: u32 = 7;
/// Maximum number of targets of one warmer rule.
pub const WARMER_GROUP_SIZE: usize = 5;
pub const WARMER_SCHEDULE_PARAMETER: &str = "LambdaWarmerScheduleRate";
pub const DEFAULT_FILTER_PATTERN: &str = r#"[timestamp=*Z, request_id="*-*", event]"#;

/// The constructs declared for one function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedFunction {
    pub function: Construct<Function>,
    pub version: Construct<Version>,
    pub alias: Construct<Alias>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FactoryState {
    /// No definitions queued.
    Empty,
    /// Definitions queued, nothing declared yet.
    Populated,
    /// Declarations emitted. Terminal.
    Materialized,
}

impl core::fmt::Display for FactoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FactoryState::Empty => "empty",
            FactoryState::Populated => "populated",
            FactoryState::Materialized => "materialized",
        })
    }
}

#[derive(Debug)]
pub struct LambdaFactory {
    props: FactoryProps,
    queue: Vec<FunctionDefinition>,
    state: FactoryState,
    registry: HashMap<String, GeneratedFunction>,
}

impl LambdaFactory {
    pub fn new(props: FactoryProps) -> Self {
        LambdaFactory {
            props,
            queue: vec![],
            state: FactoryState::Empty,
            registry: HashMap::default(),
        }
    }

    pub fn props(&self) -> &FactoryProps {
        &self.props
    }

    pub fn state(&self) -> FactoryState {
        self.state
    }

    /// Queued definitions, in insertion order.
    pub fn definitions(&self) -> &[FunctionDefinition] {
        &self.queue
    }

    /// Queues a definition. Definitions are not checked until
    /// [`LambdaFactory::create_function_resources`].
    pub fn add_function_resource(&mut self, definition: FunctionDefinition) -> Result<()> {
        ensure!(
            self.state != FactoryState::Materialized,
            AlreadyMaterializedSnafu
        );
        log::trace!("queued function {}", definition.resource_name);
        self.queue.push(definition);
        self.state = FactoryState::Populated;
        Ok(())
    }

    /// Declares the resources of every queued definition in `stack`.
    ///
    /// This succeeds at most once per factory.
    pub fn create_function_resources(&mut self, stack: &mut Stack) -> Result<()> {
        ensure!(!self.queue.is_empty(), EmptyDefinitionSetSnafu);
        ensure!(
            self.state != FactoryState::Materialized,
            AlreadyMaterializedSnafu
        );
        let materialize::Plan { batch, registry } =
            materialize::plan(&self.props, &self.queue, stack)?;
        let resources = batch.resources.len();
        stack.emit(batch)?;
        log::info!(
            "declared {} functions as {resources} resources",
            registry.len()
        );
        self.registry = registry;
        self.state = FactoryState::Materialized;
        Ok(())
    }

    fn generated(&self, resource_name: &str) -> Result<&GeneratedFunction> {
        self.registry
            .get(resource_name)
            .context(UnknownResourceSnafu {
                name: resource_name,
            })
    }

    pub fn get_function_by_name(&self, resource_name: &str) -> Result<&Construct<Function>> {
        Ok(&self.generated(resource_name)?.function)
    }

    pub fn get_version_by_name(&self, resource_name: &str) -> Result<&Construct<Version>> {
        Ok(&self.generated(resource_name)?.version)
    }

    pub fn get_alias_by_name(&self, resource_name: &str) -> Result<&Construct<Alias>> {
        Ok(&self.generated(resource_name)?.alias)
    }

    /// Every generated function, keyed by resource name.
    pub fn generated_functions(&self) -> impl Iterator<Item = (&str, &GeneratedFunction)> {
        self.registry.iter().map(|(k, v)| (k.as_str(), v))
    }
}
