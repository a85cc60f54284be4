//! The declaration sink.
//!
//! A [`Stack`] collects parameters, conditions, resources and outputs. It
//! knows nothing about how they are deployed, but because every value tracks
//! the logical ids it references, a stack can check that nothing dangles and
//! can order its resources into deploy batches.
use std::collections::BTreeMap;

use snafu::prelude::*;

use crate::{
    aws::{Construct, ResourceProperties, ResourceType},
    Dependencies, DuplicateLogicalIdSnafu, Error, Expr, HasDependencies, MissingReferenceSnafu,
    Result, SerializeSnafu,
};

/// A template parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type", default = "Parameter::default_type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

impl Parameter {
    fn default_type() -> String {
        "String".to_owned()
    }

    pub fn string(description: impl Into<String>) -> Self {
        Parameter {
            ty: Self::default_type(),
            description: Some(description.into()),
            default: None,
            allowed_values: vec![],
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: Expr,
}

/// A template output, optionally exported for other stacks to import.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

/// A resource declaration.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Declaration {
    #[serde(skip)]
    logical_id: String,
    #[serde(flatten)]
    properties: ResourceProperties,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    deletion_policy: Option<String>,
}

impl HasDependencies for Declaration {
    fn dependencies(&self) -> Dependencies {
        self.depends_on
            .iter()
            .fold(self.properties.dependencies(), |deps, id| {
                deps.merge(Dependencies::single(id.clone()))
            })
    }
}

impl Declaration {
    pub fn new(logical_id: impl Into<String>, properties: impl Into<ResourceProperties>) -> Self {
        Declaration {
            logical_id: logical_id.into(),
            properties: properties.into(),
            depends_on: vec![],
            deletion_policy: None,
        }
    }

    /// Keeps the physical resource when it is removed from the template.
    pub fn retained(mut self) -> Self {
        self.deletion_policy = Some("Retain".to_owned());
        self
    }

    /// Adds an explicit ordering dependency on another resource.
    pub fn with_depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn properties(&self) -> &ResourceProperties {
        &self.properties
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Returns a typed view of this declaration, if it is of type `T`.
    pub fn construct<T: ResourceType>(&self) -> Option<Construct<T>> {
        T::from_properties(&self.properties)
            .map(|props| Construct::new(self.logical_id.clone(), props.clone()))
    }
}

/// Declarations planned together and emitted with [`Stack::emit`].
#[derive(Clone, Debug, Default)]
pub struct Batch {
    pub parameters: Vec<(String, Parameter)>,
    pub resources: Vec<Declaration>,
    pub outputs: Vec<(String, Output)>,
}

impl Batch {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .map(|(id, _)| id.as_str())
            .chain(self.resources.iter().map(|d| d.logical_id()))
            .chain(self.outputs.iter().map(|(id, _)| id.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.resources.is_empty() && self.outputs.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Stack {
    pub description: Option<String>,
    parameters: BTreeMap<String, Parameter>,
    conditions: BTreeMap<String, Expr>,
    /// In declaration order.
    resources: Vec<Declaration>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    pub fn new(description: impl Into<String>) -> Self {
        Stack {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    /// Returns whether the id names a parameter, condition, resource or output.
    pub fn contains(&self, id: &str) -> bool {
        self.parameters.contains_key(id)
            || self.conditions.contains_key(id)
            || self.outputs.contains_key(id)
            || self.resource(id).is_some()
    }

    fn ensure_free(&self, id: &str) -> Result<()> {
        ensure!(!self.contains(id), DuplicateLogicalIdSnafu { id });
        Ok(())
    }

    pub fn add_parameter(&mut self, id: impl Into<String>, parameter: Parameter) -> Result<()> {
        let id = id.into();
        self.ensure_free(&id)?;
        log::trace!("declaring parameter {id}");
        self.parameters.insert(id, parameter);
        Ok(())
    }

    pub fn add_condition(&mut self, id: impl Into<String>, condition: Expr) -> Result<()> {
        let id = id.into();
        self.ensure_free(&id)?;
        log::trace!("declaring condition {id}");
        self.conditions.insert(id, condition);
        Ok(())
    }

    pub fn add_resource<T: ResourceType>(
        &mut self,
        id: impl Into<String>,
        properties: T,
    ) -> Result<Construct<T>> {
        let id = id.into();
        self.ensure_free(&id)?;
        log::trace!("declaring {} {id}", T::TYPE);
        self.resources
            .push(Declaration::new(id.clone(), properties.clone()));
        Ok(Construct::new(id, properties))
    }

    pub fn add_output(&mut self, id: impl Into<String>, output: Output) -> Result<()> {
        let id = id.into();
        self.ensure_free(&id)?;
        log::trace!("declaring output {id}");
        self.outputs.insert(id, output);
        Ok(())
    }

    /// Declares a batch of parameters, resources and outputs.
    ///
    /// Either every declaration is added or, if any id is already taken or
    /// repeated within the batch, none is.
    pub fn emit(&mut self, batch: Batch) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for id in batch.ids() {
            self.ensure_free(id)?;
            ensure!(seen.insert(id), DuplicateLogicalIdSnafu { id });
        }
        log::debug!(
            "emitting {} parameters, {} resources and {} outputs",
            batch.parameters.len(),
            batch.resources.len(),
            batch.outputs.len()
        );
        self.parameters.extend(batch.parameters);
        self.resources.extend(batch.resources);
        self.outputs.extend(batch.outputs);
        Ok(())
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.get(id)
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn condition(&self, id: &str) -> Option<&Expr> {
        self.conditions.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Declaration> {
        self.resources.iter().find(|d| d.logical_id == id)
    }

    /// All resource declarations, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Declaration> {
        self.resources.iter()
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Output)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the resource with the given id if it has type `T`.
    pub fn get<T: ResourceType>(&self, id: &str) -> Option<Construct<T>> {
        self.resource(id)?.construct()
    }

    /// All resources of type `T`, in declaration order.
    pub fn resources_of<T: ResourceType>(&self) -> Vec<Construct<T>> {
        self.resources.iter().filter_map(Declaration::construct::<T>).collect()
    }

    /// Checks that every reference names a declared resource or parameter.
    pub fn validate(&self) -> Result<()> {
        let resolves = |reference: &str| {
            self.parameters.contains_key(reference) || self.resource(reference).is_some()
        };
        let referrers = self
            .resources
            .iter()
            .map(|d| (d.logical_id.as_str(), d.dependencies()))
            .chain(
                self.outputs
                    .iter()
                    .map(|(id, output)| (id.as_str(), output.dependencies())),
            )
            .chain(
                self.conditions
                    .iter()
                    .map(|(id, condition)| (id.as_str(), condition.dependencies())),
            );
        for (id, deps) in referrers {
            for reference in deps {
                if !resolves(&reference) {
                    log::error!("{id} references undeclared {reference}");
                    return MissingReferenceSnafu { id, reference }.fail();
                }
            }
        }
        Ok(())
    }

    /// Orders the resources into batches. Each batch only references
    /// resources in earlier batches.
    pub fn schedule(&self) -> Result<Vec<Vec<String>>> {
        self.validate()?;
        let keys: BTreeMap<&str, usize> = self
            .resources
            .iter()
            .enumerate()
            .map(|(i, d)| (d.logical_id.as_str(), i))
            .collect();
        let mut dag: dagga::Dag<String, usize> = dagga::Dag::default();
        for (i, declaration) in self.resources.iter().enumerate() {
            let reads = declaration
                .dependencies()
                .iter()
                .filter_map(|dep| keys.get(dep).copied())
                .collect::<Vec<_>>();
            let node = dagga::Node::new(declaration.logical_id.clone())
                .with_name(declaration.logical_id.clone())
                .with_reads(reads)
                .with_results(vec![i]);
            dag.add_node(node);
        }
        let schedule = dag
            .build_schedule()
            .map_err(|e| Error::Schedule { msg: e.to_string() })?;
        Ok(schedule
            .batches
            .into_iter()
            .map(|batch| batch.into_iter().map(|node| node.into_inner()).collect())
            .collect())
    }

    pub fn get_schedule_string(&self) -> Result<String> {
        let batches = self.schedule()?;
        let mut out = String::new();
        if batches.is_empty() {
            out.push_str("--- No resources.\n");
        }
        for (i, batch) in batches.iter().enumerate() {
            out.push_str(&format!("--- step {i}\n"));
            for id in batch {
                let ty = self
                    .resource(id)
                    .map(|d| d.properties.type_name())
                    .unwrap_or_default();
                out.push_str(&format!("  {id} ({ty})\n"));
            }
            out.push_str("---\n");
        }
        Ok(out)
    }

    /// Renders the stack as a template document.
    pub fn template(&self) -> Result<serde_json::Value> {
        self.validate()?;
        let mut template = serde_json::Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_owned(),
            serde_json::Value::from("2010-09-09"),
        );
        if let Some(description) = &self.description {
            template.insert("Description".to_owned(), description.clone().into());
        }
        fn section<T: serde::Serialize>(
            name: &str,
            entries: impl Iterator<Item = (String, T)>,
        ) -> Result<serde_json::Value> {
            let mut map = serde_json::Map::new();
            for (id, value) in entries {
                let value = serde_json::to_value(value).context(SerializeSnafu { name: &id })?;
                map.insert(id, value);
            }
            log::trace!("rendered {} {name}", map.len());
            Ok(serde_json::Value::Object(map))
        }
        if !self.parameters.is_empty() {
            template.insert(
                "Parameters".to_owned(),
                section("parameters", self.parameters.iter().map(|(k, v)| (k.clone(), v)))?,
            );
        }
        if !self.conditions.is_empty() {
            template.insert(
                "Conditions".to_owned(),
                section("conditions", self.conditions.iter().map(|(k, v)| (k.clone(), v)))?,
            );
        }
        template.insert(
            "Resources".to_owned(),
            section(
                "resources",
                self.resources.iter().map(|d| (d.logical_id.clone(), d)),
            )?,
        );
        if !self.outputs.is_empty() {
            template.insert(
                "Outputs".to_owned(),
                section("outputs", self.outputs.iter().map(|(k, v)| (k.clone(), v)))?,
            );
        }
        Ok(serde_json::Value::Object(template))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::aws::logs::LogGroup;

    fn log_group(name: Expr) -> LogGroup {
        LogGroup {
            log_group_name: name,
            retention_in_days: 7,
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut stack = Stack::default();
        stack
            .add_parameter("Environment", Parameter::string("env"))
            .unwrap();
        let err = stack
            .add_resource("Environment", log_group("x".into()))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalId { .. }), "{err}");
    }

    #[test]
    fn emit_is_all_or_nothing() {
        let mut stack = Stack::default();
        stack.add_resource("Taken", log_group("a".into())).unwrap();
        let err = stack
            .emit(Batch {
                resources: vec![
                    Declaration::new("Fresh", log_group("b".into())),
                    Declaration::new("Taken", log_group("c".into())),
                ],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateLogicalId { .. }));
        assert!(stack.resource("Fresh").is_none());
        assert_eq!(1, stack.resources().count());
    }

    #[test]
    fn validate_finds_dangling_references() {
        let mut stack = Stack::default();
        stack
            .add_resource("Logs", log_group(Expr::sub("${Missing}-logs")))
            .unwrap();
        let err = stack.validate().unwrap_err();
        assert_eq!(
            "'Logs' references 'Missing', which is not declared in the stack",
            err.to_string()
        );
        stack
            .add_parameter("Missing", Parameter::string("now declared"))
            .unwrap();
        stack.validate().unwrap();
    }

    #[test]
    fn schedule_orders_by_reference() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut stack = Stack::default();
        let first = stack.add_resource("First", log_group("a".into())).unwrap();
        stack
            .add_resource("Second", log_group(first.reference()))
            .unwrap();
        stack.add_resource("Third", log_group("c".into())).unwrap();
        let batches = stack.schedule().unwrap();
        let position = |id: &str| batches.iter().position(|b| b.iter().any(|x| x == id));
        assert!(position("First") < position("Second"));
        log::info!("{}", stack.get_schedule_string().unwrap());
    }

    #[test]
    fn typed_lookup() {
        let mut stack = Stack::default();
        stack.add_resource("Logs", log_group("a".into())).unwrap();
        assert!(stack.get::<LogGroup>("Logs").is_some());
        assert!(stack.get::<crate::aws::events::Rule>("Logs").is_none());
        assert_eq!(1, stack.resources_of::<LogGroup>().len());
    }

    #[test]
    fn template_shape() {
        let mut stack = Stack::new("test stack");
        stack
            .emit(Batch {
                resources: vec![
                    Declaration::new("Logs", log_group("a".into())).with_depends_on("Other")
                ],
                ..Default::default()
            })
            .unwrap();
        stack.add_resource("Other", log_group("b".into())).unwrap();
        let template = stack.template().unwrap();
        assert_eq!(
            serde_json::json!({
                "Type": "AWS::Logs::LogGroup",
                "Properties": { "LogGroupName": "a", "RetentionInDays": 7 },
                "DependsOn": ["Other"]
            }),
            template["Resources"]["Logs"]
        );
        assert_eq!("2010-09-09", template["AWSTemplateFormatVersion"]);
    }
}
