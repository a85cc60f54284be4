//! Plans the declarations of a batch of function definitions.
//!
//! Planning is pure: it reads the stack but never writes to it. The caller
//! emits the finished [`Plan`] in one step.
use std::collections::{BTreeSet, HashMap};

use snafu::prelude::*;

use crate::{
    aws::{
        lambda::{Alias, DeadLetterConfig, Environment, Function, Permission, TracingConfig, Version},
        logs::{LogGroup, SubscriptionFilter},
        Construct,
    },
    stack::{Batch, Declaration, Export, Output, Parameter},
    tags::ResourceTags,
    utils, DigestSnafu, DuplicateResourceSnafu, Expr, MissingLogDestinationSnafu,
    MissingRoleNameSnafu, PolicyOnExternalRoleSnafu, Result, SerializeSnafu, Stack,
};

use super::{
    props::{FactoryProps, FunctionDefinition, LogDestination, RoleSource},
    roles::RoleCache,
    warmer::{self, WarmedFunction},
    GeneratedFunction, DEFAULT_LOG_RETENTION, DEFAULT_MEMORY_SIZE, DEFAULT_RUNTIME,
    DEFAULT_TIMEOUT, PUBLISH_ALIAS,
};

/// Everything a batch declares, plus the registry entries it produces.
#[derive(Debug, Default)]
pub struct Plan {
    pub batch: Batch,
    pub registry: HashMap<String, GeneratedFunction>,
}

/// Declarations of one function, in emission order.
struct FunctionPlan {
    declarations: Vec<Declaration>,
    output: Option<(String, Output)>,
    generated: GeneratedFunction,
}

/// Physical name of a function, qualified by the pipeline parameters.
pub fn function_name(name: &str) -> Expr {
    Expr::sub(format!(
        "${{Application}}-${{Country}}-${{Environment}}-${{Project}}-{name}-lambda"
    ))
}

/// Alias precedence: deployment channel, definition, factory, [`PUBLISH_ALIAS`].
pub fn alias_name(props: &FactoryProps, definition: &FunctionDefinition) -> String {
    if let Some(channel) = props.channel {
        return channel.alias().to_owned();
    }
    definition
        .alias
        .as_deref()
        .or(props.alias.as_deref())
        .unwrap_or(PUBLISH_ALIAS)
        .to_owned()
}

/// Factory variables overlaid by definition variables. Absent only when
/// neither side has a map.
fn environment(props: &FactoryProps, definition: &FunctionDefinition) -> Option<Environment> {
    if props.environment.is_none() && definition.environment.is_none() {
        return None;
    }
    let mut variables = props.environment.clone().unwrap_or_default();
    variables.extend(definition.environment.clone().unwrap_or_default());
    Some(Environment { variables })
}

fn layers(props: &FactoryProps, definition: &FunctionDefinition) -> Option<Vec<Expr>> {
    let layers: Vec<Expr> = props
        .layers
        .iter()
        .chain(definition.layers.iter())
        .cloned()
        .collect();
    if layers.is_empty() {
        None
    } else {
        Some(layers)
    }
}

/// Checks a batch before anything is planned.
fn check(props: &FactoryProps, queue: &[FunctionDefinition]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for definition in queue {
        let resource = definition.resource_name.as_str();
        ensure!(seen.insert(resource), DuplicateResourceSnafu { name: resource });
        let role = definition.role.as_ref().or(props.role.as_ref());
        ensure!(role.is_some(), MissingRoleNameSnafu { resource });
        ensure!(
            definition.policy_statements.is_empty() || !matches!(role, Some(RoleSource::Arn(_))),
            PolicyOnExternalRoleSnafu { resource }
        );
        ensure!(
            definition.with_log_forwarding != Some(true) || props.log_destination.is_some(),
            MissingLogDestinationSnafu { resource }
        );
    }
    Ok(())
}

fn plan_function(
    props: &FactoryProps,
    roles: &mut RoleCache,
    definition: &FunctionDefinition,
) -> Result<FunctionPlan> {
    let id = definition.resource_name.as_str();
    log::debug!("planning function {id}");

    let vpc = definition.vpc.clone().or_else(|| props.vpc.clone());
    let role = match definition.role.as_ref().or(props.role.as_ref()) {
        Some(RoleSource::Name(name)) => {
            let arn = roles.resolve(name, vpc.is_some());
            if !definition.policy_statements.is_empty() {
                roles.add_statements(name, definition.policy_statements.iter().cloned());
            }
            arn
        }
        Some(RoleSource::Arn(arn)) => arn.clone(),
        None => return MissingRoleNameSnafu { resource: id }.fail(),
    };

    let name = function_name(&definition.function_name);
    let function = Function {
        function_name: name.clone(),
        description: definition.description.clone(),
        handler: definition.handler.clone(),
        runtime: props
            .runtime
            .clone()
            .unwrap_or_else(|| DEFAULT_RUNTIME.to_owned()),
        code: definition.code.clone(),
        memory_size: definition.memory_size.unwrap_or(DEFAULT_MEMORY_SIZE),
        timeout: definition
            .timeout
            .or(props.timeout)
            .unwrap_or(DEFAULT_TIMEOUT),
        role,
        environment: environment(props, definition),
        layers: layers(props, definition),
        vpc_config: vpc,
        tracing_config: TracingConfig::default(),
        reserved_concurrent_executions: definition.reserved_concurrency,
        dead_letter_config: definition
            .dead_letter_target
            .clone()
            .map(|target_arn| DeadLetterConfig { target_arn }),
        tags: ResourceTags::new(
            Expr::literal(&definition.function_name),
            &definition.description,
            "lambda",
        )
        .to_tags(&props.tags),
    };
    log::trace!(
        "{id}: memory {} MB, timeout {} s, runtime {}",
        function.memory_size,
        function.timeout,
        function.runtime
    );

    // The version id changes whenever the function or its code does.
    let properties = serde_json::to_vec(&function).context(SerializeSnafu { name: id })?;
    let code = definition
        .code
        .digest()
        .context(DigestSnafu { resource: id })?;
    let digest = utils::sha256_bytes([properties, code.into_bytes()].concat());
    let version_id = format!("{id}Version{}", &digest[..8]);
    let version = Version {
        function_name: Expr::reference(id),
        description: Some(definition.description.clone()),
    };

    let alias = alias_name(props, definition);
    let alias_id = format!("{id}Alias{}", utils::logical_id_of(&alias));
    let alias = Alias {
        name: alias,
        function_name: Expr::reference(id),
        function_version: Expr::get_att(&version_id, "Version"),
        description: None,
    };

    let log_group_id = format!("{id}LogGroup");
    let log_group = LogGroup {
        log_group_name: Expr::join("", [Expr::literal("/aws/lambda/"), Expr::reference(id)]),
        retention_in_days: definition.log_retention.unwrap_or(DEFAULT_LOG_RETENTION),
    };

    let mut declarations = vec![
        Declaration::new(id, function.clone()),
        Declaration::new(version_id.clone(), version.clone()),
        Declaration::new(alias_id.clone(), alias.clone()),
        Declaration::new(log_group_id.clone(), log_group),
    ];

    if let Some(invoke) = &definition.invoke_permission {
        let mut permission = Permission::invoke(Expr::reference(&alias_id), invoke.principal.clone());
        permission.source_arn = invoke.source_arn.clone();
        declarations.push(Declaration::new(format!("{id}InvokePermission"), permission));
    }

    let output = definition.with_output.then(|| {
        let export = definition
            .output_name
            .clone()
            .unwrap_or_else(|| format!("{}-output", definition.function_name));
        (
            format!("{id}Output"),
            Output {
                description: Some(definition.description.clone()),
                value: Expr::reference(&alias_id),
                export: Some(Export {
                    name: Expr::literal(export),
                }),
            },
        )
    });

    let forward = definition
        .with_log_forwarding
        .unwrap_or(props.log_destination.is_some());
    if forward {
        let destination = props
            .log_destination
            .as_ref()
            .context(MissingLogDestinationSnafu { resource: id })?;
        let subscription = Declaration::new(
            format!("{id}LogGroupSubscription"),
            SubscriptionFilter {
                log_group_name: Expr::reference(&log_group_id),
                destination_arn: destination.arn().clone(),
                filter_pattern: destination.filter_pattern().to_owned(),
                role_arn: destination.role_arn().cloned(),
            },
        );
        match destination {
            LogDestination::Function { arn, .. } => {
                let permission_id = format!("{id}LogForwardingPermission");
                declarations.push(Declaration::new(
                    permission_id.clone(),
                    Permission::invoke(arn.clone(), "logs.amazonaws.com")
                        .with_source_arn(Expr::get_att(&log_group_id, "Arn")),
                ));
                declarations.push(subscription.with_depends_on(permission_id));
            }
            LogDestination::Stream { .. } => declarations.push(subscription),
        }
    }

    Ok(FunctionPlan {
        declarations,
        output,
        generated: GeneratedFunction {
            function: Construct::new(id, function),
            version: Construct::new(version_id, version),
            alias: Construct::new(alias_id, alias),
        },
    })
}

/// Plans every declaration of the queued definitions.
pub fn plan(props: &FactoryProps, queue: &[FunctionDefinition], stack: &Stack) -> Result<Plan> {
    check(props, queue)?;

    let mut roles = RoleCache::default();
    let mut functions = vec![];
    let mut warmed = vec![];
    for definition in queue {
        let function = plan_function(props, &mut roles, definition)?;
        if warmer::is_warmed(props.with_warmer, definition.with_warmer) {
            warmed.push(WarmedFunction {
                resource_name: definition.resource_name.clone(),
                function_name: definition.function_name.clone(),
                alias_id: function.generated.alias.logical_id().to_owned(),
            });
        }
        functions.push(function);
    }

    let mut plan = Plan::default();
    log::debug!("planned {} shared roles", roles.len());
    plan.batch.resources.extend(roles.into_declarations());
    for function in functions {
        plan.batch.resources.extend(function.declarations);
        plan.batch.outputs.extend(function.output);
        plan.registry.insert(
            function.generated.function.logical_id().to_owned(),
            function.generated,
        );
    }

    let rules = warmer::plan_rules(&warmed, &props.warmer_schedule_parameter);
    if !rules.is_empty() && stack.parameter(&props.warmer_schedule_parameter).is_none() {
        plan.batch.parameters.push((
            props.warmer_schedule_parameter.clone(),
            Parameter::string("Schedule expression of the lambda warmer rules")
                .with_default("rate(5 minutes)"),
        ));
    }
    plan.batch.resources.extend(rules);
    Ok(plan)
}
