//! TOML manifests.
//!
//! A manifest describes one stack: factory defaults, extra parameters,
//! layers and function definitions.
//!
//! ```toml
//! description = "Orders service"
//!
//! [defaults]
//! role = { name = "SharedRole" }
//! with_warmer = true
//!
//! [[parameters]]
//! name = "Stage"
//!
//! [[layers]]
//! resource_name = "Commons"
//! description = "Shared code"
//! code = { asset = "dist/commons.zip" }
//!
//! [[functions]]
//! resource_name = "Orders"
//! function_name = "orders"
//! description = "Order API"
//! handler = "index.handler"
//! code = { asset = "dist/orders.zip" }
//! layers = [{ Ref = "Commons" }]
//! ```
use snafu::prelude::*;

use crate::{
    factory::DeploymentChannel, layer::LayerProps, parameters::ParameterProps, FactoryProps,
    FunctionDefinition, LambdaFactory, LayerFactory, ManifestSnafu, Result, Stack,
    StackParameters,
};

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub description: Option<String>,
    pub defaults: FactoryProps,
    pub parameters: Vec<ParameterProps>,
    pub layers: Vec<LayerProps>,
    pub functions: Vec<FunctionDefinition>,
}

impl std::str::FromStr for Manifest {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context(ManifestSnafu)
    }
}

impl Manifest {
    /// Declares everything in the manifest into a new stack.
    ///
    /// A `branch` selects the deployment channel, overriding any channel
    /// in the defaults.
    pub fn synthesize(&self, branch: Option<&str>) -> Result<(Stack, LambdaFactory)> {
        let mut stack = match &self.description {
            Some(description) => Stack::new(description),
            None => Stack::default(),
        };
        StackParameters::new(self.parameters.iter().cloned()).declare(&mut stack)?;
        for layer in self.layers.iter().cloned() {
            LayerFactory::new(&mut stack, layer)?;
        }

        let mut props = self.defaults.clone();
        if let Some(branch) = branch {
            let channel = DeploymentChannel::from_branch(branch);
            log::debug!("branch '{branch}' deploys to channel '{}'", channel.alias());
            props.channel = Some(channel);
        }
        let mut factory = LambdaFactory::new(props);
        for definition in self.functions.iter().cloned() {
            factory.add_function_resource(definition)?;
        }
        factory.create_function_resources(&mut stack)?;
        Ok((stack, factory))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{factory::RoleSource, Code, Expr};

    const MANIFEST: &str = r#"
        description = "Orders service"

        [defaults]
        role = { name = "SharedRole" }
        with_warmer = true
        timeout = 30

        [defaults.environment]
        TABLE = { Ref = "OrdersTable" }

        [[parameters]]
        name = "OrdersTable"

        [[layers]]
        resource_name = "Commons"
        description = "Shared code"
        code = { asset = "dist/commons.zip" }

        [[functions]]
        resource_name = "Orders"
        function_name = "orders"
        description = "Order API"
        handler = "index.handler"
        code = { asset = "dist/orders.zip" }
        layers = [{ Ref = "Commons" }]
        with_output = true

        [[functions]]
        resource_name = "Reports"
        function_name = "reports"
        description = "Nightly reports"
        handler = "reports.handler"
        code = { s3 = { bucket = "artifacts", key = "reports.zip" } }
        with_warmer = false
        timeout = 600
    "#;

    #[test]
    fn parses_manifest() {
        let manifest: Manifest = MANIFEST.parse().unwrap();
        assert_eq!(
            Some(RoleSource::Name("SharedRole".into())),
            manifest.defaults.role
        );
        assert_eq!(2, manifest.functions.len());
        assert_eq!(vec![Expr::reference("Commons")], manifest.functions[0].layers);
        assert_eq!(Code::s3("artifacts", "reports.zip"), manifest.functions[1].code);
        assert_eq!(Some(false), manifest.functions[1].with_warmer);
        assert_eq!("LambdaWarmerScheduleRate", manifest.defaults.warmer_schedule_parameter);
    }

    #[test]
    fn synthesizes_a_valid_stack() {
        let _ = env_logger::builder().is_test(true).try_init();
        let manifest: Manifest = MANIFEST.parse().unwrap();
        let (stack, factory) = manifest.synthesize(Some("master")).unwrap();
        stack.validate().unwrap();
        assert_eq!("prd", factory.get_alias_by_name("Orders").unwrap().name);
        assert_eq!(30, factory.get_function_by_name("Orders").unwrap().timeout);
        assert_eq!(600, factory.get_function_by_name("Reports").unwrap().timeout);
        assert!(stack.output("OrdersOutput").is_some());
        assert!(stack.resource("ReportsWarmerPermission").is_none());
        assert!(stack.resource("CommonsPermission").is_some());
    }

    #[test]
    fn invalid_manifest_is_an_error() {
        let err = "functions = 3".parse::<Manifest>().unwrap_err();
        assert!(matches!(err, crate::Error::Manifest { .. }), "{err}");
    }
}
