//! Shared lambda layers.
use crate::{
    aws::{
        lambda::{Code, LayerVersion, LayerVersionPermission},
        Construct,
    },
    factory::DEFAULT_RUNTIME,
    stack::{Batch, Declaration},
    Expr, Result, Stack,
};

#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct LayerProps {
    pub resource_name: String,
    pub description: String,
    pub code: Code,
    #[serde(default)]
    pub compatible_runtimes: Option<Vec<String>>,
    #[serde(default)]
    pub license: Option<String>,
}

impl LayerProps {
    pub fn new(resource_name: impl Into<String>, description: impl Into<String>, code: Code) -> Self {
        LayerProps {
            resource_name: resource_name.into(),
            description: description.into(),
            code,
            compatible_runtimes: None,
            license: None,
        }
    }
}

/// Declares a layer version that functions of the same account may use.
#[derive(Clone, Debug)]
pub struct LayerFactory {
    layer: Construct<LayerVersion>,
}

impl LayerFactory {
    /// Declares the layer and its `lambda:GetLayerVersion` permission.
    ///
    /// The permission is retained when removed from the template so that
    /// functions of other stacks keep access to the published version.
    pub fn new(stack: &mut Stack, props: LayerProps) -> Result<Self> {
        let LayerProps {
            resource_name,
            description,
            code,
            compatible_runtimes,
            license,
        } = props;
        let layer = LayerVersion {
            layer_name: Expr::sub("${Application}-${Country}-${Environment}-${Project}-layer"),
            description,
            content: code,
            compatible_runtimes: compatible_runtimes
                .unwrap_or_else(|| vec![DEFAULT_RUNTIME.to_owned()]),
            license_info: license,
        };
        let permission = LayerVersionPermission {
            action: "lambda:GetLayerVersion".to_owned(),
            layer_version_arn: Expr::reference(&resource_name),
            principal: Expr::sub("${AWS::AccountId}"),
        };
        stack.emit(Batch {
            resources: vec![
                Declaration::new(resource_name.clone(), layer.clone()),
                Declaration::new(format!("{resource_name}Permission"), permission).retained(),
            ],
            ..Default::default()
        })?;
        log::debug!("declared layer {resource_name}");
        Ok(LayerFactory {
            layer: Construct::new(resource_name, layer),
        })
    }

    pub fn layer(&self) -> &Construct<LayerVersion> {
        &self.layer
    }

    /// The layer version ARN, for a function's layer list.
    pub fn layer_arn(&self) -> Expr {
        self.layer.reference()
    }
}
