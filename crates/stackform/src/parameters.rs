//! Template parameters every stack declares.
use crate::{stack::Parameter, Result, Stack};

/// Parameters supplied by the deployment pipeline.
pub const MANDATORY_PARAMETERS: [&str; 4] = ["Application", "Project", "Country", "Environment"];

/// A caller-supplied parameter.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct ParameterProps {
    pub name: String,
    #[serde(rename = "type", default = "ParameterProps::default_type")]
    pub ty: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
}

impl ParameterProps {
    fn default_type() -> String {
        "String".to_owned()
    }

    pub fn new(name: impl Into<String>) -> Self {
        ParameterProps {
            name: name.into(),
            ty: Self::default_type(),
            default: None,
            description: None,
            allowed_values: vec![],
        }
    }

    fn into_parameter(self) -> (String, Parameter) {
        (
            self.name,
            Parameter {
                ty: self.ty,
                description: self.description,
                default: self.default,
                allowed_values: self.allowed_values,
            },
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StackParameters {
    pub custom: Vec<ParameterProps>,
}

impl StackParameters {
    pub fn new(custom: impl IntoIterator<Item = ParameterProps>) -> Self {
        StackParameters {
            custom: custom.into_iter().collect(),
        }
    }

    /// Declares the mandatory parameters followed by the custom ones.
    pub fn declare(&self, stack: &mut Stack) -> Result<()> {
        for name in MANDATORY_PARAMETERS {
            stack.add_parameter(name, Parameter::string(format!("The {name} this stack belongs to")))?;
        }
        for props in self.custom.iter().cloned() {
            let (name, parameter) = props.into_parameter();
            stack.add_parameter(name, parameter)?;
        }
        log::debug!(
            "declared {} stack parameters",
            MANDATORY_PARAMETERS.len() + self.custom.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mandatory_and_custom_parameters() {
        let mut stack = Stack::default();
        let mut stage = ParameterProps::new("Stage");
        stage.allowed_values = vec!["blue".into(), "green".into()];
        StackParameters::new([stage]).declare(&mut stack).unwrap();
        for name in MANDATORY_PARAMETERS {
            assert_eq!("String", stack.parameter(name).unwrap().ty);
        }
        assert_eq!(2, stack.parameter("Stage").unwrap().allowed_values.len());
    }

    #[test]
    fn custom_parameter_cannot_shadow_mandatory_one() {
        let mut stack = Stack::default();
        let err = StackParameters::new([ParameterProps::new("Environment")])
            .declare(&mut stack)
            .unwrap_err();
        assert!(matches!(err, crate::Error::DuplicateLogicalId { .. }));
    }
}
