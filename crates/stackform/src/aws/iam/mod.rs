//! IAM resources.
use crate::{Expr, HasDependencies};

pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
pub const VPC_ACCESS_POLICY: &str = "service-role/AWSLambdaVPCAccessExecutionRole";

/// The ARN of an AWS managed policy, eg `service-role/AWSLambdaBasicExecutionRole`.
pub fn managed_policy_arn(name: &str) -> Expr {
    Expr::sub(format!("arn:${{AWS::Partition}}:iam::aws:policy/{name}"))
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Expr>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Expr>) -> Self {
        PolicyDocument {
            version: "2012-10-17".to_owned(),
            statement,
        }
    }
}

/// An inline policy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, HasDependencies)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub assume_role_policy_document: PolicyDocument,
    pub managed_policy_arns: Vec<Expr>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,
}

impl Role {
    /// A role that the given service principal may assume.
    pub fn assumable_by(service: &str) -> Self {
        let trust = serde_json::json!({
            "Effect": "Allow",
            "Principal": { "Service": [service] },
            "Action": ["sts:AssumeRole"]
        });
        Role {
            assume_role_policy_document: PolicyDocument::new(vec![Expr::Object(
                trust_fields(trust),
            )]),
            managed_policy_arns: vec![],
            policies: vec![],
        }
    }

    /// Attaches a managed policy unless it is already attached.
    ///
    /// Returns `true` if the policy was attached.
    pub fn attach_managed_policy(&mut self, name: &str) -> bool {
        let arn = managed_policy_arn(name);
        if self.managed_policy_arns.contains(&arn) {
            false
        } else {
            self.managed_policy_arns.push(arn);
            true
        }
    }

    pub fn has_managed_policy(&self, name: &str) -> bool {
        self.managed_policy_arns.contains(&managed_policy_arn(name))
    }

    /// Appends statements to the named inline policy, creating it on first use.
    pub fn add_statements(
        &mut self,
        policy_name: impl Into<String>,
        statements: impl IntoIterator<Item = Expr>,
    ) {
        let policy_name = policy_name.into();
        let index = match self
            .policies
            .iter()
            .position(|p| p.policy_name == policy_name)
        {
            Some(index) => index,
            None => {
                self.policies.push(Policy {
                    policy_name,
                    policy_document: PolicyDocument::new(vec![]),
                });
                self.policies.len() - 1
            }
        };
        self.policies[index]
            .policy_document
            .statement
            .extend(statements);
    }
}

fn trust_fields(value: serde_json::Value) -> std::collections::BTreeMap<String, Expr> {
    match Expr::try_from(value) {
        Ok(Expr::Object(fields)) => fields,
        _ => Default::default(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn trust_policy_shape() {
        let role = Role::assumable_by(LAMBDA_SERVICE_PRINCIPAL);
        assert_eq!(
            serde_json::json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": ["lambda.amazonaws.com"] },
                    "Action": ["sts:AssumeRole"]
                }]
            }),
            serde_json::to_value(&role.assume_role_policy_document).unwrap()
        );
    }

    #[test]
    fn managed_policies_attach_once() {
        let mut role = Role::assumable_by(LAMBDA_SERVICE_PRINCIPAL);
        assert!(role.attach_managed_policy(VPC_ACCESS_POLICY));
        assert!(!role.attach_managed_policy(VPC_ACCESS_POLICY));
        assert_eq!(1, role.managed_policy_arns.len());
    }

    #[test]
    fn statements_share_one_inline_policy() {
        let mut role = Role::assumable_by(LAMBDA_SERVICE_PRINCIPAL);
        role.add_statements("OrdersPolicy", [Expr::literal("a")]);
        role.add_statements("OrdersPolicy", [Expr::literal("b")]);
        assert_eq!(1, role.policies.len());
        assert_eq!(2, role.policies[0].policy_document.statement.len());
    }
}
