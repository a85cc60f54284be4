//! Scheduled rules that keep functions warm.
//!
//! A rule accepts a bounded number of targets, so warmed functions are
//! bucketed into groups of at most [`WARMER_GROUP_SIZE`] with one rule each.
use crate::{
    aws::{
        events::{Rule, Target},
        lambda::Permission,
    },
    stack::Declaration,
    Expr,
};

use super::WARMER_GROUP_SIZE;

/// Delivered to every warmed function on each tick.
pub const WARMER_INPUT: &str = r#"{ "warmer": true, "concurrency": 1, "cfg": { "log": false } }"#;

/// Whether a function is warmed.
///
/// A factory that warms by default warms every function that does not opt
/// out. A factory that does not warms only functions that opt in.
pub fn is_warmed(factory_default: bool, definition: Option<bool>) -> bool {
    (factory_default && definition != Some(false)) || (!factory_default && definition == Some(true))
}

/// Splits ids, in order, into consecutive groups of at most
/// [`WARMER_GROUP_SIZE`].
pub fn group<T>(ids: &[T]) -> std::slice::Chunks<'_, T> {
    ids.chunks(WARMER_GROUP_SIZE)
}

/// A function to warm.
#[derive(Clone, Debug)]
pub struct WarmedFunction {
    pub resource_name: String,
    pub function_name: String,
    /// Logical id of the alias the rule invokes.
    pub alias_id: String,
}

/// Plans one rule per group and one invoke permission per target.
pub fn plan_rules(warmed: &[WarmedFunction], schedule_parameter: &str) -> Vec<Declaration> {
    let mut declarations = vec![];
    for (index, members) in group(warmed).enumerate() {
        let rule_id = format!("LambdaWarmerRule{index}");
        log::debug!("warmer rule {rule_id} targets {} functions", members.len());
        let targets = members
            .iter()
            .map(|member| {
                log::trace!("{rule_id} warms {} via {}", member.function_name, member.alias_id);
                Target {
                    id: format!("rule-{}", member.resource_name),
                    arn: Expr::reference(&member.alias_id),
                    input: Some(WARMER_INPUT.to_owned()),
                }
            })
            .collect();
        declarations.push(Declaration::new(
            rule_id.clone(),
            Rule {
                name: Expr::sub(format!(
                    "rule-${{Country}}-${{Application}}-${{Project}}-lambda-warmer-${{Environment}}-{index}"
                )),
                description: "Lambda warmer".to_owned(),
                schedule_expression: Expr::sub(format!("${{{schedule_parameter}}}")),
                state: Rule::ENABLED.to_owned(),
                targets,
            },
        ));
        for member in members {
            declarations.push(Declaration::new(
                format!("{}WarmerPermission", member.resource_name),
                Permission::invoke(Expr::reference(&member.alias_id), "events.amazonaws.com")
                    .with_source_arn(Expr::get_att(&rule_id, "Arn")),
            ));
        }
    }
    declarations
}

#[cfg(test)]
mod test {
    use super::*;

    fn sizes(count: usize) -> Vec<usize> {
        let ids: Vec<usize> = (0..count).collect();
        group(&ids).map(<[usize]>::len).collect()
    }

    #[test]
    fn groups_are_bounded_by_five() {
        assert_eq!(vec![5, 5], sizes(10));
        assert_eq!(vec![5, 5, 2], sizes(12));
        assert_eq!(vec![1], sizes(1));
        assert!(sizes(0).is_empty());
    }

    #[test]
    fn groups_preserve_order() {
        let ids: Vec<usize> = (0..7).collect();
        let groups: Vec<&[usize]> = group(&ids).collect();
        assert_eq!(&[0, 1, 2, 3, 4], groups[0]);
        assert_eq!(&[5, 6], groups[1]);
    }

    #[test]
    fn opt_in_and_opt_out() {
        assert!(is_warmed(true, None));
        assert!(is_warmed(true, Some(true)));
        assert!(!is_warmed(true, Some(false)));
        assert!(!is_warmed(false, None));
        assert!(is_warmed(false, Some(true)));
        assert!(!is_warmed(false, Some(false)));
    }

    #[test]
    fn one_permission_per_target() {
        let warmed: Vec<_> = (0..6)
            .map(|i| WarmedFunction {
                resource_name: format!("Fn{i}"),
                function_name: format!("fn-{i}"),
                alias_id: format!("Fn{i}AliasvLatest"),
            })
            .collect();
        let declarations = plan_rules(&warmed, "LambdaWarmerScheduleRate");
        assert_eq!(2 + 6, declarations.len());
        let second = declarations
            .iter()
            .find(|d| d.logical_id() == "LambdaWarmerRule1")
            .unwrap();
        let rule = second.construct::<Rule>().unwrap();
        assert_eq!(1, rule.targets.len());
        assert_eq!("rule-Fn5", rule.targets[0].id);
        assert_eq!(Expr::reference("Fn5AliasvLatest"), rule.targets[0].arn);
        assert_eq!(Some(WARMER_INPUT.to_owned()), rule.targets[0].input);
        let permission = declarations
            .iter()
            .find(|d| d.logical_id() == "Fn5WarmerPermission")
            .unwrap()
            .construct::<Permission>()
            .unwrap();
        assert_eq!(
            Some(Expr::get_att("LambdaWarmerRule1", "Arn")),
            permission.source_arn
        );
    }

    #[test]
    fn shared_function_names_get_distinct_target_ids() {
        let warmed: Vec<_> = ["Orders", "OrdersCopy"]
            .into_iter()
            .map(|resource_name| WarmedFunction {
                resource_name: resource_name.to_owned(),
                function_name: "orders".to_owned(),
                alias_id: format!("{resource_name}AliasvLatest"),
            })
            .collect();
        let declarations = plan_rules(&warmed, "LambdaWarmerScheduleRate");
        let rule = declarations[0].construct::<Rule>().unwrap();
        let ids: Vec<&str> = rule.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(vec!["rule-Orders", "rule-OrdersCopy"], ids);
    }
}
