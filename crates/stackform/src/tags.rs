//! Organization resource tags.
use crate::{aws::Tag, Expr};

/// Tag values that are fixed for a whole organization.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct TagConstants {
    pub owner: String,
    /// Operational contact.
    pub creator: String,
    pub cost_center: String,
}

impl Default for TagConstants {
    fn default() -> Self {
        TagConstants {
            owner: "platform-team".to_owned(),
            creator: "platform-team@example.com".to_owned(),
            cost_center: "n/a".to_owned(),
        }
    }
}

/// The tag set every resource carries.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceTags {
    pub name: Expr,
    pub description: String,
    pub technology: String,
}

impl ResourceTags {
    pub fn new(name: Expr, description: impl Into<String>, technology: impl Into<String>) -> Self {
        ResourceTags {
            name,
            description: description.into(),
            technology: technology.into(),
        }
    }

    /// Renders the list form, sorted by key.
    pub fn to_tags(&self, constants: &TagConstants) -> Vec<Tag> {
        let tag = |key: &str, value: Expr| Tag {
            key: key.to_owned(),
            value,
        };
        let mut tags = vec![
            tag("Application", Expr::sub("${Application}")),
            tag("Environment", Expr::sub("${Environment}")),
            tag("Owner", Expr::literal(&constants.owner)),
            tag("Creator", Expr::literal(&constants.creator)),
            tag("CostCenter", Expr::literal(&constants.cost_center)),
            tag("Name", self.name.clone()),
            tag("Description", Expr::literal(&self.description)),
            tag("Technology", Expr::literal(&self.technology)),
        ];
        tags.sort_by(|a, b| a.key.cmp(&b.key));
        tags
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tag_set_is_complete_and_sorted() {
        let tags = ResourceTags::new(Expr::sub("${Application}-orders"), "Order API", "lambda")
            .to_tags(&TagConstants::default());
        let keys: Vec<_> = tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(
            vec![
                "Application",
                "CostCenter",
                "Creator",
                "Description",
                "Environment",
                "Name",
                "Owner",
                "Technology"
            ],
            keys
        );
        let technology = tags.iter().find(|t| t.key == "Technology").unwrap();
        assert_eq!(Expr::literal("lambda"), technology.value);
    }
}
