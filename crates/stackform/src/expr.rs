//! Intrinsic values.
//!
//! CloudFormation property values are either plain values or intrinsic
//! function calls resolved at deploy time. [`Expr`] models the subset the
//! constructs in this crate emit and accept, and serializes to (and
//! deserializes from) the template JSON shape, eg `{"Ref": "Orders"}` or
//! `{"Fn::Sub": "${Application}-orders"}`.
use std::collections::BTreeMap;

use serde::de::Error as _;

use crate::{Dependencies, HasDependencies};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Literal(String),
    Ref(String),
    GetAtt {
        logical_id: String,
        attribute: String,
    },
    Sub(String),
    Join {
        delimiter: String,
        values: Vec<Expr>,
    },
    If {
        condition: String,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    ImportValue(Box<Expr>),
    /// A structured value whose fields may themselves be intrinsic.
    Object(BTreeMap<String, Expr>),
    List(Vec<Expr>),
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Literal(String::new())
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(value.to_owned())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(value)
    }
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Expr::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn sub(template: impl Into<String>) -> Self {
        Expr::Sub(template.into())
    }

    pub fn join(delimiter: impl Into<String>, values: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Join {
            delimiter: delimiter.into(),
            values: values.into_iter().collect(),
        }
    }

    pub fn if_(condition: impl Into<String>, then: Expr, otherwise: Expr) -> Self {
        Expr::If {
            condition: condition.into(),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn import_value(name: Expr) -> Self {
        Expr::ImportValue(Box::new(name))
    }

    /// `{"Ref": "AWS::NoValue"}`, which removes the property it is assigned to.
    pub fn no_value() -> Self {
        Expr::Ref("AWS::NoValue".to_owned())
    }

    /// Returns the literal string, if this is one.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal(s) => Some(s),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value};
        match self {
            Expr::Literal(s) => Value::String(s.clone()),
            Expr::Ref(id) => json!({ "Ref": id }),
            Expr::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
            Expr::Sub(template) => json!({ "Fn::Sub": template }),
            Expr::Join { delimiter, values } => json!({
                "Fn::Join": [
                    delimiter,
                    values.iter().map(Expr::to_json).collect::<Vec<_>>()
                ]
            }),
            Expr::If {
                condition,
                then,
                otherwise,
            } => json!({ "Fn::If": [condition, then.to_json(), otherwise.to_json()] }),
            Expr::ImportValue(name) => json!({ "Fn::ImportValue": name.to_json() }),
            Expr::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Expr::List(items) => Value::Array(items.iter().map(Expr::to_json).collect()),
        }
    }
}

/// Names interpolated by an `Fn::Sub` template, ie `X` in `${X}` or
/// `${X.Attribute}`. Escaped `${!X}` placeholders are not references.
fn sub_references(template: &str) -> Vec<String> {
    let mut names = vec![];
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        rest = &rest[start + 2..];
        let Some(end) = rest.find('}') else {
            break;
        };
        let inner = &rest[..end];
        rest = &rest[end + 1..];
        if inner.starts_with('!') || inner.is_empty() {
            continue;
        }
        let name = inner.split('.').next().unwrap_or(inner);
        names.push(name.to_owned());
    }
    names
}

/// Pseudo parameters are provided by the platform and never declared.
fn is_pseudo(id: &str) -> bool {
    id.starts_with("AWS::")
}

impl HasDependencies for Expr {
    fn dependencies(&self) -> Dependencies {
        match self {
            Expr::Literal(_) => Dependencies::default(),
            Expr::Ref(id) | Expr::GetAtt { logical_id: id, .. } => {
                if is_pseudo(id) {
                    Dependencies::default()
                } else {
                    Dependencies::single(id.clone())
                }
            }
            Expr::Sub(template) => sub_references(template)
                .into_iter()
                .filter(|name| !is_pseudo(name))
                .fold(Dependencies::default(), |acc, name| {
                    acc.merge(Dependencies::single(name))
                }),
            Expr::Join { values, .. } => values.dependencies(),
            Expr::If {
                then, otherwise, ..
            } => then.dependencies().merge(otherwise.dependencies()),
            Expr::ImportValue(name) => name.dependencies(),
            Expr::Object(fields) => fields.dependencies(),
            Expr::List(items) => items.dependencies(),
        }
    }
}

impl core::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(s) => f.write_str(s),
            other => f.write_str(&other.to_json().to_string()),
        }
    }
}

impl serde::Serialize for Expr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl TryFrom<serde_json::Value> for Expr {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        fn string(value: Value, what: &str) -> Result<String, String> {
            match value {
                Value::String(s) => Ok(s),
                other => Err(format!("expected a string for {what}, found {other}")),
            }
        }

        fn array(value: Value, len: usize, what: &str) -> Result<Vec<Value>, String> {
            match value {
                Value::Array(items) if items.len() == len => Ok(items),
                other => Err(format!("expected {len} arguments for {what}, found {other}")),
            }
        }

        match value {
            Value::String(s) => Ok(Expr::Literal(s)),
            Value::Number(n) => Ok(Expr::Literal(n.to_string())),
            Value::Bool(b) => Ok(Expr::Literal(b.to_string())),
            Value::Null => Err("null is not a valid value".to_owned()),
            Value::Array(items) => Ok(Expr::List(
                items
                    .into_iter()
                    .map(Expr::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            Value::Object(map) if map.len() == 1 => {
                // UNWRAP: safe because the map has exactly one entry
                let (key, arg) = map.into_iter().next().unwrap();
                match key.as_str() {
                    "Ref" => Ok(Expr::Ref(string(arg, "Ref")?)),
                    "Fn::Sub" => Ok(Expr::Sub(string(arg, "Fn::Sub")?)),
                    "Fn::GetAtt" => {
                        let mut args = array(arg, 2, "Fn::GetAtt")?.into_iter();
                        // UNWRAP: safe because `array` checked the length
                        let logical_id = string(args.next().unwrap(), "Fn::GetAtt")?;
                        let attribute = string(args.next().unwrap(), "Fn::GetAtt")?;
                        Ok(Expr::GetAtt {
                            logical_id,
                            attribute,
                        })
                    }
                    "Fn::Join" => {
                        let mut args = array(arg, 2, "Fn::Join")?.into_iter();
                        // UNWRAP: safe because `array` checked the length
                        let delimiter = string(args.next().unwrap(), "Fn::Join")?;
                        let values = match args.next().unwrap() {
                            Value::Array(items) => items
                                .into_iter()
                                .map(Expr::try_from)
                                .collect::<Result<_, _>>()?,
                            other => return Err(format!("expected a list to join, found {other}")),
                        };
                        Ok(Expr::Join { delimiter, values })
                    }
                    "Fn::If" => {
                        let mut args = array(arg, 3, "Fn::If")?.into_iter();
                        // UNWRAP: safe because `array` checked the length
                        let condition = string(args.next().unwrap(), "Fn::If")?;
                        let then = Expr::try_from(args.next().unwrap())?;
                        let otherwise = Expr::try_from(args.next().unwrap())?;
                        Ok(Expr::if_(condition, then, otherwise))
                    }
                    "Fn::ImportValue" => Ok(Expr::import_value(Expr::try_from(arg)?)),
                    _ => Ok(Expr::Object(BTreeMap::from([(key, Expr::try_from(arg)?)]))),
                }
            }
            Value::Object(map) => Ok(Expr::Object(
                map.into_iter()
                    .map(|(k, v)| Ok((k, Expr::try_from(v)?)))
                    .collect::<Result<_, String>>()?,
            )),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Expr::try_from(value).map_err(D::Error::custom)
    }
}
