use crate::catalog::is_any_value_type;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl GlobalVariable {
    pub fn new(name: impl Into<String>, var_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: var_type.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    /// Whether this variable can fill a slot whose declared type is `wanted`.
    pub fn fits(&self, wanted: &str) -> bool {
        let wanted = wanted.trim();
        if wanted.is_empty() || is_any_value_type(wanted) {
            return true;
        }
        if self.var_type == wanted {
            return true;
        }
        VarType::parse(&self.var_type).is_some_and(|var_type| var_type.runtime_name() == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
}

impl ScalarType {
    pub const ALL: [ScalarType; 6] = [
        Self::Bool,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::String,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    pub fn runtime_name(&self) -> &'static str {
        match self {
            Self::Bool => "Boolean",
            Self::Int => "Int32",
            Self::Long => "Int64",
            Self::Float => "Single",
            Self::Double => "Double",
            Self::String => "String",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scalar| scalar.keyword() == keyword)
    }

    /// Keyword or runtime name, e.g. `int` or `Int32`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_keyword(name).or_else(|| {
            Self::ALL
                .into_iter()
                .find(|scalar| scalar.runtime_name() == name)
        })
    }

    fn accepts(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Bool => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
            Self::Int => value.parse::<i32>().is_ok(),
            Self::Long => value.parse::<i64>().is_ok(),
            Self::Float => value.parse::<f32>().is_ok(),
            Self::Double => value.parse::<f64>().is_ok(),
            Self::String => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Scalar(ScalarType),
    Array(ScalarType),
}

impl VarType {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_suffix("[]") {
            Some(element) => ScalarType::from_name(element.trim()).map(Self::Array),
            None => ScalarType::from_name(raw).map(Self::Scalar),
        }
    }

    pub fn runtime_name(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.runtime_name().to_string(),
            Self::Array(scalar) => format!("{}[]", scalar.runtime_name()),
        }
    }

    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Scalar(scalar) => scalar.accepts(value),
            Self::Array(scalar) => value
                .split(',')
                .map(str::trim)
                .filter(|element| !element.is_empty())
                .all(|element| scalar.accepts(element)),
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{}", scalar.keyword()),
            Self::Array(scalar) => write!(f, "{}[]", scalar.keyword()),
        }
    }
}

/// Blank values and types outside the vocabulary are accepted as-is.
pub fn validate_value(value: &str, var_type: &str) -> bool {
    if value.trim().is_empty() {
        return true;
    }
    VarType::parse(var_type).map_or(true, |var_type| var_type.accepts(value))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableIssue {
    #[error("variable #{index} has no name")]
    EmptyName { index: usize },
    #[error("variable name '{name}' is not a valid identifier")]
    InvalidName { name: String },
    #[error("variable '{name}' has no type")]
    MissingType { name: String },
    #[error("variable name '{name}' is used more than once")]
    DuplicateName { name: String },
    #[error("invalid value for type {var_type} in '{name}': {value}")]
    InvalidValue {
        name: String,
        var_type: String,
        value: String,
    },
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

pub fn validate_variables(variables: &[GlobalVariable]) -> Vec<VariableIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, variable) in variables.iter().enumerate() {
        let name = variable.name.trim();
        if name.is_empty() {
            issues.push(VariableIssue::EmptyName { index });
        } else if !is_identifier(name) {
            issues.push(VariableIssue::InvalidName {
                name: name.to_string(),
            });
        } else if !seen.insert(name) {
            issues.push(VariableIssue::DuplicateName {
                name: name.to_string(),
            });
        }

        if variable.var_type.trim().is_empty() {
            issues.push(VariableIssue::MissingType {
                name: name.to_string(),
            });
        } else if !validate_value(&variable.value, &variable.var_type) {
            issues.push(VariableIssue::InvalidValue {
                name: name.to_string(),
                var_type: variable.var_type.clone(),
                value: variable.value.clone(),
            });
        }
    }

    issues
}

pub fn compatible_variables<'a>(
    variables: &'a [GlobalVariable],
    wanted: &str,
) -> Vec<&'a GlobalVariable> {
    variables
        .iter()
        .filter(|variable| variable.fits(wanted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_validate_against_their_type() {
        assert!(validate_value("true", "bool"));
        assert!(validate_value("False", "bool"));
        assert!(!validate_value("yes", "bool"));
        assert!(validate_value("-42", "int"));
        assert!(!validate_value("3000000000", "int"));
        assert!(validate_value("3000000000", "long"));
        assert!(validate_value("1.5", "float"));
        assert!(!validate_value("1.5.0", "double"));
        assert!(validate_value("anything", "string"));
    }

    #[test]
    fn blank_values_and_unknown_types_pass() {
        assert!(validate_value("", "int"));
        assert!(validate_value("   ", "bool"));
        assert!(validate_value("whatever", "UnitData"));
    }

    #[test]
    fn arrays_validate_each_element() {
        assert!(validate_value("1, 2, 3", "int[]"));
        assert!(!validate_value("1, two, 3", "int[]"));
        assert!(validate_value("true,false", "bool[]"));
    }

    #[test]
    fn variable_table_reports_every_problem() {
        let variables = vec![
            GlobalVariable::new("gold", "int", "10"),
            GlobalVariable::new("", "int", "1"),
            GlobalVariable::new("9lives", "int", "9"),
            GlobalVariable::new("gold", "int", "20"),
            GlobalVariable::new("ready", "bool", "maybe"),
        ];

        let issues = validate_variables(&variables);
        assert_eq!(
            issues,
            vec![
                VariableIssue::EmptyName { index: 1 },
                VariableIssue::InvalidName {
                    name: "9lives".to_string()
                },
                VariableIssue::DuplicateName {
                    name: "gold".to_string()
                },
                VariableIssue::InvalidValue {
                    name: "ready".to_string(),
                    var_type: "bool".to_string(),
                    value: "maybe".to_string(),
                },
            ]
        );
        assert_eq!(
            issues[3].to_string(),
            "invalid value for type bool in 'ready': maybe"
        );
    }

    #[test]
    fn a_variable_without_a_type_is_reported() {
        let mut untyped = GlobalVariable::new("mood", "", "happy");
        untyped.description = "no type picked yet".to_string();
        assert_eq!(
            validate_variables(&[untyped]),
            vec![VariableIssue::MissingType {
                name: "mood".to_string()
            }]
        );
    }

    #[test]
    fn runtime_type_names_parse_like_keywords() {
        assert_eq!(VarType::parse("Int64"), Some(VarType::Scalar(ScalarType::Long)));
        assert_eq!(VarType::parse("Single[]"), Some(VarType::Array(ScalarType::Float)));
        assert!(!validate_value("1.5", "Int32"));
    }

    #[test]
    fn compatibility_accepts_keyword_or_runtime_name() {
        let variables = vec![
            GlobalVariable::new("ready", "bool", "true"),
            GlobalVariable::new("gold", "int", "10"),
            GlobalVariable::new("drops", "int[]", "1,2"),
        ];

        let names = |wanted: &str| -> Vec<String> {
            compatible_variables(&variables, wanted)
                .into_iter()
                .map(|variable| variable.name.clone())
                .collect()
        };

        assert_eq!(names("Boolean"), vec!["ready"]);
        assert_eq!(names("int"), vec!["gold"]);
        assert_eq!(names("Int32[]"), vec!["drops"]);
        assert_eq!(names("Object"), vec!["ready", "gold", "drops"]);
    }

    #[test]
    fn var_type_round_trips_through_display() {
        let parsed = VarType::parse("double[]").expect("array type should parse");
        assert_eq!(parsed, VarType::Array(ScalarType::Double));
        assert_eq!(parsed.to_string(), "double[]");
        assert_eq!(parsed.runtime_name(), "Double[]");
        assert!(VarType::parse("decimal").is_none());
    }
}
