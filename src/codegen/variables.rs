//! Global variables class: one static property per project variable.

use crate::codegen::GenerateError;
use crate::model::variable::{validate_variables, GlobalVariable, ScalarType, VarType};

/// Project-relative path of the generated class.
pub const VARIABLES_FILE: &str = "ModProject/ModCode/ModMain/Const/ModCreatorChildVars.cs";

/// Statement depth of the properties inside the class template.
const PROPERTY_INDENT: &str = "        ";

const BUILTIN_CLASS_TEMPLATE: &str = include_str!("templates/VarTemplate.tmp");
const BUILTIN_PROPERTY_TEMPLATE: &str = include_str!("templates/VarTemplateContent.tmp");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableTemplates {
    /// Whole file; holds `#PROJECTID#` and `#VARIABLES#`.
    pub class: String,
    /// One property; holds `#VARTYPE#`, `#VARNAME#` and `#VARVALUE#`.
    pub property: String,
}

impl VariableTemplates {
    pub fn builtin() -> Self {
        Self {
            class: BUILTIN_CLASS_TEMPLATE.to_string(),
            property: BUILTIN_PROPERTY_TEMPLATE.to_string(),
        }
    }
}

/// Declared type of the property. Known types use their keyword form,
/// anything else is written as given.
pub fn declared_type(variable: &GlobalVariable) -> String {
    match VarType::parse(&variable.var_type) {
        Some(var_type) => var_type.to_string(),
        None => variable.var_type.trim().to_string(),
    }
}

/// Initializer expression for `variable`. A blank value gives the type's
/// default; values of unknown types are written verbatim.
pub fn format_variable_value(variable: &GlobalVariable) -> String {
    let value = variable.value.trim();
    match VarType::parse(&variable.var_type) {
        Some(VarType::Scalar(scalar)) if value.is_empty() => default_value(scalar).to_string(),
        Some(VarType::Scalar(scalar)) => scalar_literal(scalar, value),
        Some(VarType::Array(scalar)) => {
            let elements: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|element| !element.is_empty())
                .map(|element| scalar_literal(scalar, element))
                .collect();
            if elements.is_empty() {
                "null".to_string()
            } else {
                format!("new {}[] {{ {} }}", scalar.keyword(), elements.join(", "))
            }
        }
        None if value.is_empty() => "null".to_string(),
        None => value.to_string(),
    }
}

fn default_value(scalar: ScalarType) -> &'static str {
    match scalar {
        ScalarType::Bool => "false",
        ScalarType::Int => "0",
        ScalarType::Long => "0L",
        ScalarType::Float => "0f",
        ScalarType::Double => "0.0",
        ScalarType::String => "\"\"",
    }
}

fn scalar_literal(scalar: ScalarType, value: &str) -> String {
    match scalar {
        ScalarType::String => {
            if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                value.to_string()
            } else {
                format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
        ScalarType::Bool if value.eq_ignore_ascii_case("true") => "true".to_string(),
        ScalarType::Bool => "false".to_string(),
        ScalarType::Float if value.ends_with(['f', 'F']) => value.to_string(),
        ScalarType::Float => format!("{value}f"),
        ScalarType::Long if value.ends_with(['l', 'L']) => value.to_string(),
        ScalarType::Long => format!("{value}L"),
        ScalarType::Int | ScalarType::Double => value.to_string(),
    }
}

fn property_line(variable: &GlobalVariable, templates: &VariableTemplates) -> String {
    let property = templates
        .property
        .replace("#VARTYPE#", &declared_type(variable))
        .replace("#VARNAME#", variable.name.trim())
        .replace("#VARVALUE#", &format_variable_value(variable));
    let description = variable.description.trim();
    if description.is_empty() {
        format!("{PROPERTY_INDENT}{}", property.trim())
    } else {
        format!("{PROPERTY_INDENT}{} // {description}", property.trim())
    }
}

/// Full source of the variables class. Refuses an empty table and any table
/// that fails validation.
pub fn generate_variables_source(
    variables: &[GlobalVariable],
    templates: &VariableTemplates,
    project_id: &str,
) -> Result<String, GenerateError> {
    if variables.is_empty() {
        return Err(GenerateError::NoVariables);
    }
    let issues = validate_variables(variables);
    if !issues.is_empty() {
        return Err(GenerateError::InvalidVariables(issues));
    }

    let mut properties = String::new();
    for variable in variables {
        properties.push_str(&property_line(variable, templates));
        properties.push('\n');
    }

    Ok(templates
        .class
        .replace("#PROJECTID#", project_id)
        .replace("#VARIABLES#", &properties))
}
