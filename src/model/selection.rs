use crate::model::tree::InstanceId;
use crate::model::variable::GlobalVariable;
use serde::{Deserialize, Serialize};

/// A variable as it was picked for a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
}

impl From<&GlobalVariable> for VariableRef {
    fn from(variable: &GlobalVariable) -> Self {
        Self {
            name: variable.name.clone(),
            var_type: variable.var_type.clone(),
        }
    }
}

/// What fills one parameter slot of an action instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionValue {
    /// Another instance living in the same tree.
    EventAction(InstanceId),
    Variable(VariableRef),
    /// A value typed in by the user. Not checked against the catalog.
    OptionalValue { value: String, expected_type: String },
}

impl SelectionValue {
    pub fn variable(variable: &GlobalVariable) -> Self {
        Self::Variable(variable.into())
    }

    pub fn literal(value: impl Into<String>, expected_type: impl Into<String>) -> Self {
        Self::OptionalValue {
            value: value.into(),
            expected_type: expected_type.into(),
        }
    }

    pub fn nested(&self) -> Option<InstanceId> {
        match self {
            Self::EventAction(id) => Some(*id),
            Self::Variable(_) | Self::OptionalValue { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::EventAction(_) => "event_action",
            Self::Variable(_) => "variable",
            Self::OptionalValue { .. } => "optional_value",
        }
    }
}
