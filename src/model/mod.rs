pub mod document;
pub mod selection;
pub mod tree;
pub mod variable;

pub use document::{ActionNodeDoc, DocumentLoad, SelectionDoc};
pub use selection::{SelectionValue, VariableRef};
pub use tree::{ActionInstance, ActionTree, InstanceId, TreeChange, TreeError};
pub use variable::{GlobalVariable, VarType, VariableIssue};
