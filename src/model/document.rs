//! Persisted form of an [`ActionTree`]: nested records that name their
//! descriptor instead of embedding it.

use crate::catalog::{ActionCatalog, ActionDescriptor};
use crate::model::selection::{SelectionValue, VariableRef};
use crate::model::tree::{ActionTree, InstanceId};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionNodeDoc {
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "slot_map"
    )]
    pub parameters: BTreeMap<usize, SelectionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActionNodeDoc>,
}

/// Slot maps nested inside a tagged [`SelectionDoc`] reach us with their keys
/// still as strings, so the index is parsed here instead of by serde.
fn slot_map<'de, D>(deserializer: D) -> Result<BTreeMap<usize, SelectionDoc>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, SelectionDoc>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| match key.trim().parse::<usize>() {
            Ok(index) => Ok((index, value)),
            Err(_) => Err(D::Error::custom(format!("slot index is not a number: {key}"))),
        })
        .collect()
}

impl ActionNodeDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionDoc {
    EventAction {
        action: ActionNodeDoc,
    },
    Variable {
        name: String,
        #[serde(rename = "type")]
        var_type: String,
    },
    OptionalValue {
        value: String,
        #[serde(default)]
        expected_type: String,
    },
}

#[derive(Debug, Clone)]
pub struct DocumentLoad {
    pub tree: ActionTree,
    /// Descriptor names the catalog did not know, in encounter order.
    pub unresolved: Vec<String>,
}

impl ActionTree {
    /// Rebuilds a tree under a fresh root. Unknown descriptor names become
    /// unresolved placeholders so the rest of the tree survives.
    pub fn from_document(nodes: &[ActionNodeDoc], catalog: &ActionCatalog) -> DocumentLoad {
        let mut load = DocumentLoad {
            tree: ActionTree::new(),
            unresolved: Vec::new(),
        };
        let root = load.tree.root();
        for node in nodes {
            let id = build_node(&mut load, node, catalog);
            load.tree.link_child(root, id, None);
        }
        load
    }

    pub fn to_document(&self) -> Vec<ActionNodeDoc> {
        let mut visited = HashSet::new();
        self.root_children()
            .iter()
            .filter_map(|child| self.node_document(*child, &mut visited))
            .collect()
    }

    fn node_document(&self, id: InstanceId, visited: &mut HashSet<InstanceId>) -> Option<ActionNodeDoc> {
        let node = self.get(id)?;
        if !visited.insert(id) {
            return None;
        }

        let mut parameters = BTreeMap::new();
        for (index, value) in node.parameter_values() {
            let doc = match value {
                SelectionValue::EventAction(nested) => {
                    let Some(action) = self.node_document(*nested, visited) else {
                        continue;
                    };
                    SelectionDoc::EventAction { action }
                }
                SelectionValue::Variable(variable) => SelectionDoc::Variable {
                    name: variable.name.clone(),
                    var_type: variable.var_type.clone(),
                },
                SelectionValue::OptionalValue {
                    value,
                    expected_type,
                } => SelectionDoc::OptionalValue {
                    value: value.clone(),
                    expected_type: expected_type.clone(),
                },
            };
            parameters.insert(*index, doc);
        }

        let children = node
            .children()
            .iter()
            .filter_map(|child| self.node_document(*child, visited))
            .collect();

        visited.remove(&id);
        Some(ActionNodeDoc {
            name: node.descriptor().name.clone(),
            parameters,
            children,
        })
    }
}

/// The second value is true when `name` had to become a placeholder.
fn resolve_descriptor(
    load: &mut DocumentLoad,
    name: &str,
    catalog: &ActionCatalog,
) -> (Arc<ActionDescriptor>, bool) {
    match catalog.find(name) {
        Some(descriptor) => (descriptor, false),
        None => {
            warn!(action = %name, "action not found in catalog, kept as unresolved");
            load.unresolved.push(name.to_string());
            (Arc::new(ActionDescriptor::unresolved(name)), true)
        }
    }
}

fn build_node(load: &mut DocumentLoad, doc: &ActionNodeDoc, catalog: &ActionCatalog) -> InstanceId {
    let (descriptor, unresolved) = resolve_descriptor(load, &doc.name, catalog);
    let id = load.tree.insert_detached(descriptor);

    for (index, value) in &doc.parameters {
        let value = match value {
            SelectionDoc::EventAction { action } => {
                SelectionValue::EventAction(build_node(load, action, catalog))
            }
            SelectionDoc::Variable { name, var_type } => SelectionValue::Variable(VariableRef {
                name: name.clone(),
                var_type: var_type.clone(),
            }),
            SelectionDoc::OptionalValue {
                value,
                expected_type,
            } => SelectionValue::literal(value.clone(), expected_type.clone()),
        };
        if unresolved {
            load.tree.restore_slot(id, *index, value);
        } else if let Err(err) = load.tree.fill_slot(id, *index, value) {
            warn!(action = %doc.name, index, %err, "parameter dropped while loading");
        }
    }

    for child in &doc.children {
        let child_id = build_node(load, child, catalog);
        load.tree.link_child(id, child_id, None);
    }

    id
}
