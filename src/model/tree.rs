//! Arena holding the action instances of one condition or action list.
//!
//! Instances refer to each other by [`InstanceId`]. A child sits in its
//! parent's `children`; a nested action sits in one of its owner's parameter
//! slots. In both cases `parent` points back at the holder.

use crate::catalog::{ActionCatalog, ActionDescriptor};
use crate::model::selection::SelectionValue;
use slab::Slab;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ActionInstance {
    descriptor: Arc<ActionDescriptor>,
    parameter_values: BTreeMap<usize, SelectionValue>,
    children: Vec<InstanceId>,
    parent: Option<InstanceId>,
}

impl ActionInstance {
    fn new(descriptor: Arc<ActionDescriptor>) -> Self {
        Self {
            descriptor,
            parameter_values: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    pub fn descriptor_arc(&self) -> &Arc<ActionDescriptor> {
        &self.descriptor
    }

    pub fn parameter_values(&self) -> &BTreeMap<usize, SelectionValue> {
        &self.parameter_values
    }

    pub fn value(&self, index: usize) -> Option<&SelectionValue> {
        self.parameter_values.get(&index)
    }

    pub fn has_filled_parameters(&self) -> bool {
        !self.parameter_values.is_empty()
    }

    pub fn children(&self) -> &[InstanceId] {
        &self.children
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("instance {0} does not exist")]
    Missing(InstanceId),
    #[error("the root instance cannot be removed or moved")]
    RootLocked,
    #[error("{name} is managed by its parent and cannot be removed on its own")]
    Locked { name: String },
    #[error("{name} has no parameter slot {index}")]
    NoSlot { name: String, index: usize },
    #[error("{name} cannot host child actions")]
    NoChildren { name: String },
    #[error("instance {0} is already attached elsewhere")]
    AlreadyAttached(InstanceId),
    #[error("placing {nested} in a slot of {owner} would make it contain itself")]
    Cycle {
        owner: InstanceId,
        nested: InstanceId,
    },
    #[error("instances {dragged} and {target} do not share a parent")]
    NotSiblings {
        dragged: InstanceId,
        target: InstanceId,
    },
}

/// Emitted after a mutation that changes how an instance renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    DisplayChanged(InstanceId),
}

#[derive(Debug, Clone)]
pub struct ActionTree {
    nodes: Slab<ActionInstance>,
    root: InstanceId,
}

impl Default for ActionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionTree {
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = InstanceId(nodes.insert(ActionInstance::new(Arc::new(ActionDescriptor::root()))));
        Self { nodes, root }
    }

    pub fn root(&self) -> InstanceId {
        self.root
    }

    pub fn is_root(&self, id: InstanceId) -> bool {
        id == self.root
    }

    pub fn get(&self, id: InstanceId) -> Option<&ActionInstance> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.nodes.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_children().is_empty()
    }

    pub fn children(&self, id: InstanceId) -> &[InstanceId] {
        self.get(id).map(ActionInstance::children).unwrap_or(&[])
    }

    pub fn root_children(&self) -> &[InstanceId] {
        self.children(self.root)
    }

    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.get(id).and_then(ActionInstance::parent)
    }

    fn node_mut(&mut self, id: InstanceId) -> Result<&mut ActionInstance, TreeError> {
        self.nodes.get_mut(id.0).ok_or(TreeError::Missing(id))
    }

    /// Adds a detached instance without attaching any sub items.
    pub fn insert_detached(&mut self, descriptor: Arc<ActionDescriptor>) -> InstanceId {
        InstanceId(self.nodes.insert(ActionInstance::new(descriptor)))
    }

    /// Creates a detached instance of `descriptor`. Every sub item name found
    /// in `catalog` becomes a fresh child; unknown names are skipped.
    pub fn instantiate(
        &mut self,
        descriptor: Arc<ActionDescriptor>,
        catalog: &ActionCatalog,
    ) -> InstanceId {
        let sub_items = descriptor.sub_items.clone();
        let id = self.insert_detached(descriptor);

        for name in &sub_items {
            match catalog.find(name) {
                Some(sub_descriptor) => {
                    let child = self.insert_detached(sub_descriptor);
                    self.link_child(id, child, None);
                }
                None => debug!(sub_item = %name, "sub item not in catalog, skipped"),
            }
        }

        id
    }

    pub(crate) fn link_child(&mut self, parent: InstanceId, child: InstanceId, position: Option<usize>) {
        if let Some(node) = self.nodes.get_mut(parent.0) {
            match position {
                Some(position) if position <= node.children.len() => {
                    node.children.insert(position, child)
                }
                _ => node.children.push(child),
            }
        }
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
    }

    pub fn append_child(&mut self, parent: InstanceId, child: InstanceId) -> Result<(), TreeError> {
        self.insert_child(parent, usize::MAX, child)
    }

    pub fn insert_child(
        &mut self,
        parent: InstanceId,
        position: usize,
        child: InstanceId,
    ) -> Result<(), TreeError> {
        let host = self.get(parent).ok_or(TreeError::Missing(parent))?;
        if !host.descriptor.hosts_children() {
            return Err(TreeError::NoChildren {
                name: host.descriptor.name.clone(),
            });
        }
        let guest = self.get(child).ok_or(TreeError::Missing(child))?;
        if guest.parent.is_some() || self.is_root(child) {
            return Err(TreeError::AlreadyAttached(child));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(TreeError::Cycle {
                owner: parent,
                nested: child,
            });
        }

        self.link_child(parent, child, Some(position));
        Ok(())
    }

    /// Fills slot `index` of `owner`, replacing whatever was there. The index
    /// must name one of the descriptor's parameters.
    pub fn fill_slot(
        &mut self,
        owner: InstanceId,
        index: usize,
        value: SelectionValue,
    ) -> Result<TreeChange, TreeError> {
        let descriptor = &self.get(owner).ok_or(TreeError::Missing(owner))?.descriptor;
        if index >= descriptor.parameters.len() {
            return Err(TreeError::NoSlot {
                name: descriptor.name.clone(),
                index,
            });
        }

        let current_nested = self
            .get(owner)
            .and_then(|node| node.value(index))
            .and_then(SelectionValue::nested);

        if let Some(nested) = value.nested() {
            let node = self.get(nested).ok_or(TreeError::Missing(nested))?;
            if self.is_ancestor_or_self(nested, owner) {
                return Err(TreeError::Cycle { owner, nested });
            }
            if node.parent.is_some() && current_nested != Some(nested) {
                return Err(TreeError::AlreadyAttached(nested));
            }
        }

        if let Some(previous) = current_nested {
            if Some(previous) != value.nested() {
                self.drop_subtree(previous);
            }
        }
        if let Some(nested) = value.nested() {
            self.node_mut(nested)?.parent = Some(owner);
        }
        self.node_mut(owner)?.parameter_values.insert(index, value);

        Ok(TreeChange::DisplayChanged(owner))
    }

    pub fn clear_slot(&mut self, owner: InstanceId, index: usize) -> Result<TreeChange, TreeError> {
        let removed = self.node_mut(owner)?.parameter_values.remove(&index);
        if let Some(nested) = removed.as_ref().and_then(SelectionValue::nested) {
            self.drop_subtree(nested);
        }
        Ok(TreeChange::DisplayChanged(owner))
    }

    /// Puts a stored value back into a slot the descriptor may not declare.
    /// Loading uses this for unresolved actions so their values survive a
    /// save. A nested instance must be fresh and detached.
    pub(crate) fn restore_slot(&mut self, owner: InstanceId, index: usize, value: SelectionValue) {
        if let Some(nested) = value.nested() {
            if let Some(node) = self.nodes.get_mut(nested.0) {
                node.parent = Some(owner);
            }
        }
        if let Some(node) = self.nodes.get_mut(owner.0) {
            node.parameter_values.insert(index, value);
        }
    }

    /// Writes a slot with no checks at all. Only for building malformed trees
    /// in tests.
    #[cfg(test)]
    pub(crate) fn set_slot_unchecked(&mut self, owner: InstanceId, index: usize, value: SelectionValue) {
        if let Some(node) = self.nodes.get_mut(owner.0) {
            node.parameter_values.insert(index, value);
        }
    }

    /// Detaches `id` from its holder and drops it with everything it owns.
    /// Hidden sub items only go away with their parent.
    pub fn remove(&mut self, id: InstanceId) -> Result<(), TreeError> {
        if self.is_root(id) {
            return Err(TreeError::RootLocked);
        }
        let node = self.get(id).ok_or(TreeError::Missing(id))?;
        if node.descriptor.is_hidden {
            return Err(TreeError::Locked {
                name: node.descriptor.name.clone(),
            });
        }
        let parent = node.parent;

        if let Some(parent) = parent {
            let holder = self.node_mut(parent)?;
            holder.children.retain(|child| *child != id);
            holder
                .parameter_values
                .retain(|_, value| value.nested() != Some(id));
        }
        self.drop_subtree(id);
        Ok(())
    }

    /// Moves `dragged` to the position `target` holds among their shared
    /// parent's children; the other siblings keep their order.
    pub fn reorder(&mut self, dragged: InstanceId, target: InstanceId) -> Result<(), TreeError> {
        if self.is_root(dragged) || self.is_root(target) {
            return Err(TreeError::RootLocked);
        }
        if dragged == target {
            return Ok(());
        }

        let parent = self.parent(dragged).ok_or(TreeError::Missing(dragged))?;
        let not_siblings = TreeError::NotSiblings { dragged, target };
        if self.parent(target) != Some(parent) {
            return Err(not_siblings);
        }

        let holder = self.node_mut(parent)?;
        let old_index = holder.children.iter().position(|child| *child == dragged);
        let new_index = holder.children.iter().position(|child| *child == target);
        let (Some(old_index), Some(new_index)) = (old_index, new_index) else {
            return Err(not_siblings);
        };

        holder.children.remove(old_index);
        holder.children.insert(new_index, dragged);
        Ok(())
    }

    /// Whether `candidate` is `of` or one of its holders.
    pub fn is_ancestor_or_self(&self, candidate: InstanceId, of: InstanceId) -> bool {
        let mut current = Some(of);
        let mut steps = 0;
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.parent(id);
        }
        false
    }

    /// `id` and everything it owns, through children and filled slots.
    pub fn subtree(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            if !seen.insert(current) {
                continue;
            }
            ordered.push(current);
            stack.extend(node.parameter_values.values().filter_map(SelectionValue::nested));
            stack.extend(node.children.iter().rev().copied());
        }

        ordered
    }

    fn drop_subtree(&mut self, id: InstanceId) {
        for member in self.subtree(id) {
            if member != self.root {
                self.nodes.try_remove(member.0);
            }
        }
    }
}
