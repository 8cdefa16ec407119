//! Turns action trees into text: human-readable display names for the
//! editor and source fragments for code generation.
//!
//! Both walks share one substitution pass over `{n}` placeholders. They
//! differ in which template they read, how an empty slot renders, and the
//! marker written when a nested value leads back to an instance already on
//! the current path.

pub mod emit;
pub mod template;

pub use emit::{combine_conditions, condition_parts, emit_block, BlockKind, ConditionLogic};
pub use template::{segments, Segment};

use crate::model::{ActionTree, InstanceId, SelectionValue};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rendering {
    Display,
    Code,
}

/// Display text of `id` with every filled slot substituted.
///
/// Unfilled or out-of-range placeholders are left as written. A nested
/// action that has filled slots of its own is wrapped in parentheses.
pub fn resolve_display_name(tree: &ActionTree, id: InstanceId) -> String {
    render(tree, id, Rendering::Display, &mut HashSet::new())
}

/// Source expression of `id`. Empty slots become `/* paramName */` comments
/// so the output still shows what is missing.
pub fn resolve_code(tree: &ActionTree, id: InstanceId) -> String {
    render(tree, id, Rendering::Code, &mut HashSet::new())
}

fn render(
    tree: &ActionTree,
    id: InstanceId,
    rendering: Rendering,
    visited: &mut HashSet<InstanceId>,
) -> String {
    let Some(node) = tree.get(id) else {
        return String::new();
    };
    let descriptor = node.descriptor();
    let template = match rendering {
        Rendering::Display => descriptor.display_name.as_str(),
        Rendering::Code => descriptor.code.as_str(),
    };
    if template.is_empty() {
        return String::new();
    }

    if !visited.insert(id) {
        return match rendering {
            Rendering::Display => format!("[Circular: {}]", descriptor.display_name),
            Rendering::Code => format!("/* [Circular: {}] */", descriptor.name),
        };
    }

    let mut output = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Placeholder { index, raw } => {
                let value = (index < descriptor.parameters.len())
                    .then(|| node.value(index))
                    .flatten();
                match value {
                    Some(value) => output.push_str(&render_value(tree, value, rendering, visited)),
                    None => match (rendering, descriptor.parameter(index)) {
                        (Rendering::Code, Some(parameter)) => {
                            output.push_str(&format!("/* {} */", parameter.name))
                        }
                        _ => output.push_str(raw),
                    },
                }
            }
        }
    }

    visited.remove(&id);
    output
}

fn render_value(
    tree: &ActionTree,
    value: &SelectionValue,
    rendering: Rendering,
    visited: &mut HashSet<InstanceId>,
) -> String {
    match value {
        SelectionValue::Variable(variable) => variable.name.clone(),
        SelectionValue::OptionalValue { value, .. } => value.clone(),
        SelectionValue::EventAction(nested) => {
            let text = render(tree, *nested, rendering, visited);
            let compound = tree
                .get(*nested)
                .is_some_and(|node| node.has_filled_parameters());
            if compound {
                format!("({text})")
            } else {
                text
            }
        }
    }
}

/// One row of the editor outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLine {
    pub id: InstanceId,
    pub depth: usize,
    pub text: String,
}

/// Pre-order outline of everything under the root, with resolved display
/// names. The root itself is not listed.
pub fn outline(tree: &ActionTree) -> Vec<DisplayLine> {
    let mut lines = Vec::new();
    let mut stack: Vec<(InstanceId, usize)> = tree
        .root_children()
        .iter()
        .rev()
        .map(|child| (*child, 0))
        .collect();
    let mut seen = HashSet::new();

    while let Some((id, depth)) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        lines.push(DisplayLine {
            id,
            depth,
            text: resolve_display_name(tree, id),
        });
        stack.extend(tree.children(id).iter().rev().map(|child| (*child, depth + 1)));
    }
    lines
}
