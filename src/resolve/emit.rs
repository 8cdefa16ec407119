use crate::model::{ActionTree, InstanceId};
use crate::resolve::resolve_code;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const INDENT_UNIT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Boolean expressions, each wrapped in parentheses on one line.
    Conditions,
    /// Statements, one per line.
    Actions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionLogic {
    #[default]
    And,
    Or,
}

impl ConditionLogic {
    pub fn operator(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Renders `ids` as source text at `indent` levels.
///
/// A root sentinel in `ids` is never rendered itself; its descendants are.
/// Entries whose code comes out empty are skipped and the rest still render.
pub fn emit_block(tree: &ActionTree, ids: &[InstanceId], indent: usize, kind: BlockKind) -> String {
    match kind {
        BlockKind::Conditions => condition_parts(tree, ids).join(" "),
        BlockKind::Actions => {
            let mut lines = Vec::new();
            emit_actions(tree, ids, indent, 0, &mut lines);
            lines.join("\n")
        }
    }
}

/// Every condition expression under `ids`, in pre-order, each already
/// wrapped in parentheses.
pub fn condition_parts(tree: &ActionTree, ids: &[InstanceId]) -> Vec<String> {
    let mut parts = Vec::new();
    collect_conditions(tree, ids, &mut parts, 0);
    parts
}

/// Joins already-parenthesized parts with the logic operator. No parts
/// means the condition always holds.
pub fn combine_conditions(parts: &[String], logic: ConditionLogic) -> String {
    if parts.is_empty() {
        return "true".to_string();
    }
    parts.join(&format!(" {} ", logic.operator()))
}

fn is_sentinel(tree: &ActionTree, id: InstanceId) -> bool {
    tree.is_root(id) || tree.get(id).is_some_and(|node| node.descriptor().is_root())
}

fn collect_conditions(tree: &ActionTree, ids: &[InstanceId], parts: &mut Vec<String>, depth: usize) {
    if depth > tree.len() {
        return;
    }
    for id in ids {
        if !is_sentinel(tree, *id) {
            let code = resolve_code(tree, *id);
            if code.trim().is_empty() {
                debug!(instance = %id, "condition has no code, skipped");
            } else {
                parts.push(format!("({code})"));
            }
        }
        collect_conditions(tree, tree.children(*id), parts, depth + 1);
    }
}

fn emit_actions(
    tree: &ActionTree,
    ids: &[InstanceId],
    indent: usize,
    depth: usize,
    lines: &mut Vec<String>,
) {
    // No path in a well-formed tree is longer than the arena.
    if depth > tree.len() {
        return;
    }
    let pad = INDENT_UNIT.repeat(indent);

    for id in ids {
        let id = *id;
        if is_sentinel(tree, id) {
            emit_actions(tree, tree.children(id), indent, depth + 1, lines);
            continue;
        }
        let Some(node) = tree.get(id) else {
            debug!(instance = %id, "action missing from tree, skipped");
            continue;
        };

        let code = resolve_code(tree, id);
        if code.trim().is_empty() {
            debug!(
                instance = %id,
                action = %node.descriptor().name,
                "action has no code, skipped with its body"
            );
            continue;
        }

        if node.descriptor().has_body {
            lines.push(format!("{pad}{code}"));
            lines.push(format!("{pad}{{"));
            emit_actions(tree, node.children(), indent + 1, depth + 1, lines);
            lines.push(format!("{pad}}}"));
        } else {
            lines.push(terminated(&pad, &code));
            emit_actions(tree, node.children(), indent, depth + 1, lines);
        }
    }
}

fn terminated(pad: &str, code: &str) -> String {
    let trimmed = code.trim_end();
    if trimmed.ends_with('}') || trimmed.ends_with('{') {
        format!("{pad}{code}")
    } else {
        format!("{pad}{code};")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionDescriptor;
    use crate::model::SelectionValue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn statement(name: &str, code: &str) -> Arc<ActionDescriptor> {
        Arc::new(ActionDescriptor::new(name).with_display(name).with_code(code))
    }

    fn attach(tree: &mut ActionTree, parent: InstanceId, descriptor: Arc<ActionDescriptor>) -> InstanceId {
        let id = tree.insert_detached(descriptor);
        tree.append_child(parent, id).expect("parent hosts children");
        id
    }

    #[test]
    fn root_is_skipped_and_its_children_emitted() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        attach(&mut tree, root, statement("A", "DoA()"));
        attach(&mut tree, root, statement("B", "DoB()"));

        assert_eq!(
            emit_block(&tree, &[root], 1, BlockKind::Actions),
            "    DoA();\n    DoB();"
        );
    }

    #[test]
    fn body_actions_wrap_their_children_in_braces() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        let block = attach(
            &mut tree,
            root,
            Arc::new(
                ActionDescriptor::new("If")
                    .with_code("if ({0})")
                    .with_parameter("Boolean", "condition")
                    .with_body(),
            ),
        );
        tree.fill_slot(block, 0, SelectionValue::literal("ready", "Boolean"))
            .expect("slot fills");
        attach(&mut tree, block, statement("Log", "Log(\"hi\")"));
        attach(&mut tree, root, statement("End", "End()"));

        assert_eq!(
            emit_block(&tree, tree.root_children(), 0, BlockKind::Actions),
            "if (ready)\n{\n    Log(\"hi\");\n}\nEnd();"
        );
    }

    #[test]
    fn only_code_whose_last_char_is_a_brace_skips_the_terminator() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        attach(&mut tree, root, statement("Lambda", "Run(() => {})"));
        attach(&mut tree, root, statement("Block", "{ Tick(); }"));
        attach(&mut tree, root, statement("Open", "do {  "));

        assert_eq!(
            emit_block(&tree, tree.root_children(), 0, BlockKind::Actions),
            "Run(() => {});\n{ Tick(); }\ndo {  "
        );
    }

    #[test]
    fn non_body_children_follow_at_the_same_level() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        let flat = tree.insert_detached(Arc::new({
            let mut descriptor = ActionDescriptor::new("Flat").with_code("Flat()");
            descriptor.can_add_child = true;
            descriptor
        }));
        tree.append_child(root, flat).expect("root hosts children");
        attach(&mut tree, flat, statement("After", "After()"));

        let text = emit_block(&tree, &[flat], 2, BlockKind::Actions);
        assert_eq!(text, "        Flat();\n        After();");
    }

    #[test]
    fn malformed_entry_is_skipped_and_the_rest_emitted_in_order() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        attach(&mut tree, root, statement("First", "First()"));
        attach(&mut tree, root, Arc::new(ActionDescriptor::unresolved("Broken")));
        attach(&mut tree, root, statement("Second", "Second()"));

        let text = emit_block(&tree, tree.root_children(), 0, BlockKind::Actions);
        assert_eq!(text.lines().count(), 2);
        assert_eq!(text, "First();\nSecond();");
    }

    #[test]
    fn conditions_are_parenthesized_and_space_joined() {
        let mut tree = ActionTree::new();
        let root = tree.root();
        attach(&mut tree, root, statement("Ready", "IsReady()"));
        attach(&mut tree, root, statement("Rich", "Money > 10"));

        assert_eq!(
            emit_block(&tree, &[root], 0, BlockKind::Conditions),
            "(IsReady()) (Money > 10)"
        );
        let parts = condition_parts(&tree, &[root]);
        assert_eq!(combine_conditions(&parts, ConditionLogic::And), "(IsReady()) && (Money > 10)");
        assert_eq!(combine_conditions(&parts, ConditionLogic::Or), "(IsReady()) || (Money > 10)");
    }

    #[test]
    fn no_conditions_means_true() {
        assert_eq!(combine_conditions(&[], ConditionLogic::Or), "true");
    }

    #[test]
    fn condition_logic_parses_loosely_and_serializes_upper() {
        assert_eq!(ConditionLogic::parse(" or "), Some(ConditionLogic::Or));
        assert_eq!(ConditionLogic::parse("xor"), None);
        let json = serde_json::to_string(&ConditionLogic::And).expect("logic serializes");
        assert_eq!(json, "\"AND\"");
    }
}
