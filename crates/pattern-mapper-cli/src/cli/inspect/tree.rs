//! Hierarchy view of a validated pattern.

use pattern_mapper::{path, NodeId, ValidatedPattern};

use super::types::TreeNode;

/// Build the hierarchy view, cutting off below `max_depth` levels.
pub fn build_tree(pattern: &ValidatedPattern, max_depth: Option<usize>) -> TreeNode {
    let name = pattern
        .document()
        .name
        .clone()
        .unwrap_or_else(|| "pattern".to_string());
    build_tree_node(
        pattern,
        pattern.tree().root(),
        name,
        0,
        max_depth.unwrap_or(usize::MAX),
    )
}

fn build_tree_node(
    pattern: &ValidatedPattern,
    id: NodeId,
    name: String,
    current_depth: usize,
    max_depth: usize,
) -> TreeNode {
    let tree = pattern.tree();
    let node = tree.node(id);
    let shape_count = tree.descendant_shapes(id).len();
    let mut children = Vec::new();

    if current_depth < max_depth {
        // Shapes named after their position add nothing; count them instead.
        let mut unnamed = 0;
        for &child in tree.children(id) {
            if let Some(group) = pattern.group(child) {
                // Overlay groups hold no nodes of their own; the group view lists them.
                if path::is_overlay(&group.grouppath) {
                    continue;
                }
                children.push(build_tree_node(
                    pattern,
                    child,
                    group.groupname.clone(),
                    current_depth + 1,
                    max_depth,
                ));
            } else if let Some(shape) = pattern.shape(child) {
                if shape.shapename.is_empty() || shape.shapename.starts_with('_') {
                    unnamed += 1;
                } else {
                    children.push(TreeNode {
                        name: shape.shapename.clone(),
                        path: Some(tree.node(child).path.clone()),
                        shape_count: 0,
                        children: vec![],
                    });
                }
            }
        }
        if unnamed > 0 {
            children.push(summary_node(unnamed));
        }
    } else if shape_count > 0 {
        children.push(summary_node(shape_count));
    }

    TreeNode {
        name,
        path: (!node.path.is_empty()).then(|| node.path.clone()),
        shape_count,
        children,
    }
}

fn summary_node(count: usize) -> TreeNode {
    TreeNode {
        name: format!("({} shapes)", count),
        path: None,
        shape_count: count,
        children: vec![],
    }
}

/// Render tree in human-readable text format.
pub fn render_tree_text(node: &TreeNode, indent: usize, is_last: bool, prefix: &str) -> String {
    let mut output = String::new();

    let connector = if indent == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };

    output.push_str(&format!("{}{}{}\n", prefix, connector, label(node)));

    let child_prefix = if indent == 0 {
        String::new()
    } else {
        format!("{}{}   ", prefix, if is_last { " " } else { "│" })
    };

    let child_count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        output.push_str(&render_tree_text(
            child,
            indent + 1,
            i == child_count - 1,
            &child_prefix,
        ));
    }

    output
}

/// Indented rendering without box-drawing characters.
pub fn render_tree_compact(node: &TreeNode, indent: usize) -> String {
    let mut output = format!("{}{}\n", "  ".repeat(indent), label(node));
    for child in &node.children {
        output.push_str(&render_tree_compact(child, indent + 1));
    }
    output
}

fn label(node: &TreeNode) -> String {
    if node.shape_count > 0 && !node.name.starts_with('(') {
        format!("{} ({})", node.name, node.shape_count)
    } else {
        node.name.clone()
    }
}
