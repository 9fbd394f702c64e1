//! Reified pattern hierarchy.
//!
//! Documents describe their tree only through path strings
//! (`grouppath`, `shapepath`, `parentpath`). [`PatternTree`] resolves those
//! strings once into nodes with explicit parent/child links, so nothing
//! downstream has to re-parse paths or can disagree about the nesting.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`] (an index
//! into it). Node 0 is always the implicit root.
//!
//! ## Rust Lesson #26: Indices instead of pointers
//!
//! A tree where children point at parents and parents at children is a
//! cycle of references - painful with Rust's ownership rules. Storing nodes
//! in a flat `Vec` and linking them by index sidesteps the problem entirely:
//! the `Vec` owns everything, and an index is just a number.

use std::collections::HashMap;

use log::trace;

use crate::model::PatternData;
use crate::path;
use crate::validate::{Reference, ValidationError};

/// Index of a node in a [`PatternTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// What a node stands for. Group and shape variants hold the position of
/// the record in `PatternData::groups` / `PatternData::shapes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Group(usize),
    Shape(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Normalized path (empty for the root).
    pub path: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Parent/child index structure over a document's groups and shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTree {
    nodes: Vec<Node>,
    by_path: HashMap<String, NodeId>,
    by_shape_index: HashMap<usize, NodeId>,
    group_nodes: Vec<NodeId>,
    shape_nodes: Vec<NodeId>,
}

impl PatternTree {
    /// Resolve the paths of `doc` into a tree.
    ///
    /// Structural defects (duplicate paths or shape indices, wrong depths,
    /// shapes whose parent is not a group) are pushed onto `errors`; the
    /// tree is still built so later checks can run. Duplicates keep their
    /// own node but only the first owner of a path is found by lookup, and
    /// shapes with a dangling parent hang off the root.
    pub(crate) fn build(doc: &PatternData, errors: &mut Vec<ValidationError>) -> Self {
        let mut tree = PatternTree {
            nodes: vec![Node {
                kind: NodeKind::Root,
                path: String::new(),
                parent: None,
                children: Vec::new(),
            }],
            by_path: HashMap::new(),
            by_shape_index: HashMap::new(),
            group_nodes: Vec::with_capacity(doc.groups.len()),
            shape_nodes: Vec::with_capacity(doc.shapes.len()),
        };

        // Pass 1: register every path so lookups see the whole document.
        for (pos, group) in doc.groups.iter().enumerate() {
            let id = tree.register(NodeKind::Group(pos), &group.grouppath, errors);
            tree.group_nodes.push(id);
        }
        for (pos, shape) in doc.shapes.iter().enumerate() {
            let id = tree.register(NodeKind::Shape(pos), &shape.shapepath, errors);
            tree.shape_nodes.push(id);
            if tree.by_shape_index.contains_key(&shape.shapeindex) {
                errors.push(ValidationError::DuplicateShapeIndex(shape.shapeindex));
            } else {
                tree.by_shape_index.insert(shape.shapeindex, id);
            }
        }

        // Pass 2: link groups under their nearest ancestor group.
        for (pos, group) in doc.groups.iter().enumerate() {
            let id = tree.group_nodes[pos];
            let node_path = tree.nodes[id.0].path.clone();
            if let (Some(expected), Some(found)) = (path::group_depth(&node_path), group.depth) {
                if expected != found {
                    errors.push(ValidationError::DepthMismatch {
                        path: display_path(&node_path),
                        expected,
                        found,
                    });
                }
            }
            let parent = tree.nearest_group_ancestor(&node_path);
            tree.link(parent, id);
        }

        // Pass 3: shapes hang off the group named by their parentpath, which
        // must also be the parent of their own path.
        for (pos, shape) in doc.shapes.iter().enumerate() {
            let id = tree.shape_nodes[pos];
            let parent_path = path::normalize(&shape.parentpath);
            let parent = if parent_path.is_empty() {
                Some(tree.root())
            } else {
                tree.by_path
                    .get(&parent_path)
                    .copied()
                    .filter(|p| matches!(tree.nodes[p.0].kind, NodeKind::Group(_)))
            };
            let parent = match parent {
                Some(parent) => {
                    let own_path = &tree.nodes[id.0].path;
                    if path::parent(own_path).as_deref() != Some(parent_path.as_str()) {
                        errors.push(ValidationError::ShapePathMismatch {
                            shape: display_path(own_path),
                            parent: display_path(&parent_path),
                        });
                    }
                    parent
                }
                None => {
                    errors.push(ValidationError::DanglingReference(Reference::Path(
                        display_path(&parent_path),
                    )));
                    tree.root()
                }
            };
            tree.link(parent, id);
        }

        trace!("built pattern tree with {} nodes", tree.nodes.len());
        tree
    }

    fn register(&mut self, kind: NodeKind, raw_path: &str, errors: &mut Vec<ValidationError>) -> NodeId {
        let normalized = path::normalize(raw_path);
        let id = NodeId(self.nodes.len());
        if normalized.is_empty() || self.by_path.contains_key(&normalized) {
            errors.push(ValidationError::DuplicatePath(display_path(&normalized)));
        } else {
            self.by_path.insert(normalized.clone(), id);
        }
        self.nodes.push(Node {
            kind,
            path: normalized,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn nearest_group_ancestor(&self, node_path: &str) -> NodeId {
        let mut current = path::parent(node_path);
        while let Some(candidate) = current {
            if candidate.is_empty() {
                break;
            }
            if let Some(&id) = self.by_path.get(&candidate) {
                if matches!(self.nodes[id.0].kind, NodeKind::Group(_)) {
                    return id;
                }
            }
            current = path::parent(&candidate);
        }
        self.root()
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the root: a document with no groups or shapes.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Look a node up by path (any spelling that normalizes the same).
    pub fn find(&self, raw_path: &str) -> Option<NodeId> {
        let normalized = path::normalize(raw_path);
        if normalized.is_empty() {
            return Some(self.root());
        }
        self.by_path.get(&normalized).copied()
    }

    /// Node of the group at position `pos` in `PatternData::groups`.
    pub fn group_node(&self, pos: usize) -> Option<NodeId> {
        self.group_nodes.get(pos).copied()
    }

    /// Node of the shape with the given `shapeindex`.
    pub fn shape_node(&self, shapeindex: usize) -> Option<NodeId> {
        self.by_shape_index.get(&shapeindex).copied()
    }

    /// Position in `PatternData::shapes` of the shape with `shapeindex`.
    pub fn shape_position(&self, shapeindex: usize) -> Option<usize> {
        match self.shape_node(shapeindex).map(|id| self.nodes[id.0].kind) {
            Some(NodeKind::Shape(pos)) => Some(pos),
            _ => None,
        }
    }

    /// Nesting depth below the root (top-level nodes are at 0).
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == self.root() {
                break;
            }
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    /// Shape positions anywhere below `id`, in depth-first order.
    pub fn descendant_shapes(&self, id: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current.0];
            if let NodeKind::Shape(pos) = node.kind {
                out.push(pos);
            }
            // reversed so the leftmost child is visited first
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}

/// Paths in messages: the root reads as "/" rather than an empty string.
pub(crate) fn display_path(normalized: &str) -> String {
    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized.to_string()
    }
}
