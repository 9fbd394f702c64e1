//! Structural validation of pattern documents.
//!
//! A [`PatternData`] straight from JSON can contain anything. [`validate`]
//! checks the invariants that the rest of the crate relies on and, when they
//! hold, hands back a [`ValidatedPattern`] that owns the document together
//! with its resolved [`PatternTree`]. Code that takes a `ValidatedPattern`
//! never re-checks.
//!
//! Checks run in a fixed order and [`validate`] reports the first failure:
//!
//! 1. group and shape paths are unique (one namespace, root included)
//! 2. shape indices are unique
//! 3. a group's explicit `depth` matches its path
//! 4. a shape's `parentpath` is the root or an existing group, and is the
//!    parent of the shape's own path
//! 5. every index in a group or step `shapeindices` names a shape
//! 6. a group's member shapes live at or below the group (for an overlay
//!    group, below the container it belongs to)
//! 7. a group's step indices are exactly `0..N-1`
//!
//! [`diagnose`] runs the same checks and returns every failure.

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::model::{GroupInfo, PatternData, ShapeInfo};
use crate::path;
use crate::tree::{display_path, NodeId, NodeKind, PatternTree};

/// Something a document points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Path(String),
    ShapeIndex(usize),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Path(p) => write!(f, "path '{}'", p),
            Reference::ShapeIndex(i) => write!(f, "shape index {}", i),
        }
    }
}

/// A broken document invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate path '{0}'")]
    DuplicatePath(String),

    #[error("duplicate shape index {0}")]
    DuplicateShapeIndex(usize),

    #[error("dangling reference to {0}")]
    DanglingReference(Reference),

    #[error("shape '{shape}' is not a direct child of its parent '{parent}'")]
    ShapePathMismatch { shape: String, parent: String },

    #[error("group '{group}' lists shape {shape_index}, which lives outside it")]
    MisplacedShape { group: String, shape_index: usize },

    #[error("group '{group}' has no sequence step {missing}")]
    SequenceGap { group: String, missing: usize },

    #[error("group '{path}' has depth {found}, expected {expected}")]
    DepthMismatch {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// A document that passed [`validate`], with its resolved hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPattern {
    data: PatternData,
    tree: PatternTree,
}

/// Check every invariant and return the first violation, if any.
pub fn validate(doc: PatternData) -> Result<ValidatedPattern, ValidationError> {
    let (tree, errors) = check(&doc);
    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }
    debug!(
        "validated pattern: {} shapes, {} groups",
        doc.shapes.len(),
        doc.groups.len()
    );
    Ok(ValidatedPattern { data: doc, tree })
}

/// Every invariant violation in `doc`, in check order.
pub fn diagnose(doc: &PatternData) -> Vec<ValidationError> {
    check(doc).1
}

fn check(doc: &PatternData) -> (PatternTree, Vec<ValidationError>) {
    let mut errors = Vec::new();

    // 1-4 are found while resolving paths
    let tree = PatternTree::build(doc, &mut errors);
    order_structural(&mut errors);

    // 5
    for group in &doc.groups {
        let step_indices = group.sequencesteps.iter().flat_map(|s| &s.shapeindices);
        for &index in group.shapeindices.iter().chain(step_indices) {
            if tree.shape_node(index).is_none() {
                errors.push(ValidationError::DanglingReference(Reference::ShapeIndex(index)));
            }
        }
    }

    // 6
    for group in &doc.groups {
        let group_path = path::normalize(&group.grouppath);
        let scope = path::scope(&group_path);
        for &index in &group.shapeindices {
            let Some(shape) = tree.shape_position(index).map(|pos| &doc.shapes[pos]) else {
                continue;
            };
            if !path::is_within(&shape.parentpath, &scope) {
                errors.push(ValidationError::MisplacedShape {
                    group: display_path(&group_path),
                    shape_index: index,
                });
            }
        }
    }

    // 7
    for group in &doc.groups {
        if let Some(missing) = first_missing_step(group) {
            errors.push(ValidationError::SequenceGap {
                group: display_path(&path::normalize(&group.grouppath)),
                missing,
            });
        }
    }

    (tree, errors)
}

/// Tree building reports defects as it meets them; sort them into check
/// order (stable, so document order holds within each kind).
fn order_structural(errors: &mut [ValidationError]) {
    errors.sort_by_key(|e| match e {
        ValidationError::DuplicatePath(_) => 0,
        ValidationError::DuplicateShapeIndex(_) => 1,
        ValidationError::DepthMismatch { .. } => 2,
        _ => 3,
    });
}

/// Smallest index in `0..N` with no step, where N is the step count.
///
/// A duplicated index necessarily leaves some slot empty, so it surfaces
/// here as well.
fn first_missing_step(group: &GroupInfo) -> Option<usize> {
    let n = group.sequencesteps.len();
    let mut seen = vec![false; n];
    for step in &group.sequencesteps {
        if step.sequenceindex < n {
            seen[step.sequenceindex] = true;
        }
    }
    seen.iter().position(|&present| !present)
}

impl ValidatedPattern {
    pub fn document(&self) -> &PatternData {
        &self.data
    }

    pub fn tree(&self) -> &PatternTree {
        &self.tree
    }

    pub fn into_inner(self) -> PatternData {
        self.data
    }

    /// Group record behind a tree node.
    pub fn group(&self, id: NodeId) -> Option<&GroupInfo> {
        match self.tree.node(id).kind {
            NodeKind::Group(pos) => self.data.groups.get(pos),
            _ => None,
        }
    }

    /// Shape record behind a tree node.
    pub fn shape(&self, id: NodeId) -> Option<&ShapeInfo> {
        match self.tree.node(id).kind {
            NodeKind::Shape(pos) => self.data.shapes.get(pos),
            _ => None,
        }
    }

    /// For every shape in the document (by position), the first step of
    /// `group` that produces it, or `None` when the steps don't mention it.
    pub fn shape_sequence_indices(&self, group: &GroupInfo) -> Vec<Option<usize>> {
        let mut out = vec![None; self.data.shapes.len()];
        for step in &group.sequencesteps {
            for &index in &step.shapeindices {
                if let Some(slot) = self.tree.shape_position(index).map(|pos| &mut out[pos]) {
                    slot.get_or_insert(step.sequenceindex);
                }
            }
        }
        out
    }

    /// Groups in document order, each with its tree node.
    pub fn groups(&self) -> impl Iterator<Item = (NodeId, &GroupInfo)> {
        self.data
            .groups
            .iter()
            .enumerate()
            .filter_map(|(pos, g)| self.tree.group_node(pos).map(|id| (id, g)))
    }
}

impl AsRef<PatternData> for ValidatedPattern {
    fn as_ref(&self) -> &PatternData {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SequenceStep;

    /// `/root` holding `/root/a` holding shape 0; shape 1 directly in `/root`.
    fn valid_doc() -> PatternData {
        let mut root = GroupInfo::new("root", "/root");
        root.depth = Some(0);
        root.shapeindices = vec![0, 1];
        root.sequencesteps = vec![SequenceStep::new(1, vec![0]), SequenceStep::new(0, vec![1])];

        let mut a = GroupInfo::new("a", "/root/a");
        a.depth = Some(1);
        a.shapeindices = vec![0];
        a.sequencesteps = vec![SequenceStep::new(0, vec![0])];

        PatternData {
            groups: vec![root, a],
            shapes: vec![
                ShapeInfo::new(0, "s1", "/root/a/s1").with_parent("/root/a"),
                ShapeInfo::new(1, "s2", "/root/s2").with_parent("/root"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn accepts_well_formed_document() {
        let doc = valid_doc();
        let validated = validate(doc.clone()).unwrap();
        assert_eq!(validated.document(), &doc);

        let a = validated.tree().find("/root/a").unwrap();
        assert_eq!(validated.group(a).unwrap().groupname, "a");
        let s1 = validated.tree().children(a)[0];
        assert_eq!(validated.shape(s1).unwrap().shapename, "s1");
        assert_eq!(validated.groups().count(), 2);
        assert_eq!(validated.into_inner(), doc);
    }

    #[test]
    fn empty_document_is_valid() {
        let validated = validate(PatternData::default()).unwrap();
        assert!(validated.tree().is_empty());
    }

    #[test]
    fn dangling_parent_path() {
        let mut doc = valid_doc();
        doc.shapes[1].parentpath = "/root/b".into();
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DanglingReference(Reference::Path("/root/b".into()))
        );
    }

    #[test]
    fn parent_must_be_a_group() {
        let mut doc = valid_doc();
        doc.shapes[1].parentpath = "/root/a/s1".into();
        assert!(matches!(
            validate(doc).unwrap_err(),
            ValidationError::DanglingReference(Reference::Path(_))
        ));
    }

    #[test]
    fn duplicate_shape_path() {
        let mut doc = valid_doc();
        doc.shapes[1].shapepath = "root/a/s1/".into();
        doc.shapes[1].parentpath = "/root/a".into();
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DuplicatePath("/root/a/s1".into())
        );
    }

    #[test]
    fn group_and_shape_share_namespace() {
        let mut doc = valid_doc();
        doc.shapes[1].shapepath = "/root/a".into();
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DuplicatePath("/root/a".into())
        );
    }

    #[test]
    fn sequence_gap_names_smallest_missing() {
        let mut doc = valid_doc();
        doc.groups[0].sequencesteps[1].sequenceindex = 2;
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::SequenceGap {
                group: "/root".into(),
                missing: 0
            }
        );
    }

    #[test]
    fn duplicate_step_index_is_a_gap() {
        let mut doc = valid_doc();
        doc.groups[0].sequencesteps[1].sequenceindex = 1;
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::SequenceGap {
                group: "/root".into(),
                missing: 0
            }
        );
    }

    #[test]
    fn depth_mismatch() {
        let mut doc = valid_doc();
        doc.groups[1].depth = Some(2);
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DepthMismatch {
                path: "/root/a".into(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn unknown_shape_index_in_step() {
        let mut doc = valid_doc();
        doc.groups[1].sequencesteps[0].shapeindices.push(7);
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DanglingReference(Reference::ShapeIndex(7))
        );
    }

    #[test]
    fn member_outside_group() {
        let mut doc = valid_doc();
        doc.groups[1].shapeindices.push(1);
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::MisplacedShape {
                group: "/root/a".into(),
                shape_index: 1
            }
        );
    }

    #[test]
    fn shape_path_must_sit_under_its_parent() {
        let mut doc = valid_doc();
        doc.shapes[0].shapepath = "/elsewhere/s1".into();
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::ShapePathMismatch {
                shape: "/elsewhere/s1".into(),
                parent: "/root/a".into()
            }
        );

        // nested deeper than the parent is just as wrong
        let mut doc = valid_doc();
        doc.shapes[1].shapepath = "/root/a/x/s2".into();
        assert!(matches!(
            validate(doc).unwrap_err(),
            ValidationError::ShapePathMismatch { .. }
        ));
    }

    #[test]
    fn gap_in_zero_one_three() {
        let mut doc = valid_doc();
        doc.groups[0].sequencesteps = vec![
            SequenceStep::new(0, vec![0]),
            SequenceStep::new(1, vec![1]),
            SequenceStep::new(3, vec![]),
        ];
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::SequenceGap {
                group: "/root".into(),
                missing: 2
            }
        );
    }

    #[test]
    fn unknown_shape_index_in_members() {
        let mut doc = valid_doc();
        doc.groups[0].shapeindices.push(9);
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::DanglingReference(Reference::ShapeIndex(9))
        );
    }

    #[test]
    fn overlay_members_may_come_from_anywhere_in_its_container() {
        let mut doc = valid_doc();
        let mut overlay = GroupInfo::new("red", "/root/#red");
        overlay.depth = Some(1);
        overlay.shapeindices = vec![0, 1];
        overlay.sequencesteps = vec![SequenceStep::new(0, vec![0, 1])];
        doc.groups.push(overlay);
        let validated = validate(doc.clone()).unwrap();
        let node = validated.tree().find("/root/#red").unwrap();
        assert_eq!(validated.tree().parent(node), validated.tree().find("/root"));

        // but not from outside it
        doc.groups[2].grouppath = "/root/a/#red".into();
        doc.groups[2].depth = Some(2);
        assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::MisplacedShape {
                group: "/root/a/#red".into(),
                shape_index: 1
            }
        );
    }

    #[test]
    fn first_error_follows_check_order() {
        let mut doc = valid_doc();
        doc.groups[0].sequencesteps.clear();
        doc.groups[0].sequencesteps.push(SequenceStep::new(3, vec![]));
        doc.groups[1].depth = Some(5);
        doc.shapes[1].shapeindex = 0;

        let all = diagnose(&doc);
        assert!(matches!(all[0], ValidationError::DuplicateShapeIndex(0)));
        assert!(matches!(all[1], ValidationError::DepthMismatch { .. }));
        assert!(matches!(all.last(), Some(ValidationError::SequenceGap { .. })));
        assert_eq!(validate(doc).unwrap_err(), all[0]);
    }

    #[test]
    fn sequence_index_per_shape() {
        let validated = validate(valid_doc()).unwrap();
        let root = &validated.document().groups[0];
        assert_eq!(validated.shape_sequence_indices(root), vec![Some(1), Some(0)]);

        let a = &validated.document().groups[1];
        assert_eq!(validated.shape_sequence_indices(a), vec![Some(0), None]);
    }

    #[test]
    fn messages_read_naturally() {
        let err = ValidationError::DanglingReference(Reference::Path("/root/b".into()));
        assert_eq!(err.to_string(), "dangling reference to path '/root/b'");
        let err = ValidationError::SequenceGap {
            group: "/g".into(),
            missing: 2,
        };
        assert_eq!(err.to_string(), "group '/g' has no sequence step 2");
    }
}
