//! Property tests for document validation and path handling.

use proptest::prelude::*;
use proptest::sample::Index;

use pattern_mapper::path;
use pattern_mapper::{
    diagnose, validate, GroupInfo, PatternData, SequenceStep, ShapeInfo, ValidationError,
};

/// Build a consistent document: group `i` hangs under the root or an
/// earlier group, shapes hang under the root or any group, every group
/// lists the shapes in its subtree and orders them in steps of two.
fn build(group_parents: &[Index], shape_parents: &[Index], with_depth: bool) -> PatternData {
    let mut group_paths: Vec<String> = Vec::new();
    for (i, choice) in group_parents.iter().enumerate() {
        let parent = match choice.index(i + 1) {
            0 => String::new(),
            j => group_paths[j - 1].clone(),
        };
        group_paths.push(path::join(&parent, &format!("g{}", i)));
    }

    let shapes: Vec<ShapeInfo> = shape_parents
        .iter()
        .enumerate()
        .map(|(k, choice)| {
            let parent = match choice.index(group_paths.len() + 1) {
                0 => String::new(),
                j => group_paths[j - 1].clone(),
            };
            // sparse, out-of-order indices
            ShapeInfo::new(k * 3 + 1, format!("s{}", k), path::join(&parent, &format!("s{}", k)))
                .with_parent(parent)
        })
        .collect();

    let groups = group_paths
        .iter()
        .map(|group_path| {
            let members: Vec<usize> = shapes
                .iter()
                .filter(|s| path::is_within(&s.parentpath, group_path))
                .map(|s| s.shapeindex)
                .collect();
            let chunks: Vec<&[usize]> = members.chunks(2).collect();
            let n = chunks.len();
            // steps listed in reverse order of their index
            let steps = chunks
                .iter()
                .enumerate()
                .map(|(i, chunk)| SequenceStep::new(n - 1 - i, chunk.to_vec()))
                .collect();
            GroupInfo {
                depth: if with_depth { path::group_depth(group_path) } else { None },
                shapeindices: members,
                sequencesteps: steps,
                ..GroupInfo::new(group_path.clone(), group_path.clone())
            }
        })
        .collect();

    PatternData {
        shapes,
        groups,
        ..Default::default()
    }
}

fn arb_pattern() -> impl Strategy<Value = PatternData> {
    (
        prop::collection::vec(any::<Index>(), 0..6),
        prop::collection::vec(any::<Index>(), 0..12),
        any::<bool>(),
    )
        .prop_map(|(groups, shapes, with_depth)| build(&groups, &shapes, with_depth))
}

proptest! {
    #[test]
    fn consistent_documents_validate(doc in arb_pattern()) {
        let validated = validate(doc.clone());
        prop_assert!(validated.is_ok(), "{:?}", validated.err());
        prop_assert!(diagnose(&doc).is_empty());
    }

    #[test]
    fn validation_is_idempotent(doc in arb_pattern()) {
        let first = validate(doc).unwrap();
        let second = validate(first.clone().into_inner()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tree_mirrors_parent_paths(doc in arb_pattern()) {
        let validated = validate(doc).unwrap();
        let tree = validated.tree();
        for shape in &validated.document().shapes {
            let node = tree.shape_node(shape.shapeindex).unwrap();
            let parent = tree.parent(node).unwrap();
            prop_assert_eq!(&tree.node(parent).path, &path::normalize(&shape.parentpath));
        }
        let all = tree.descendant_shapes(tree.root());
        prop_assert_eq!(all.len(), validated.document().shapes.len());
    }

    #[test]
    fn duplicate_shape_path_is_reported(doc in arb_pattern(), pick in any::<(Index, Index)>()) {
        prop_assume!(doc.shapes.len() >= 2);
        let mut doc = doc;
        let a = pick.0.index(doc.shapes.len());
        let mut b = pick.1.index(doc.shapes.len());
        if a == b {
            b = (a + 1) % doc.shapes.len();
        }
        let stolen = doc.shapes[a].shapepath.clone();
        doc.shapes[b].shapepath = stolen.clone();

        prop_assert_eq!(validate(doc).unwrap_err(), ValidationError::DuplicatePath(stolen));
    }

    #[test]
    fn relocated_shape_path_is_reported(doc in arb_pattern(), pick in any::<Index>()) {
        prop_assume!(!doc.shapes.is_empty());
        let mut doc = doc;
        let idx = pick.index(doc.shapes.len());
        let shape = &mut doc.shapes[idx];
        let moved = path::join("/moved", &shape.shapename);
        shape.shapepath = moved.clone();
        let parent = match path::normalize(&shape.parentpath) {
            p if p.is_empty() => "/".to_string(),
            p => p,
        };

        prop_assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::ShapePathMismatch { shape: moved, parent }
        );
    }

    #[test]
    fn renumbered_step_leaves_a_gap(doc in arb_pattern(), pick in any::<(Index, Index)>()) {
        let sequenced: Vec<usize> = doc
            .groups
            .iter()
            .enumerate()
            .filter(|(_, g)| !g.sequencesteps.is_empty())
            .map(|(i, _)| i)
            .collect();
        prop_assume!(!sequenced.is_empty());

        let mut doc = doc;
        let group = &mut doc.groups[sequenced[pick.0.index(sequenced.len())]];
        let n = group.sequencesteps.len();
        let step = &mut group.sequencesteps[pick.1.index(n)];
        let missing = step.sequenceindex;
        step.sequenceindex = n + 5;
        let group_path = path::normalize(&group.grouppath);

        prop_assert_eq!(
            validate(doc).unwrap_err(),
            ValidationError::SequenceGap { group: group_path, missing }
        );
    }

    #[test]
    fn normalize_is_idempotent(raw in "[/a-c]{0,12}") {
        let once = path::normalize(&raw);
        prop_assert_eq!(path::normalize(&once), once.clone());
        prop_assert!(!once.ends_with('/'));
        if let Some(parent) = path::parent(&raw) {
            prop_assert!(path::is_within(&raw, &parent));
            prop_assert_eq!(path::segment_count(&parent) + 1, path::segment_count(&raw));
        }
    }
}
