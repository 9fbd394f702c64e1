//! Sequence and group inference from shape attributes.
//!
//! Artists encode the build order of a group by shading: shapes sharing a
//! brightness (HSV value) come up together, darker first. More generally a
//! group can be sequenced by any [`SequenceByAttr`]: color channels,
//! position or distance from the origin.
//!
//! [`color_groups`] goes one step further and finds the groups themselves:
//! every distinct hue/saturation pair is one group, sequenced by value.

use std::collections::HashMap;

use crate::model::{GroupInfo, InferredValue, SequenceStep, ShapeInfo};
use crate::path::{self, OverlayPaths};
use crate::settings::{SequenceByAttr, SequenceBySpec};

/// Inference type of groups built by [`color_groups`].
pub const HUE_SAT_VALUE: &str = "HS:V";

/// The attribute of a shape that a sequence can be ordered by.
pub fn attribute_value(shape: &ShapeInfo, attr: SequenceByAttr) -> Option<f64> {
    let center = || {
        shape
            .center
            .as_deref()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
    };
    match attr {
        SequenceByAttr::Red => shape.color.as_ref()?.rgb().map(|c| c[0]),
        SequenceByAttr::Green => shape.color.as_ref()?.rgb().map(|c| c[1]),
        SequenceByAttr::Blue => shape.color.as_ref()?.rgb().map(|c| c[2]),
        SequenceByAttr::Hue => shape.hsv_color().map(|(h, _, _)| h),
        SequenceByAttr::Saturation => shape.hsv_color().map(|(_, s, _)| s),
        SequenceByAttr::Value => shape.hsv_color().map(|(_, _, v)| v),
        SequenceByAttr::X => center().map(|(x, _)| x),
        SequenceByAttr::Y => center().map(|(_, y)| y),
        SequenceByAttr::Distance => center().map(|(x, y)| x.hypot(y)),
    }
}

/// Build sequence steps for a set of shapes, ordered by HSV value.
pub fn sequence_by_value(shapes: &[&ShapeInfo]) -> Vec<SequenceStep> {
    sequence_by(
        shapes,
        &SequenceBySpec {
            attr: SequenceByAttr::Value,
            rounddigits: None,
            reverse: None,
        },
    )
}

/// One step per distinct attribute level, lowest first (highest first with
/// `reverse`). Shapes without the attribute come up together in a final
/// step. A single level is one default step.
pub fn sequence_by(shapes: &[&ShapeInfo], spec: &SequenceBySpec) -> Vec<SequenceStep> {
    let all_indices: Vec<usize> = shapes.iter().map(|s| s.shapeindex).collect();

    let mut keyed = Vec::with_capacity(shapes.len());
    let mut unvalued = Vec::new();
    for shape in shapes {
        match attribute_value(shape, spec.attr) {
            Some(value) => keyed.push((round_to(value, spec.rounddigits), shape.shapeindex)),
            None => unvalued.push(shape.shapeindex),
        }
    }
    let reverse = spec.reverse.unwrap_or(false);
    keyed.sort_by(|a, b| {
        let by_level = if reverse { b.0.total_cmp(&a.0) } else { a.0.total_cmp(&b.0) };
        by_level.then(a.1.cmp(&b.1))
    });

    let mut levels: Vec<(Option<f64>, Vec<usize>)> = Vec::new();
    for (value, index) in keyed {
        match levels.last_mut() {
            Some((Some(level), members)) if *level == value => members.push(index),
            _ => levels.push((Some(value), vec![index])),
        }
    }
    if !unvalued.is_empty() {
        levels.push((None, unvalued));
    }

    if levels.len() <= 1 {
        let value = levels.first().and_then(|(v, _)| *v).map(InferredValue::Number);
        return vec![default_step(all_indices, value)];
    }

    levels
        .into_iter()
        .enumerate()
        .map(|(i, (value, members))| SequenceStep {
            isdefault: Some(false),
            inferredfromvalue: value.map(InferredValue::Number),
            ..SequenceStep::new(i, members)
        })
        .collect()
}

/// A single step holding every shape, for groups with no real order.
pub fn default_step(shapeindices: Vec<usize>, value: Option<InferredValue>) -> SequenceStep {
    SequenceStep {
        isdefault: Some(true),
        inferredfromvalue: value,
        ..SequenceStep::new(0, shapeindices)
    }
}

fn round_to(value: f64, digits: Option<u32>) -> f64 {
    match digits {
        Some(d) => {
            let factor = 10f64.powi(d.min(15) as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}

// ============================================================================
// COLOR GROUPS
// ============================================================================

/// One group per distinct hue/saturation pair, in order of first
/// appearance, each sequenced by value. Uncolored shapes are left out.
///
/// A group sits at an overlay path below the deepest container holding all
/// of its shapes, and is named after the innermost explicitly named
/// container on that path.
pub fn color_groups(shapes: &[ShapeInfo], paths: &mut OverlayPaths) -> Vec<GroupInfo> {
    let mut order: Vec<((f64, f64), Vec<&ShapeInfo>)> = Vec::new();
    let mut slots: HashMap<(u64, u64), usize> = HashMap::new();
    for shape in shapes {
        let Some((h, s, _)) = shape.hsv_color() else {
            continue;
        };
        let slot = *slots.entry((h.to_bits(), s.to_bits())).or_insert_with(|| {
            order.push(((h, s), Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(shape);
    }

    order
        .into_iter()
        .enumerate()
        .map(|(i, ((h, s), members))| {
            let ancestor = path::common_ancestor(members.iter().map(|m| m.parentpath.as_str()));
            let name = path::segments(&ancestor)
                .rev()
                .find(|segment| !segment.starts_with('_'))
                .map_or_else(|| format!("_{}", i), str::to_string);
            let grouppath = paths.claim(&ancestor, &format!("hs{}", i));
            GroupInfo {
                inferencetype: Some(HUE_SAT_VALUE.to_string()),
                inferredfromvalue: Some(InferredValue::List(vec![
                    InferredValue::Number(h),
                    InferredValue::Number(s),
                ])),
                depth: path::group_depth(&grouppath),
                shapeindices: members.iter().map(|m| m.shapeindex).collect(),
                sequencesteps: sequence_by_value(&members),
                ..GroupInfo::new(name, grouppath)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColorValue;

    fn shape(index: usize, rgb: Option<[u8; 3]>) -> ShapeInfo {
        ShapeInfo {
            color: rgb.map(ColorValue::from),
            ..ShapeInfo::new(index, format!("s{}", index), format!("/s{}", index))
        }
    }

    fn at(index: usize, x: f64, y: f64) -> ShapeInfo {
        ShapeInfo {
            center: Some(vec![x, y]),
            ..shape(index, None)
        }
    }

    fn indices(steps: &[SequenceStep]) -> Vec<Vec<usize>> {
        steps.iter().map(|s| s.shapeindices.clone()).collect()
    }

    #[test]
    fn orders_steps_by_brightness() {
        let shapes = [
            shape(0, Some([200, 0, 0])),
            shape(1, Some([100, 0, 0])),
            shape(2, Some([200, 0, 0])),
            shape(3, Some([50, 0, 0])),
        ];
        let refs: Vec<&ShapeInfo> = shapes.iter().collect();
        let steps = sequence_by_value(&refs);

        assert_eq!(indices(&steps), vec![vec![3], vec![1], vec![0, 2]]);
        let order: Vec<usize> = steps.iter().map(|s| s.sequenceindex).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(steps.iter().all(|s| s.isdefault == Some(false)));
        assert_eq!(steps[2].inferredfromvalue, Some(InferredValue::Number(200.0)));
    }

    #[test]
    fn single_brightness_is_one_default_step() {
        let shapes = [shape(4, Some([0, 0, 255])), shape(5, Some([0, 255, 0]))];
        let refs: Vec<&ShapeInfo> = shapes.iter().collect();
        let steps = sequence_by_value(&refs);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].shapeindices, vec![4, 5]);
        assert_eq!(steps[0].isdefault, Some(true));
        assert_eq!(steps[0].inferredfromvalue, Some(InferredValue::Number(255.0)));
    }

    #[test]
    fn uncolored_shapes_come_last() {
        let shapes = [shape(0, None), shape(1, Some([10, 10, 10])), shape(2, Some([90, 0, 0]))];
        let refs: Vec<&ShapeInfo> = shapes.iter().collect();
        let steps = sequence_by_value(&refs);
        assert_eq!(indices(&steps), vec![vec![1], vec![2], vec![0]]);
        assert_eq!(steps[2].inferredfromvalue, None);

        let only_uncolored = [shape(0, None)];
        let refs: Vec<&ShapeInfo> = only_uncolored.iter().collect();
        let steps = sequence_by_value(&refs);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].isdefault, Some(true));
    }

    #[test]
    fn empty_input() {
        let steps = sequence_by_value(&[]);
        assert_eq!(steps.len(), 1);
        assert!(steps[0].shapeindices.is_empty());
    }

    #[test]
    fn position_attributes_with_rounding_and_reverse() {
        let shapes = [at(0, 0.31, 1.0), at(1, -0.5, 0.0), at(2, 0.29, 3.0)];
        let refs: Vec<&ShapeInfo> = shapes.iter().collect();

        let by_x = SequenceBySpec {
            attr: SequenceByAttr::X,
            rounddigits: Some(1),
            reverse: None,
        };
        assert_eq!(indices(&sequence_by(&refs, &by_x)), vec![vec![1], vec![0, 2]]);

        let far_first = SequenceBySpec {
            attr: SequenceByAttr::Distance,
            rounddigits: None,
            reverse: Some(true),
        };
        assert_eq!(
            indices(&sequence_by(&refs, &far_first)),
            vec![vec![2], vec![0], vec![1]]
        );
        assert_eq!(attribute_value(&shapes[1], SequenceByAttr::Y), Some(0.0));
        assert_eq!(attribute_value(&shapes[1], SequenceByAttr::Red), None);
    }

    #[test]
    fn one_group_per_hue_and_saturation() {
        // red, blue, dark red under one container
        let shapes: Vec<ShapeInfo> = [[255, 0, 0], [0, 0, 255], [128, 0, 0]]
            .into_iter()
            .enumerate()
            .map(|(i, rgb)| ShapeInfo {
                color: Some(ColorValue::from(rgb)),
                ..ShapeInfo::new(i, format!("_{}", i), format!("/all/_{}", i)).with_parent("/all")
            })
            .collect();
        let mut paths = OverlayPaths::new(["/all"]);
        let groups = color_groups(&shapes, &mut paths);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].groupname, "all");
        assert_eq!(groups[0].grouppath, "/all/#hs0");
        assert_eq!(groups[0].depth, Some(1));
        assert_eq!(groups[0].inferencetype.as_deref(), Some(HUE_SAT_VALUE));
        assert_eq!(groups[0].shapeindices, vec![0, 2]);
        assert_eq!(indices(&groups[0].sequencesteps), vec![vec![2], vec![0]]);
        assert_eq!(
            groups[0].inferredfromvalue,
            Some(InferredValue::List(vec![InferredValue::Number(0.0), InferredValue::Number(1.0)]))
        );

        assert_eq!(groups[1].grouppath, "/all/#hs1");
        assert_eq!(groups[1].shapeindices, vec![1]);
        assert_eq!(groups[1].sequencesteps[0].isdefault, Some(true));
    }

    #[test]
    fn color_group_names_skip_generated_segments() {
        let shapes = vec![
            ShapeInfo {
                color: Some(ColorValue::from([0, 255, 0])),
                ..ShapeInfo::new(0, "a", "/_0/_1/a").with_parent("/_0/_1")
            },
            ShapeInfo {
                color: Some(ColorValue::from([0, 255, 0])),
                ..ShapeInfo::new(1, "b", "/_0/b").with_parent("/_0")
            },
        ];
        let groups = color_groups(&shapes, &mut OverlayPaths::default());
        assert_eq!(groups[0].groupname, "_0");
        assert_eq!(groups[0].grouppath, "/_0/#hs0");
    }
}
