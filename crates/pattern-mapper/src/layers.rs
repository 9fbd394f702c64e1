//! Depth layering: the stacking layer each shape is drawn on.
//!
//! - `flat` (the default): every shape on `defaultlayer`
//! - `manual`: a shape takes the `depthlayer` of the last group listing it
//! - `groupnameprefix`: a shape takes the number leading the name of its
//!   innermost container that has one (`2_petals` is layer 2)
//!
//! Shapes that get nothing from their mode sit on `defaultlayer` (0 when
//! unset). `condense` renumbers the used layers to `0..k` in order, and
//! `layerdistance` lifts each shape to `z = layer * distance`.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::model::{DepthLayer, PatternData};
use crate::path;
use crate::settings::{DepthLayeringSpec, GroupDepthMode};

pub fn assign_layers(doc: &mut PatternData, spec: &DepthLayeringSpec) {
    let default = spec.defaultlayer.unwrap_or(0);
    let mode = spec.mode.unwrap_or(GroupDepthMode::Flat);

    let mut layers: Vec<i64> = match mode {
        GroupDepthMode::Flat => vec![default; doc.shapes.len()],
        GroupDepthMode::Manual => manual_layers(doc, default),
        GroupDepthMode::GroupNamePrefix => {
            for group in &mut doc.groups {
                if let Some(n) = name_prefix(&group.groupname) {
                    group.depthlayer = Some(DepthLayer::Index(n));
                }
            }
            doc.shapes
                .iter()
                .map(|s| {
                    path::segments(&s.parentpath)
                        .rev()
                        .find_map(name_prefix)
                        .unwrap_or(default)
                })
                .collect()
        }
    };

    if spec.condense.unwrap_or(false) {
        let used: BTreeSet<i64> = layers.iter().copied().collect();
        let rank: HashMap<i64, i64> = used.into_iter().zip(0..).collect();
        for layer in &mut layers {
            *layer = rank[&*layer];
        }
        for group in &mut doc.groups {
            if let Some(DepthLayer::Index(n)) = &mut group.depthlayer {
                if let Some(&r) = rank.get(n) {
                    *n = r;
                }
            }
        }
    }

    for (shape, &layer) in doc.shapes.iter_mut().zip(&layers) {
        shape.depthlayer = Some(layer);
        if let Some(distance) = spec.layerdistance {
            let z = layer as f64 * distance;
            for point in &mut shape.points {
                lift(&mut point.pos, z);
            }
            if let Some(center) = &mut shape.center {
                lift(center, z);
            }
        }
    }
    debug!("assigned {:?} depth layers to {} shapes", mode, layers.len());
}

fn manual_layers(doc: &PatternData, default: i64) -> Vec<i64> {
    let position: HashMap<usize, usize> = doc
        .shapes
        .iter()
        .enumerate()
        .map(|(pos, s)| (s.shapeindex, pos))
        .collect();
    let mut layers = vec![default; doc.shapes.len()];
    for group in &doc.groups {
        let Some(DepthLayer::Index(n)) = group.depthlayer else {
            continue;
        };
        for index in &group.shapeindices {
            if let Some(&pos) = position.get(index) {
                layers[pos] = n;
            }
        }
    }
    layers
}

/// `2_petals` → 2. The digits must end the name or be followed by
/// something other than a letter or digit.
fn name_prefix(name: &str) -> Option<i64> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    if name[digits..].chars().next().is_some_and(char::is_alphanumeric) {
        return None;
    }
    name[..digits].parse().ok()
}

/// Set the z component of a 2D or 3D position.
fn lift(pos: &mut Vec<f64>, z: f64) {
    if pos.len() < 2 {
        return;
    }
    pos.truncate(2);
    pos.push(z);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupInfo, PointData, ShapeInfo};

    fn doc() -> PatternData {
        let shape = |i: usize, parent: &str| ShapeInfo {
            center: Some(vec![1.0, 2.0]),
            points: vec![PointData {
                pos: vec![1.0, 2.0],
                absdist: 0.0,
                reldist: 0.0,
            }],
            ..ShapeInfo::new(i, format!("s{}", i), path::join(parent, &format!("s{}", i)))
                .with_parent(parent)
        };
        PatternData {
            shapes: vec![
                shape(0, "/3_back"),
                shape(1, "/3_back/inner"),
                shape(2, "/7-front/10x"),
                shape(3, "/plain"),
            ],
            groups: vec![
                GroupInfo::new("3_back", "/3_back"),
                GroupInfo::new("inner", "/3_back/inner"),
                GroupInfo::new("7-front", "/7-front"),
                GroupInfo::new("10x", "/7-front/10x"),
                GroupInfo::new("plain", "/plain"),
            ],
            ..Default::default()
        }
    }

    fn layers(doc: &PatternData) -> Vec<Option<i64>> {
        doc.shapes.iter().map(|s| s.depthlayer).collect()
    }

    #[test]
    fn flat_uses_default_layer() {
        let mut d = doc();
        assign_layers(&mut d, &DepthLayeringSpec { defaultlayer: Some(2), ..Default::default() });
        assert_eq!(layers(&d), vec![Some(2); 4]);

        let mut d = doc();
        assign_layers(&mut d, &DepthLayeringSpec::default());
        assert_eq!(layers(&d), vec![Some(0); 4]);
    }

    #[test]
    fn prefix_comes_from_innermost_numbered_container() {
        let mut d = doc();
        let spec = DepthLayeringSpec {
            mode: Some(GroupDepthMode::GroupNamePrefix),
            defaultlayer: Some(-1),
            ..Default::default()
        };
        assign_layers(&mut d, &spec);
        // "10x" is not a prefix, so /7-front/10x falls back to 7
        assert_eq!(layers(&d), vec![Some(3), Some(3), Some(7), Some(-1)]);
        assert_eq!(d.groups[0].depthlayer, Some(DepthLayer::Index(3)));
        assert_eq!(d.groups[3].depthlayer, None);
    }

    #[test]
    fn manual_takes_last_listing_group() {
        let mut d = doc();
        d.groups[0].depthlayer = Some(DepthLayer::Index(5));
        d.groups[0].shapeindices = vec![0, 1];
        d.groups[1].depthlayer = Some(DepthLayer::Index(9));
        d.groups[1].shapeindices = vec![1];
        d.groups[2].depthlayer = Some(DepthLayer::Name("top".into()));
        d.groups[2].shapeindices = vec![2];
        let spec = DepthLayeringSpec {
            mode: Some(GroupDepthMode::Manual),
            ..Default::default()
        };
        assign_layers(&mut d, &spec);
        assert_eq!(layers(&d), vec![Some(5), Some(9), Some(0), Some(0)]);
    }

    #[test]
    fn condense_and_lift() {
        let mut d = doc();
        let spec = DepthLayeringSpec {
            mode: Some(GroupDepthMode::GroupNamePrefix),
            condense: Some(true),
            layerdistance: Some(0.5),
            defaultlayer: None,
        };
        assign_layers(&mut d, &spec);
        // used layers 0, 3, 7 become 0, 1, 2
        assert_eq!(layers(&d), vec![Some(1), Some(1), Some(2), Some(0)]);
        assert_eq!(d.groups[2].depthlayer, Some(DepthLayer::Index(2)));
        assert_eq!(d.shapes[2].points[0].pos, vec![1.0, 2.0, 1.0]);
        assert_eq!(d.shapes[2].center, Some(vec![1.0, 2.0, 1.0]));
        assert_eq!(d.shapes[3].center, Some(vec![1.0, 2.0, 0.0]));
    }

    #[test]
    fn prefixes() {
        assert_eq!(name_prefix("2_petals"), Some(2));
        assert_eq!(name_prefix("12"), Some(12));
        assert_eq!(name_prefix("3d"), None);
        assert_eq!(name_prefix("petals"), None);
    }
}
