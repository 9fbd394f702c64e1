//! Per-shape display state.
//!
//! Settings give a `defaultshapestate` and a list of `groupshapestates`.
//! A shape starts from the default and picks up every group state naming a
//! group it belongs to, in order. Later states override earlier ones field
//! by field, transforms included.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::PatternData;
use crate::settings::{PatternSettings, ShapeState, TransformSpec};

/// The state one shape ends up with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedShapeState {
    pub shapeindex: usize,
    #[serde(flatten)]
    pub state: ShapeState,
}

/// One entry per shape, in document order.
///
/// A state whose `group` names several groups applies to the members of
/// each. A state with no `group` applies to every shape.
pub fn resolve_shape_states(doc: &PatternData, settings: &PatternSettings) -> Vec<ResolvedShapeState> {
    let base = settings.defaultshapestate.clone().unwrap_or_default();

    let overrides: Vec<(Option<HashSet<usize>>, &ShapeState)> = settings
        .state_groups()
        .map(|(names, state)| {
            if names.is_empty() {
                return (None, state);
            }
            let members = doc
                .groups
                .iter()
                .filter(|g| names.contains(&g.groupname))
                .flat_map(|g| g.shapeindices.iter().copied())
                .collect();
            (Some(members), state)
        })
        .collect();

    doc.shapes
        .iter()
        .map(|shape| {
            let mut state = base.clone();
            for (members, over) in &overrides {
                if members.as_ref().is_none_or(|m| m.contains(&shape.shapeindex)) {
                    state.overlay(over);
                }
            }
            ResolvedShapeState {
                shapeindex: shape.shapeindex,
                state,
            }
        })
        .collect()
}

impl ShapeState {
    /// Take every field `other` sets.
    pub fn overlay(&mut self, other: &ShapeState) {
        if other.pathcolor.is_some() {
            self.pathcolor.clone_from(&other.pathcolor);
        }
        if other.panelcolor.is_some() {
            self.panelcolor.clone_from(&other.panelcolor);
        }
        overlay_transform(&mut self.localtransform, &other.localtransform);
        overlay_transform(&mut self.globaltransform, &other.globaltransform);
    }
}

fn overlay_transform(target: &mut Option<TransformSpec>, other: &Option<TransformSpec>) {
    let Some(other) = other else {
        return;
    };
    let target = target.get_or_insert_with(TransformSpec::default);
    let fields = [
        (&mut target.scale, &other.scale),
        (&mut target.rotate, &other.rotate),
        (&mut target.translate, &other.translate),
        (&mut target.pivot, &other.pivot),
    ];
    for (mine, theirs) in fields {
        if theirs.is_some() {
            mine.clone_from(theirs);
        }
    }
    if other.uniformscale.is_some() {
        target.uniformscale = other.uniformscale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupInfo, ShapeInfo};

    const SETTINGS: &str = "
defaultshapestate:
  pathcolor: [1, 1, 1, 1]
  localtransform: {rotate: [0, 0, 45], uniformscale: 2}
groupshapestates:
  - group: ring
    panelcolor: [1, 0, 0, 1]
    localtransform: {translate: [0, 0, 1]}
  - group: 'ring, center'
    pathcolor: [0, 0, 1, 1]
  - panelcolor: [0, 1, 0, 1]
    group: nothing
";

    fn doc() -> PatternData {
        let mut ring = GroupInfo::new("ring", "/#ring");
        ring.shapeindices = vec![1];
        let mut center = GroupInfo::new("center", "/center");
        center.shapeindices = vec![2];
        PatternData {
            shapes: (0..3).map(|i| ShapeInfo::new(i, format!("s{}", i), format!("/s{}", i))).collect(),
            groups: vec![ring, center],
            ..Default::default()
        }
    }

    #[test]
    fn default_then_group_overrides() {
        let settings = PatternSettings::from_yaml_str(SETTINGS).unwrap();
        let states = resolve_shape_states(&doc(), &settings);
        assert_eq!(states.len(), 3);

        // untouched shape keeps the default
        assert_eq!(states[0].state, settings.defaultshapestate.clone().unwrap());

        let ring = &states[1].state;
        assert_eq!(ring.panelcolor, Some(vec![1.0, 0.0, 0.0, 1.0]));
        assert_eq!(ring.pathcolor, Some(vec![0.0, 0.0, 1.0, 1.0]));
        let local = ring.localtransform.as_ref().unwrap();
        assert_eq!(local.rotate, Some(vec![0.0, 0.0, 45.0]));
        assert_eq!(local.translate, Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(local.uniformscale, Some(2.0));

        let center = &states[2].state;
        assert_eq!(center.pathcolor, Some(vec![0.0, 0.0, 1.0, 1.0]));
        assert_eq!(center.panelcolor, None);
    }

    #[test]
    fn ungrouped_state_applies_everywhere() {
        let settings = PatternSettings::from_yaml_str("groupshapestates: [{pathcolor: [0, 0, 0, 1]}]").unwrap();
        let states = resolve_shape_states(&doc(), &settings);
        assert!(states.iter().all(|s| s.state.pathcolor == Some(vec![0.0, 0.0, 0.0, 1.0])));
    }

    #[test]
    fn serializes_flat() {
        let resolved = ResolvedShapeState {
            shapeindex: 4,
            state: ShapeState {
                pathcolor: Some(vec![1.0, 1.0, 1.0, 1.0]),
                ..Default::default()
            },
        };
        assert_eq!(
            serde_json::to_value(&resolved).unwrap(),
            serde_json::json!({"shapeindex": 4, "pathcolor": [1.0, 1.0, 1.0, 1.0]})
        );
    }
}
