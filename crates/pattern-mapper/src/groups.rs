//! Group generation from settings.
//!
//! Each [`GroupGenSpec`] in the settings adds one or more groups to a
//! loaded document, in order, so later specs can build on earlier ones:
//!
//! - box and polar specs select shapes whose center falls within bounds
//! - path specs select shapes by path pattern
//! - boolean specs intersect or unite existing groups
//! - merge specs concatenate existing groups
//!
//! Bound, suffix and group lists are cyclic: `xmin: [0, 1]` with
//! `xmax: 2` makes two groups, `[0, 2]` and `[1, 2]`. Generated groups
//! don't own shapes in the hierarchy, so they live at overlay paths (see
//! [`crate::path`]) below the deepest container holding all their members.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use log::{debug, info};
use thiserror::Error;

use crate::infer::{default_step, sequence_by};
use crate::model::{DepthLayer, GroupInfo, InferredValue, PatternData, SequenceStep, ShapeInfo};
use crate::path::{self, OverlayPaths};
use crate::settings::{
    BoolOp, BooleanGroupGen, BoxBoundGroupGen, GroupGenCommon, GroupGenSpec, MergeGroupGen,
    PathGroupGen, PolarBoundGroupGen, ValueListSpec,
};

pub const BOUNDED: &str = "bounded";
pub const BY_PATH: &str = "path";
pub const MERGED: &str = "merge";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupGenError {
    #[error("group spec '{spec}' refers to unknown group '{group}'")]
    UnknownGroup { spec: String, group: String },

    #[error("can't merge '{group}' into '{target}': not a merge group")]
    MergeTarget { group: String, target: String },
}

/// A group before naming: members, steps and provenance.
struct Built {
    /// Position in the group spec's value lists, used for naming.
    slot: usize,
    shapeindices: Vec<usize>,
    sequencesteps: Vec<SequenceStep>,
    inferencetype: String,
    inferredfromvalue: Option<InferredValue>,
}

/// Run every spec against the document, adding the groups they produce.
///
/// Specs without a name, or whose name starts with `-`, are skipped.
pub fn generate_groups(doc: &mut PatternData, specs: &[GroupGenSpec]) -> Result<(), GroupGenError> {
    let mut placed_later: Vec<usize> = Vec::new();

    for spec in specs {
        let common = spec.common();
        let Some(base) = common.groupname.as_deref().filter(|n| !n.starts_with('-')) else {
            debug!("skipping unnamed or disabled {} group spec", spec.kind());
            continue;
        };

        let built = match spec {
            GroupGenSpec::BoxBound(s) => bounded_groups(&doc.shapes, &box_predicates(s)),
            GroupGenSpec::PolarBound(s) => bounded_groups(&doc.shapes, &polar_predicates(s)),
            GroupGenSpec::Path(s) => path_groups(&doc.shapes, s),
            GroupGenSpec::Boolean(s) => boolean_groups(doc, base, s)?,
            GroupGenSpec::Merge(s) => vec![merge_group(doc, base, s)?],
        };
        if built.is_empty() {
            info!("group spec '{}' matched no shapes", base);
        }

        let suffixes = common.suffixes.as_ref().map(ValueListSpec::texts).unwrap_or_default();
        let solo = built.len() == 1;
        let mut new_names = Vec::with_capacity(built.len());
        for group in built {
            let name = group_name(base, &suffixes, group.slot, solo);
            let info = finish_group(doc, common, name, group);
            debug!(
                "generated group '{}' with {} shapes",
                info.groupname,
                info.shapeindices.len()
            );
            new_names.push(info.groupname.clone());
            placed_later.push(doc.groups.len());
            doc.groups.push(info);
        }

        if let Some(target) = &common.mergeto {
            merge_into(doc, target, &new_names, &mut placed_later)?;
        }
    }

    place_overlays(doc, &placed_later);
    Ok(())
}

/// `base` plus the suffix for this slot, or the slot number. A spec that
/// produced a single group and has no suffixes keeps the bare name.
fn group_name(base: &str, suffixes: &[String], slot: usize, solo: bool) -> String {
    match suffixes.get(slot) {
        Some(suffix) => format!("{}{}", base, suffix),
        None if solo && suffixes.is_empty() => base.to_string(),
        None => format!("{}{}", base, slot),
    }
}

fn finish_group(doc: &PatternData, common: &GroupGenCommon, name: String, group: Built) -> GroupInfo {
    let sequencesteps = match &common.sequenceby {
        Some(spec) => {
            let members = shapes_by_index(&doc.shapes, &group.shapeindices);
            sequence_by(&members, spec)
        }
        None => group.sequencesteps,
    };
    GroupInfo {
        inferencetype: Some(group.inferencetype),
        inferredfromvalue: group.inferredfromvalue,
        depthlayer: common.depthlayer.map(DepthLayer::Index),
        temporary: common.is_temporary().then_some(true),
        shapeindices: group.shapeindices,
        sequencesteps,
        // placed once every spec has run
        ..GroupInfo::new(name, String::new())
    }
}

fn shapes_by_index<'a>(shapes: &'a [ShapeInfo], indices: &[usize]) -> Vec<&'a ShapeInfo> {
    let lookup: HashMap<usize, &ShapeInfo> = shapes.iter().map(|s| (s.shapeindex, s)).collect();
    indices.iter().filter_map(|i| lookup.get(i).copied()).collect()
}

fn lookup_group<'a>(doc: &'a PatternData, spec: &str, name: &str) -> Result<&'a GroupInfo, GroupGenError> {
    doc.group_named(name).ok_or_else(|| GroupGenError::UnknownGroup {
        spec: spec.to_string(),
        group: name.to_string(),
    })
}

/// Give every group generated this run an overlay path and matching depth.
fn place_overlays(doc: &mut PatternData, positions: &[usize]) {
    let parents: HashMap<usize, String> = doc
        .shapes
        .iter()
        .map(|s| (s.shapeindex, s.parentpath.clone()))
        .collect();
    let taken = doc
        .groups
        .iter()
        .map(|g| g.grouppath.as_str())
        .chain(doc.shapes.iter().map(|s| s.shapepath.as_str()))
        .filter(|p| !path::is_root(p));
    let mut paths = OverlayPaths::new(taken);

    for &pos in positions {
        let group = &mut doc.groups[pos];
        let ancestor = path::common_ancestor(
            group
                .shapeindices
                .iter()
                .filter_map(|i| parents.get(i).map(String::as_str)),
        );
        group.grouppath = paths.claim(&ancestor, &group.groupname);
        group.depth = path::group_depth(&group.grouppath);
    }
}

/// Entry `i` of a cyclic list, `None` when the list is empty.
fn cyclic<T: Clone>(items: &[T], i: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[i % items.len()].clone())
    }
}

fn numbers(spec: &Option<ValueListSpec>) -> Vec<Option<f64>> {
    spec.as_ref().map(ValueListSpec::numbers).unwrap_or_default()
}

// ============================================================================
// BOUNDS
// ============================================================================

/// Inclusive range; a missing end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: Option<f64>,
    max: Option<f64>,
}

impl Range {
    fn at(mins: &[Option<f64>], maxs: &[Option<f64>], i: usize) -> Self {
        Self {
            min: cyclic(mins, i).flatten(),
            max: cyclic(maxs, i).flatten(),
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = |v: Option<f64>| v.map_or_else(|| "*".to_string(), |v| v.to_string());
        write!(f, "[{}, {}]", end(self.min), end(self.max))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Predicate {
    Box { x: Range, y: Range, rotate: f64 },
    Polar { angle: Range, distance: Range, rotate: f64 },
}

impl Predicate {
    fn test(&self, shape: &ShapeInfo) -> bool {
        let Some((x, y)) = shape.center.as_deref().filter(|c| c.len() >= 2).map(|c| (c[0], c[1]))
        else {
            return false;
        };
        match *self {
            Predicate::Box { x: xr, y: yr, rotate } => {
                let (x, y) = rotated(x, y, rotate);
                xr.contains(x) && yr.contains(y)
            }
            Predicate::Polar { angle, distance, rotate } => {
                let (x, y) = rotated(x, y, rotate);
                distance.contains(x.hypot(y)) && angle.contains(polar_angle(x, y))
            }
        }
    }

    fn describe(&self) -> String {
        let (mut desc, rotate) = match self {
            Predicate::Box { x, y, rotate } => (format!("x: {} y: {}", x, y), *rotate),
            Predicate::Polar { angle, distance, rotate } => {
                (format!("angle: {} distance: {}", angle, distance), *rotate)
            }
        };
        if rotate != 0.0 {
            let _ = write!(desc, " rotated: {}", rotate);
        }
        desc
    }
}

/// Rotate a point counter-clockwise about the origin, in degrees.
fn rotated(x: f64, y: f64, degrees: f64) -> (f64, f64) {
    if degrees == 0.0 {
        return (x, y);
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Angle of a point from the +x axis towards +y, in degrees, `0..360`.
fn polar_angle(x: f64, y: f64) -> f64 {
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

fn box_predicates(spec: &BoxBoundGroupGen) -> Vec<Predicate> {
    let (xmin, xmax) = (numbers(&spec.xmin), numbers(&spec.xmax));
    let (ymin, ymax) = (numbers(&spec.ymin), numbers(&spec.ymax));
    let rotate = numbers(&spec.prerotate);
    let count = [xmin.len(), xmax.len(), ymin.len(), ymax.len(), rotate.len()]
        .into_iter()
        .max()
        .unwrap_or(0)
        .max(1);
    (0..count)
        .map(|i| Predicate::Box {
            x: Range::at(&xmin, &xmax, i),
            y: Range::at(&ymin, &ymax, i),
            rotate: cyclic(&rotate, i).flatten().unwrap_or(0.0),
        })
        .collect()
}

fn polar_predicates(spec: &PolarBoundGroupGen) -> Vec<Predicate> {
    let (amin, amax) = (numbers(&spec.anglemin), numbers(&spec.anglemax));
    let (dmin, dmax) = (numbers(&spec.distancemin), numbers(&spec.distancemax));
    let rotate = numbers(&spec.prerotate);
    let count = [amin.len(), amax.len(), dmin.len(), dmax.len(), rotate.len()]
        .into_iter()
        .max()
        .unwrap_or(0)
        .max(1);
    (0..count)
        .map(|i| Predicate::Polar {
            angle: Range::at(&amin, &amax, i),
            distance: Range::at(&dmin, &dmax, i),
            rotate: cyclic(&rotate, i).flatten().unwrap_or(0.0),
        })
        .collect()
}

/// One group per predicate, skipping predicates that match nothing.
fn bounded_groups(shapes: &[ShapeInfo], predicates: &[Predicate]) -> Vec<Built> {
    predicates
        .iter()
        .enumerate()
        .filter_map(|(slot, predicate)| {
            let members: Vec<usize> = shapes
                .iter()
                .filter(|s| predicate.test(s))
                .map(|s| s.shapeindex)
                .collect();
            if members.is_empty() {
                return None;
            }
            Some(Built {
                slot,
                sequencesteps: vec![default_step(members.clone(), None)],
                shapeindices: members,
                inferencetype: BOUNDED.to_string(),
                inferredfromvalue: Some(InferredValue::Text(predicate.describe())),
            })
        })
        .collect()
}

// ============================================================================
// PATHS
// ============================================================================

/// Does `pattern` match `segment`? `*` stands for any run of characters.
fn segment_matches(pattern: &str, segment: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = segment.strip_prefix(first) else {
        return false;
    };
    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

/// Does a path pattern select this shape? Patterns starting with `/` are
/// anchored at the root; others may match at any depth. The shape matches
/// when the pattern names it or one of its containers.
fn path_matches(pattern: &str, shape_path: &str) -> bool {
    let wanted: Vec<&str> = path::segments(pattern).collect();
    let actual: Vec<&str> = path::segments(shape_path).collect();
    if wanted.is_empty() || wanted.len() > actual.len() {
        return false;
    }
    let starts = if pattern.trim_start().starts_with('/') {
        0..1
    } else {
        0..actual.len() - wanted.len() + 1
    };
    starts.into_iter().any(|start| {
        wanted
            .iter()
            .zip(&actual[start..])
            .all(|(w, a)| segment_matches(w, a))
    })
}

/// One group per pattern, or with `groupatdepth`, one group per container
/// at that depth holding matched shapes.
fn path_groups(shapes: &[ShapeInfo], spec: &PathGroupGen) -> Vec<Built> {
    let patterns = spec.paths.texts();
    let matched = |pattern: &str| -> Vec<&ShapeInfo> {
        shapes
            .iter()
            .filter(|s| path_matches(pattern, &s.shapepath))
            .collect()
    };

    let mut sets: Vec<(String, Vec<usize>)> = Vec::new();
    match spec.groupatdepth {
        None => {
            for pattern in &patterns {
                let members = matched(pattern).iter().map(|s| s.shapeindex).collect();
                sets.push((pattern.clone(), members));
            }
        }
        Some(depth) => {
            let mut seen: HashSet<usize> = HashSet::new();
            for pattern in &patterns {
                for shape in matched(pattern) {
                    let ancestor: Vec<&str> = path::segments(&shape.parentpath).take(depth + 1).collect();
                    if ancestor.len() <= depth || !seen.insert(shape.shapeindex) {
                        continue;
                    }
                    let key = path::normalize(&ancestor.join("/"));
                    match sets.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, members)) => members.push(shape.shapeindex),
                        None => sets.push((key, vec![shape.shapeindex])),
                    }
                }
            }
        }
    }

    sets.into_iter()
        .enumerate()
        .filter(|(_, (_, members))| !members.is_empty())
        .map(|(slot, (source, members))| Built {
            slot,
            sequencesteps: vec![default_step(members.clone(), None)],
            shapeindices: members,
            inferencetype: BY_PATH.to_string(),
            inferredfromvalue: Some(InferredValue::Text(source)),
        })
        .collect()
}

// ============================================================================
// BOOLEAN AND MERGE
// ============================================================================

/// Combine groups with `and`/`or`.
///
/// - no `withgroups`: all of `groups` into one result
/// - `withgroups`: pairwise, cycling the shorter list
/// - `permute`: every pairing of `groups` with `withgroups` (or with
///   `groups` again, skipping a group paired with itself)
fn boolean_groups(doc: &PatternData, base: &str, spec: &BooleanGroupGen) -> Result<Vec<Built>, GroupGenError> {
    let op = spec.boolop.unwrap_or(BoolOp::Or);
    let left = spec.groups.texts();
    let right = spec.withgroups.as_ref().map(ValueListSpec::texts);

    let combos: Vec<Vec<String>> = match (right, spec.permute.unwrap_or(false)) {
        (right, true) => {
            let self_pairs = right.is_none();
            let right = right.unwrap_or_else(|| left.clone());
            left.iter()
                .flat_map(|a| right.iter().map(move |b| (a, b)))
                .filter(|(a, b)| !(self_pairs && a == b))
                .map(|(a, b)| vec![a.clone(), b.clone()])
                .collect()
        }
        (Some(right), false) => {
            let count = left.len().max(right.len());
            (0..count)
                .filter_map(|i| Some(vec![cyclic(&left, i)?, cyclic(&right, i)?]))
                .collect()
        }
        (None, false) => vec![left],
    };

    let mut built = Vec::new();
    for (slot, names) in combos.into_iter().enumerate() {
        let inputs = names
            .iter()
            .map(|n| lookup_group(doc, base, n))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(group) = combine(&inputs, op, slot) {
            built.push(group);
        }
    }
    Ok(built)
}

fn combine(inputs: &[&GroupInfo], op: BoolOp, slot: usize) -> Option<Built> {
    let (first, rest) = inputs.split_first()?;
    let mut members: Vec<usize> = first.shapeindices.clone();
    for group in rest {
        let other: HashSet<usize> = group.shapeindices.iter().copied().collect();
        match op {
            BoolOp::And => members.retain(|i| other.contains(i)),
            BoolOp::Or => members.extend(group.shapeindices.iter().copied()),
        }
    }
    members.sort_unstable();
    members.dedup();
    if members.is_empty() {
        return None;
    }

    let sequencesteps = match inputs.iter().find(|g| g.is_sequenced()) {
        Some(sequenced) => restrict_steps(sequenced, &members),
        None => vec![default_step(members.clone(), None)],
    };
    let op_name = match op {
        BoolOp::And => "and",
        BoolOp::Or => "or",
    };
    Some(Built {
        slot,
        shapeindices: members,
        sequencesteps,
        inferencetype: op_name.to_string(),
        inferredfromvalue: Some(InferredValue::List(
            inputs
                .iter()
                .map(|g| InferredValue::Text(g.groupname.clone()))
                .collect(),
        )),
    })
}

/// `source`'s steps cut down to `members`, renumbered from 0. Members no
/// step mentions come last.
fn restrict_steps(source: &GroupInfo, members: &[usize]) -> Vec<SequenceStep> {
    let wanted: HashSet<usize> = members.iter().copied().collect();
    let mut placed: HashSet<usize> = HashSet::new();
    let mut ordered: Vec<&SequenceStep> = source.sequencesteps.iter().collect();
    ordered.sort_by_key(|s| s.sequenceindex);

    let mut steps: Vec<SequenceStep> = Vec::new();
    for step in ordered {
        let shapeindices: Vec<usize> = step
            .shapeindices
            .iter()
            .copied()
            .filter(|i| wanted.contains(i) && placed.insert(*i))
            .collect();
        if !shapeindices.is_empty() {
            steps.push(SequenceStep {
                isdefault: step.isdefault,
                inferredfromvalue: step.inferredfromvalue.clone(),
                ..SequenceStep::new(steps.len(), shapeindices)
            });
        }
    }
    let leftover: Vec<usize> = members.iter().copied().filter(|i| !placed.contains(i)).collect();
    if !leftover.is_empty() {
        steps.push(SequenceStep::new(steps.len(), leftover));
    }
    steps
}

/// Concatenate groups. With `flatten` the result has one default step;
/// otherwise the sources' steps follow each other in the listed order.
fn merge_group(doc: &PatternData, base: &str, spec: &MergeGroupGen) -> Result<Built, GroupGenError> {
    let names = spec.groups.texts();
    let sources = names
        .iter()
        .map(|n| lookup_group(doc, base, n))
        .collect::<Result<Vec<_>, _>>()?;

    let mut members: Vec<usize> = Vec::new();
    let mut seen: HashSet<usize> = HashSet::new();
    let mut steps: Vec<SequenceStep> = Vec::new();
    for source in &sources {
        let mut ordered: Vec<&SequenceStep> = source.sequencesteps.iter().collect();
        ordered.sort_by_key(|s| s.sequenceindex);
        let listed = ordered.iter().flat_map(|s| s.shapeindices.iter());
        for &i in source.shapeindices.iter().chain(listed) {
            if seen.insert(i) {
                members.push(i);
            }
        }
        let mut step_seen: HashSet<usize> = steps.iter().flat_map(|s| s.shapeindices.iter().copied()).collect();
        let mut source_steps: Vec<Vec<usize>> = ordered.iter().map(|s| s.shapeindices.clone()).collect();
        if source_steps.is_empty() {
            source_steps.push(source.shapeindices.clone());
        }
        for indices in source_steps {
            let fresh: Vec<usize> = indices.into_iter().filter(|i| step_seen.insert(*i)).collect();
            if !fresh.is_empty() {
                steps.push(SequenceStep::new(steps.len(), fresh));
            }
        }
    }

    let sequencesteps = if spec.flatten.unwrap_or(false) || steps.len() <= 1 {
        vec![default_step(members.clone(), None)]
    } else {
        steps
    };
    Ok(Built {
        slot: 0,
        shapeindices: members,
        sequencesteps,
        inferencetype: MERGED.to_string(),
        inferredfromvalue: Some(InferredValue::List(
            names.into_iter().map(InferredValue::Text).collect(),
        )),
    })
}

/// Append newly generated groups to the merge group `target`, creating it
/// when absent. Each appended group becomes one more step.
fn merge_into(
    doc: &mut PatternData,
    target: &str,
    names: &[String],
    placed_later: &mut Vec<usize>,
) -> Result<(), GroupGenError> {
    let pos = match doc.groups.iter().position(|g| g.groupname == target) {
        Some(pos) if doc.groups[pos].inferencetype.as_deref() == Some(MERGED) => pos,
        Some(_) => {
            return Err(GroupGenError::MergeTarget {
                group: names.first().cloned().unwrap_or_default(),
                target: target.to_string(),
            })
        }
        None => {
            doc.groups.push(GroupInfo {
                inferencetype: Some(MERGED.to_string()),
                inferredfromvalue: Some(InferredValue::List(Vec::new())),
                ..GroupInfo::new(target, String::new())
            });
            placed_later.push(doc.groups.len() - 1);
            doc.groups.len() - 1
        }
    };

    for name in names {
        let Some(source) = doc.groups.iter().find(|g| &g.groupname == name && g.groupname != target) else {
            continue;
        };
        let source_members = source.shapeindices.clone();
        let group = &mut doc.groups[pos];
        let mut fresh = Vec::new();
        for i in source_members {
            if !group.shapeindices.contains(&i) {
                group.shapeindices.push(i);
                fresh.push(i);
            }
        }
        if let Some(InferredValue::List(sources)) = &mut group.inferredfromvalue {
            sources.push(InferredValue::Text(name.clone()));
        }
        if !fresh.is_empty() {
            let index = group.sequencesteps.len();
            group.sequencesteps.push(SequenceStep {
                isdefault: Some(false),
                inferredfromvalue: Some(InferredValue::Text(name.clone())),
                ..SequenceStep::new(index, fresh)
            });
        }
    }
    // a single step has no real order
    let steps = &mut doc.groups[pos].sequencesteps;
    let single = steps.len() == 1;
    for step in steps.iter_mut() {
        step.isdefault = Some(single);
    }
    Ok(())
}
