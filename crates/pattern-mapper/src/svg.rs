//! SVG loading - turn a drawing into a [`PatternData`] document.
//!
//! The XML is streamed with quick-xml rather than resolved into a full
//! render tree: the loader only needs element nesting, ids, a handful of
//! attributes and path data. Containers (`<g>`, nested `<svg>`, ...) become
//! path segments, and `<path>`, `<polygon>` and `<polyline>` elements become
//! shapes.
//!
//! An element's segment is its `id` (with `/` replaced), or `_N` for the
//! N-th child of its parent when it has none. Generated names step aside
//! for explicit sibling ids, so `<path id="_1"/><path/>` gives `_1` and
//! `__1`. Two siblings with the same id are an error.
//!
//! After the hierarchy is built, the settings take over: hue/saturation
//! groups ([`crate::infer::color_groups`]), generated groups
//! ([`crate::groups`]) and depth layers ([`crate::layers`]).
//!
//! ## Curve Flattening
//!
//! Path data may contain Bézier curves and arcs. svgtypes' simplifying
//! parser turns everything into absolute move/line/curve commands (arcs
//! become cubics), and lyon_geom flattens the curves into line segments
//! with a fixed tolerance in drawing units.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use log::{debug, warn};
use lyon_geom::{point, CubicBezierSegment, QuadraticBezierSegment};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use svgtypes::{Length, LengthUnit, PointsParser, SimplePathSegment, SimplifyingPathParser, ViewBox};
use thiserror::Error;

use crate::color::{parse_paint, DEFAULT_RGB};
use crate::geometry::{centroid, cumulative_distances, Point};
use crate::groups::{generate_groups, GroupGenError};
use crate::infer::{color_groups, default_step};
use crate::layers::assign_layers;
use crate::model::{ColorValue, GroupInfo, PatternData, PointData, ShapeInfo};
use crate::path::{self, OverlayPaths};
use crate::settings::{DepthLayeringSpec, GroupGenSpec, PatternSettings};

/// Error loading an SVG drawing.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("XML parse error at position {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("invalid outline for shape '{shape}': {message}")]
    PathData { shape: String, message: String },

    #[error("two sibling elements share the id at '{path}'")]
    DuplicateName { path: String },

    #[error("no shapes found in SVG")]
    NoShapes,

    #[error(transparent)]
    Groups(#[from] GroupGenError),
}

/// Knobs for [`load_svg`]; usually derived from [`PatternSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Scale positions so the longer side of the drawing spans 1.
    pub rescale: bool,
    /// Move the drawing's center to the origin.
    pub recenter: bool,
    /// Add a group per hue/saturation pair, sequenced by value.
    pub autogroup: bool,
    /// Group generation specs, run in order after autogrouping.
    pub groups: Vec<GroupGenSpec>,
    /// Layer assignment; shapes keep no layer without it.
    pub depthlayering: Option<DepthLayeringSpec>,
    /// Document name.
    pub name: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            rescale: true,
            recenter: true,
            autogroup: true,
            groups: Vec::new(),
            depthlayering: None,
            name: None,
        }
    }
}

impl LoadOptions {
    pub fn from_settings(settings: &PatternSettings) -> Self {
        Self {
            rescale: settings.rescale(),
            recenter: settings.recenter(),
            autogroup: settings.autogroup(),
            groups: settings.groups.clone(),
            depthlayering: settings.depthlayering.clone(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Tolerance for curve flattening, in drawing units.
const CURVE_TOLERANCE: f64 = 0.1;

/// Elements whose subtree never contributes shapes.
const NON_GRAPHIC: &[&str] = &[
    "defs", "clipPath", "mask", "symbol", "marker", "pattern", "style", "text", "metadata",
    "title", "desc",
];

/// Elements that nest other elements and extend the path.
const CONTAINERS: &[&str] = &["g", "svg", "a", "switch"];

/// Inference type of groups mirroring SVG containers.
pub const STRUCTURE: &str = "structure";

/// Parse SVG text into a pattern document.
///
/// Shapes come out in document order with `shapeindex` equal to their
/// position. Containers holding shapes become groups in document order,
/// parents before children; inferred and generated groups follow.
/// Temporary groups are kept, so callers can still use them before
/// persisting the document.
pub fn load_svg(content: &str, options: &LoadOptions) -> Result<PatternData, LoadError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut walker = Walker::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => walker.start(e, false)?,
            Ok(Event::Empty(ref e)) => walker.start(e, true)?,
            Ok(Event::End(_)) => walker.end(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::Xml {
                    position: reader.error_position(),
                    message: e.to_string(),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    if walker.shapes.is_empty() {
        return Err(LoadError::NoShapes);
    }
    debug!(
        "loaded {} shapes in {} containers",
        walker.shapes.len(),
        walker.containers.len()
    );

    let mut doc = walker.finish(options)?;
    if options.autogroup {
        let taken = doc
            .groups
            .iter()
            .map(|g| g.grouppath.as_str())
            .chain(doc.shapes.iter().map(|s| s.shapepath.as_str()));
        let mut paths = OverlayPaths::new(taken);
        let inferred = color_groups(&doc.shapes, &mut paths);
        debug!("inferred {} color groups", inferred.len());
        doc.groups.extend(inferred);
    }
    generate_groups(&mut doc, &options.groups)?;
    if let Some(spec) = &options.depthlayering {
        assign_layers(&mut doc, spec);
    }
    Ok(doc)
}

// ============================================================================
// WALKER
// ============================================================================

struct RawShape {
    id: Option<String>,
    /// Position among the parent's children.
    ordinal: usize,
    container: Option<usize>,
    points: Vec<Point>,
    color: [u8; 3],
}

struct Container {
    id: Option<String>,
    ordinal: usize,
    parent: Option<usize>,
    /// Positions of every shape in the subtree.
    shapes: Vec<usize>,
}

/// An open container element.
struct Frame {
    container: Option<usize>,
    /// Path as far as it is known while walking, for messages.
    path: String,
    next_child: usize,
}

/// A shape or container below some container.
#[derive(Clone, Copy)]
enum Child {
    Shape(usize),
    Container(usize),
}

#[derive(Default)]
struct Walker {
    stack: Vec<Frame>,
    /// Open elements inside an ignored subtree.
    skip_depth: usize,
    size: Option<(f64, f64)>,
    shapes: Vec<RawShape>,
    containers: Vec<Container>,
}

impl Walker {
    fn start(&mut self, e: &BytesStart, is_empty: bool) -> Result<(), LoadError> {
        if self.skip_depth > 0 {
            if !is_empty {
                self.skip_depth += 1;
            }
            return Ok(());
        }

        let local = e.local_name();
        let tag = std::str::from_utf8(local.as_ref()).unwrap_or("");
        let attrs = attributes(e);

        let Some(parent) = self.stack.last_mut() else {
            // outermost element: the root
            self.size = Some(document_size(&attrs));
            if !is_empty {
                self.stack.push(Frame {
                    container: None,
                    path: String::new(),
                    next_child: 0,
                });
            }
            return Ok(());
        };

        let ordinal = parent.next_child;
        parent.next_child += 1;
        let parent_container = parent.container;
        let parent_path = parent.path.clone();

        if NON_GRAPHIC.contains(&tag) || is_hidden(&attrs) {
            debug!("skipping <{}> under '{}'", tag, parent_path);
            if !is_empty {
                self.skip_depth = 1;
            }
            return Ok(());
        }

        let id = attrs.get("id").and_then(|id| path::segment_name(id));
        let display_path = path::join(
            &parent_path,
            &id.clone().unwrap_or_else(|| format!("_{}", ordinal)),
        );

        if CONTAINERS.contains(&tag) {
            let container = self.containers.len();
            self.containers.push(Container {
                id,
                ordinal,
                parent: parent_container,
                shapes: Vec::new(),
            });
            if !is_empty {
                self.stack.push(Frame {
                    container: Some(container),
                    path: display_path,
                    next_child: 0,
                });
            }
            return Ok(());
        }

        if matches!(tag, "path" | "polygon" | "polyline") {
            let points = outline(tag, &attrs).map_err(|message| LoadError::PathData {
                shape: display_path.clone(),
                message,
            })?;
            if points.len() < 2 {
                warn!("skipping shape '{}': fewer than 2 points", display_path);
            } else {
                let position = self.shapes.len();
                for frame in &self.stack {
                    if let Some(c) = frame.container {
                        self.containers[c].shapes.push(position);
                    }
                }
                self.shapes.push(RawShape {
                    id,
                    ordinal,
                    container: parent_container,
                    points,
                    color: paint(&attrs),
                });
            }
        }

        // nothing below a shape (or an unsupported element) is walked
        if !is_empty {
            self.skip_depth = 1;
        }
        Ok(())
    }

    fn end(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
        } else {
            self.stack.pop();
        }
    }

    fn finish(self, options: &LoadOptions) -> Result<PatternData, LoadError> {
        let (width, height) = self.size.unwrap_or((1.0, 1.0));
        let scale = if options.rescale {
            1.0 / width.max(height)
        } else {
            1.0
        };
        let offset = if options.recenter {
            Point::new(-width / 2.0, -height / 2.0)
        } else {
            Point::new(0.0, 0.0)
        };

        // Only containers holding shapes make it into the document, so only
        // they and the shapes compete for names.
        let mut children: HashMap<Option<usize>, Vec<(usize, Child)>> = HashMap::new();
        for (c, container) in self.containers.iter().enumerate() {
            if !container.shapes.is_empty() {
                children
                    .entry(container.parent)
                    .or_default()
                    .push((container.ordinal, Child::Container(c)));
            }
        }
        for (pos, shape) in self.shapes.iter().enumerate() {
            children
                .entry(shape.container)
                .or_default()
                .push((shape.ordinal, Child::Shape(pos)));
        }

        let mut container_paths = vec![String::new(); self.containers.len()];
        let mut container_names = vec![String::new(); self.containers.len()];
        let mut shape_names = vec![String::new(); self.shapes.len()];
        let mut shape_paths = vec![String::new(); self.shapes.len()];
        let mut shape_parents = vec![String::new(); self.shapes.len()];

        // containers are numbered parents first
        let parents = std::iter::once(None).chain((0..self.containers.len()).map(Some));
        for parent in parents {
            let Some(mut siblings) = children.remove(&parent) else {
                continue;
            };
            siblings.sort_by_key(|(ordinal, _)| *ordinal);
            let parent_path = parent.map_or(String::new(), |c| container_paths[c].clone());
            let ids: Vec<(Option<&str>, usize)> = siblings
                .iter()
                .map(|&(ordinal, child)| {
                    let id = match child {
                        Child::Shape(pos) => self.shapes[pos].id.as_deref(),
                        Child::Container(c) => self.containers[c].id.as_deref(),
                    };
                    (id, ordinal)
                })
                .collect();
            let names = sibling_names(&ids, &parent_path)?;

            for ((_, child), name) in siblings.into_iter().zip(names) {
                let node_path = path::join(&parent_path, &name);
                match child {
                    Child::Container(c) => {
                        container_paths[c] = node_path;
                        container_names[c] = name;
                    }
                    Child::Shape(pos) => {
                        shape_paths[pos] = node_path;
                        shape_names[pos] = name;
                        shape_parents[pos] = parent_path.clone();
                    }
                }
            }
        }

        let shapes: Vec<ShapeInfo> = self
            .shapes
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let info = ShapeInfo::new(
                    index,
                    std::mem::take(&mut shape_names[index]),
                    std::mem::take(&mut shape_paths[index]),
                )
                .with_parent(std::mem::take(&mut shape_parents[index]));
                build_shape(info, raw, offset, scale)
            })
            .collect();

        let groups = self
            .containers
            .into_iter()
            .enumerate()
            .filter(|(_, c)| !c.shapes.is_empty())
            .map(|(c, container)| {
                let name = std::mem::take(&mut container_names[c]);
                let grouppath = std::mem::take(&mut container_paths[c]);
                structure_group(name, grouppath, container.shapes)
            })
            .collect();

        Ok(PatternData {
            name: options.name.clone(),
            width: Some(width),
            height: Some(height),
            shapes,
            groups,
            ..Default::default()
        })
    }
}

/// Names for the children of one container, in order. Explicit ids are
/// kept; a generated `_N` gains leading underscores until it clashes with
/// no explicit sibling id.
fn sibling_names(children: &[(Option<&str>, usize)], parent_path: &str) -> Result<Vec<String>, LoadError> {
    let mut explicit: HashSet<&str> = HashSet::new();
    for id in children.iter().filter_map(|(id, _)| *id) {
        if !explicit.insert(id) {
            return Err(LoadError::DuplicateName {
                path: path::join(parent_path, id),
            });
        }
    }
    Ok(children
        .iter()
        .map(|&(id, ordinal)| match id {
            Some(id) => id.to_string(),
            None => {
                let mut name = format!("_{}", ordinal);
                while explicit.contains(name.as_str()) {
                    name.insert(0, '_');
                }
                name
            }
        })
        .collect())
}

fn build_shape(info: ShapeInfo, raw: RawShape, offset: Point, scale: f64) -> ShapeInfo {
    let points: Vec<Point> = raw
        .points
        .iter()
        .map(|p| p.offset_scaled(offset, scale))
        .collect();
    let distances = cumulative_distances(&points);
    let length = distances.last().copied().unwrap_or(0.0);

    let point_data = points
        .iter()
        .zip(&distances)
        .map(|(p, &absdist)| PointData {
            pos: vec![p.x, p.y],
            absdist,
            reldist: if length > 0.0 { absdist / length } else { 0.0 },
        })
        .collect();

    ShapeInfo {
        color: Some(ColorValue::from(raw.color)),
        center: centroid(&points).map(|c| vec![c.x, c.y]),
        shapelength: Some(length),
        points: point_data,
        ..info
    }
}

/// A group mirroring a container: every shape below it, in one default
/// step.
fn structure_group(name: String, grouppath: String, members: Vec<usize>) -> GroupInfo {
    GroupInfo {
        inferencetype: Some(STRUCTURE.to_string()),
        depth: path::group_depth(&grouppath),
        sequencesteps: vec![default_step(members.clone(), None)],
        shapeindices: members,
        ..GroupInfo::new(name, grouppath)
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

type Attributes = HashMap<String, String>;

fn attributes(e: &BytesStart) -> Attributes {
    e.attributes()
        .flatten()
        .filter_map(|attr| {
            let key = std::str::from_utf8(attr.key.local_name().as_ref()).ok()?.to_string();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

fn is_hidden(attrs: &Attributes) -> bool {
    if let Some(id) = attrs.get("id") {
        if id == "Background" || id.starts_with('-') {
            return true;
        }
    }
    property(attrs, "display").as_deref() == Some("none")
}

/// A presentation property: the `style` declaration wins over the plain
/// attribute, as in CSS.
fn property(attrs: &Attributes, name: &str) -> Option<String> {
    let from_style = attrs.get("style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    });
    from_style.or_else(|| attrs.get(name).map(|v| v.trim().to_string()))
}

/// Outline color: stroke, then fill, then white.
fn paint(attrs: &Attributes) -> [u8; 3] {
    ["stroke", "fill"]
        .iter()
        .find_map(|name| property(attrs, name).as_deref().and_then(parse_paint))
        .unwrap_or(DEFAULT_RGB)
}

/// Drawing size from `width`/`height`, falling back to the viewBox, then 1.
fn document_size(attrs: &Attributes) -> (f64, f64) {
    let view_box = attrs
        .get("viewBox")
        .and_then(|v| ViewBox::from_str(v).ok());
    let width = length(attrs.get("width"))
        .or(view_box.map(|vb| vb.w))
        .unwrap_or(1.0);
    let height = length(attrs.get("height"))
        .or(view_box.map(|vb| vb.h))
        .unwrap_or(1.0);
    (width, height)
}

fn length(value: Option<&String>) -> Option<f64> {
    let length = Length::from_str(value?).ok()?;
    if length.unit == LengthUnit::Percent || length.number <= 0.0 {
        return None;
    }
    Some(length.number)
}

// ============================================================================
// OUTLINES
// ============================================================================

fn outline(tag: &str, attrs: &Attributes) -> Result<Vec<Point>, String> {
    let mut points = match tag {
        "path" => path_points(attrs.get("d").map(String::as_str).unwrap_or(""))?,
        _ => {
            let text = attrs.get("points").map(String::as_str).unwrap_or("");
            let mut points: Vec<Point> = PointsParser::from(text)
                .map(|(x, y)| Point::new(x, y))
                .collect();
            if tag == "polygon" {
                if let Some(&first) = points.first() {
                    points.push(first);
                }
            }
            points
        }
    };

    // Curve flattening can emit coincident vertices.
    points.dedup_by(|a, b| a.approx_eq(*b));
    Ok(points)
}

/// Vertices of the first subpath of `d`, curves flattened.
fn path_points(data: &str) -> Result<Vec<Point>, String> {
    let mut points = Vec::new();
    let mut start: Option<Point> = None;
    let mut last: Option<Point> = None;

    for segment in SimplifyingPathParser::from(data) {
        let segment = segment.map_err(|e| e.to_string())?;
        match segment {
            SimplePathSegment::MoveTo { x, y } => {
                if start.is_some() {
                    break;
                }
                let p = Point::new(x, y);
                points.push(p);
                start = Some(p);
                last = Some(p);
            }
            SimplePathSegment::LineTo { x, y } => {
                let p = Point::new(x, y);
                points.push(p);
                last = Some(p);
            }
            SimplePathSegment::Quadratic { x1, y1, x, y } => {
                if let Some(from) = last {
                    let curve = QuadraticBezierSegment {
                        from: point(from.x, from.y),
                        ctrl: point(x1, y1),
                        to: point(x, y),
                    };
                    curve.for_each_flattened(CURVE_TOLERANCE, &mut |segment| {
                        points.push(Point::new(segment.to.x, segment.to.y));
                    });
                } else {
                    points.push(Point::new(x, y));
                }
                last = Some(Point::new(x, y));
            }
            SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                if let Some(from) = last {
                    let curve = CubicBezierSegment {
                        from: point(from.x, from.y),
                        ctrl1: point(x1, y1),
                        ctrl2: point(x2, y2),
                        to: point(x, y),
                    };
                    curve.for_each_flattened(CURVE_TOLERANCE, &mut |segment| {
                        points.push(Point::new(segment.to.x, segment.to.y));
                    });
                } else {
                    points.push(Point::new(x, y));
                }
                last = Some(Point::new(x, y));
            }
            SimplePathSegment::ClosePath => {
                if let Some(s) = start {
                    points.push(s);
                    last = Some(s);
                }
            }
        }
    }
    Ok(points)
}

// ============================================================================
// TESTS
// ============================================================================
