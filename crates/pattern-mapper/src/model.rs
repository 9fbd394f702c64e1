//! Pattern document model.
//!
//! A pattern is a tree of groups (located by path strings) whose leaves are
//! shapes, each with an ordered list of boundary points. Groups also carry
//! sequence steps: the order in which their shapes are produced.
//!
//! ## Rust Lesson #24: serde attributes
//!
//! The JSON produced by the pattern backend uses flat lowercase keys, so the
//! field names here match it one-to-one and no renaming is needed.
//!
//! - `#[serde(default)]` = missing key → `Default::default()`
//! - `skip_serializing_if = "Option::is_none"` = leave absent values out
//!   instead of writing `null`
//! - `#[serde(flatten)] extra` = collect every key we don't know about, so a
//!   document survives a load/save round trip untouched

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::color::{parse_paint, rgb_to_hsv};

pub use crate::settings::PatternSettings;

/// Keys a record carries beyond the ones modeled here.
pub type Extra = BTreeMap<String, Value>;

/// Error reading or writing a pattern document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One selectable pattern in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternListEntry {
    pub name: String,
}

/// Full definition of one pattern: its shapes and groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source drawing width, before any rescaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Source drawing height, before any rescaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub shapes: Vec<ShapeInfo>,
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One sample along a shape's boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointData {
    /// Coordinates: 2 or 3 components, fixed per pattern.
    pub pos: Vec<f64>,
    /// Distance travelled along the shape up to this point.
    pub absdist: f64,
    /// `absdist` relative to the shape length (0..1).
    pub reldist: f64,
}

/// A single shape instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeInfo {
    pub shapeindex: usize,
    pub shapename: String,
    pub shapepath: String,
    /// Path of the owning group; empty for shapes at the root.
    #[serde(default)]
    pub parentpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapelength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depthlayer: Option<i64>,
    #[serde(default)]
    pub points: Vec<PointData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dupcount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotateaxis: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One step of a group's generation order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceStep {
    #[serde(default)]
    pub sequenceindex: usize,
    #[serde(default)]
    pub shapeindices: Vec<usize>,
    /// Auto-generated rather than explicitly specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isdefault: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferredfromvalue: Option<InferredValue>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A named node in the shape hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub groupname: String,
    pub grouppath: String,
    /// How membership was derived (e.g. "structure", "bounded").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferencetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferredfromvalue: Option<InferredValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depthlayer: Option<DepthLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default)]
    pub shapeindices: Vec<usize>,
    #[serde(default)]
    pub sequencesteps: Vec<SequenceStep>,
    /// Scratch group that is not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotateaxis: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Shape color: either raw channels or an SVG color string.
///
/// ## Rust Lesson #25: Untagged enums
///
/// `#[serde(untagged)]` tries each variant in order until one fits, so
/// `[255, 0, 0]` lands in `Channels` and `"#ff0000"` in `Text` - with no
/// `{"type": ...}` wrapper in the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    /// RGB(A) channels, 0..255.
    Channels(Vec<f64>),
    /// Hex, `rgb(...)` or named color.
    Text(String),
}

/// Provenance of an inferred group or step (hue/saturation pair, value
/// level, bound description, source group names...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InferredValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<InferredValue>),
}

/// Group stacking layer: an index or a layer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepthLayer {
    Index(i64),
    Name(String),
}

// ============================================================================
// IMPLEMENTATIONS
// ============================================================================

impl PatternData {
    /// Parse a document from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Find a shape by its `shapeindex` (not its position in `shapes`).
    pub fn shape(&self, shapeindex: usize) -> Option<&ShapeInfo> {
        self.shapes.iter().find(|s| s.shapeindex == shapeindex)
    }

    /// Find a group by name. The first match wins.
    pub fn group_named(&self, groupname: &str) -> Option<&GroupInfo> {
        self.groups.iter().find(|g| g.groupname == groupname)
    }

    /// Copy of the document without scratch groups, for persisting.
    pub fn without_temporary_groups(&self) -> PatternData {
        PatternData {
            groups: self
                .groups
                .iter()
                .filter(|g| !g.is_temporary())
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

impl ShapeInfo {
    /// Minimal shape with no geometry.
    pub fn new(shapeindex: usize, shapename: impl Into<String>, shapepath: impl Into<String>) -> Self {
        Self {
            shapeindex,
            shapename: shapename.into(),
            shapepath: shapepath.into(),
            parentpath: String::new(),
            color: None,
            center: None,
            shapelength: None,
            depthlayer: None,
            points: Vec::new(),
            dupcount: None,
            radius: None,
            rotateaxis: None,
            extra: Extra::new(),
        }
    }

    /// Set the owning group path (builder style).
    pub fn with_parent(mut self, parentpath: impl Into<String>) -> Self {
        self.parentpath = parentpath.into();
        self
    }

    /// HSV of the shape color, or `None` when it has no usable color.
    pub fn hsv_color(&self) -> Option<(f64, f64, f64)> {
        let [r, g, b] = self.color.as_ref()?.rgb()?;
        Some(rgb_to_hsv(r, g, b))
    }
}

impl GroupInfo {
    /// Empty group at `grouppath`.
    pub fn new(groupname: impl Into<String>, grouppath: impl Into<String>) -> Self {
        Self {
            groupname: groupname.into(),
            grouppath: grouppath.into(),
            inferencetype: None,
            inferredfromvalue: None,
            depthlayer: None,
            depth: None,
            shapeindices: Vec::new(),
            sequencesteps: Vec::new(),
            temporary: None,
            rotateaxis: None,
            extra: Extra::new(),
        }
    }

    /// Has a real ordering: several steps, or one explicit step.
    pub fn is_sequenced(&self) -> bool {
        match self.sequencesteps.as_slice() {
            [] => false,
            [only] => !only.isdefault.unwrap_or(false),
            _ => true,
        }
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary.unwrap_or(false)
    }
}

impl SequenceStep {
    pub fn new(sequenceindex: usize, shapeindices: Vec<usize>) -> Self {
        Self {
            sequenceindex,
            shapeindices,
            ..Self::default()
        }
    }
}

impl ColorValue {
    /// RGB channels on the 0..255 scale.
    pub fn rgb(&self) -> Option<[f64; 3]> {
        match self {
            ColorValue::Channels(c) if c.len() >= 3 => Some([c[0], c[1], c[2]]),
            ColorValue::Channels(_) => None,
            ColorValue::Text(text) => {
                parse_paint(text).map(|[r, g, b]| [r as f64, g as f64, b as f64])
            }
        }
    }
}

impl From<[u8; 3]> for ColorValue {
    fn from(rgb: [u8; 3]) -> Self {
        ColorValue::Channels(rgb.iter().map(|&c| c as f64).collect())
    }
}

impl From<f64> for InferredValue {
    fn from(value: f64) -> Self {
        InferredValue::Number(value)
    }
}

impl From<&str> for InferredValue {
    fn from(value: &str) -> Self {
        InferredValue::Text(value.to_string())
    }
}

impl std::fmt::Display for InferredValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferredValue::Flag(b) => write!(f, "{}", b),
            InferredValue::Number(n) => write!(f, "{}", n),
            InferredValue::Text(s) => write!(f, "{}", s),
            InferredValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"{
        "name": "flower",
        "shapes": [
            {
                "shapeindex": 0,
                "shapename": "s1",
                "shapepath": "/root/a/s1",
                "parentpath": "/root/a",
                "color": [255, 0, 0],
                "center": [0.1, 0.2],
                "shapelength": 2.0,
                "points": [
                    {"pos": [0.0, 0.0], "absdist": 0.0, "reldist": 0.0},
                    {"pos": [1.0, 0.0], "absdist": 1.0, "reldist": 0.5}
                ],
                "glow": true
            },
            {"shapeindex": 1, "shapename": "s2", "shapepath": "/s2", "color": "#00ff00"}
        ],
        "groups": [
            {
                "groupname": "a",
                "grouppath": "/root/a",
                "depth": 1,
                "depthlayer": "front",
                "inferencetype": "HS:V",
                "inferredfromvalue": [0.0, 1.0],
                "shapeindices": [0],
                "sequencesteps": [{"sequenceindex": 0, "shapeindices": [0], "isdefault": true}]
            }
        ],
        "author": "someone"
    }"##;

    #[test]
    fn parses_full_document() {
        let doc = PatternData::from_json_str(DOC).unwrap();
        assert_eq!(doc.name.as_deref(), Some("flower"));
        assert_eq!(doc.shapes.len(), 2);
        assert_eq!(doc.shapes[0].points.len(), 2);
        assert_eq!(doc.shapes[1].parentpath, "");
        assert_eq!(doc.groups[0].depthlayer, Some(DepthLayer::Name("front".into())));
        assert_eq!(
            doc.groups[0].inferredfromvalue,
            Some(InferredValue::List(vec![0.0.into(), 1.0.into()]))
        );
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let doc = PatternData::from_json_str(DOC).unwrap();
        assert_eq!(doc.extra.get("author"), Some(&Value::from("someone")));
        assert_eq!(doc.shapes[0].extra.get("glow"), Some(&Value::from(true)));

        let again = PatternData::from_json_str(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn absent_options_are_not_written() {
        let shape = ShapeInfo::new(3, "s", "/s");
        let json = serde_json::to_string(&shape).unwrap();
        assert!(!json.contains("null"));
        assert!(!json.contains("radius"));
    }

    #[test]
    fn color_from_channels_or_text() {
        let doc = PatternData::from_json_str(DOC).unwrap();
        assert_eq!(doc.shapes[0].color.as_ref().unwrap().rgb(), Some([255.0, 0.0, 0.0]));
        assert_eq!(doc.shapes[1].color.as_ref().unwrap().rgb(), Some([0.0, 255.0, 0.0]));
        assert_eq!(ColorValue::Channels(vec![1.0]).rgb(), None);

        let (_, s, v) = doc.shapes[0].hsv_color().unwrap();
        assert_eq!((s, v), (1.0, 255.0));
    }

    #[test]
    fn sequenced_groups() {
        let mut group = GroupInfo::new("g", "/g");
        assert!(!group.is_sequenced());

        group.sequencesteps.push(SequenceStep {
            isdefault: Some(true),
            ..SequenceStep::new(0, vec![1, 2])
        });
        assert!(!group.is_sequenced());

        group.sequencesteps[0].isdefault = None;
        assert!(group.is_sequenced());

        group.sequencesteps.push(SequenceStep::new(1, vec![3]));
        assert!(group.is_sequenced());
    }

    #[test]
    fn temporary_groups_are_dropped_for_persisting() {
        let mut doc = PatternData::default();
        doc.groups.push(GroupInfo::new("keep", "/keep"));
        doc.groups.push(GroupInfo {
            temporary: Some(true),
            ..GroupInfo::new(".scratch", "/scratch")
        });

        let persisted = doc.without_temporary_groups();
        assert_eq!(persisted.groups.len(), 1);
        assert_eq!(persisted.groups[0].groupname, "keep");
        assert!(doc.group_named(".scratch").is_some());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PatternData::load("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
