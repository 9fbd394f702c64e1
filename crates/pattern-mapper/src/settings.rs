//! Pattern settings: generation and rendering parameters.
//!
//! Settings are authored by hand, usually as YAML next to the source SVG,
//! so most values accept shorthand forms (a bare mode name instead of a
//! table, `&`/`|` for boolean operators, short attribute aliases).
//!
//! Group generation specs have no explicit type tag. Their kind is
//! detected from which keys are present, see [`GroupGenSpec::from_value`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::Extra;

/// Error loading or interpreting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported group gen spec: {0}")]
    UnsupportedGroupSpec(String),
    #[error("multiple conflicting group gen types ({kinds}) in {spec}")]
    ConflictingGroupSpec { kinds: String, spec: String },
    #[error("unknown {what}: '{value}'")]
    UnknownName { what: &'static str, value: String },
}

/// Top-level settings record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternSettings {
    /// Build structural groups automatically when loading (default on).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autogroup: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupGenSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depthlayering: Option<DepthLayeringSpec>,
    /// Scale coordinates into a unit square (default on).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescale: Option<bool>,
    /// Move the drawing center to the origin (default on).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recenter: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaultshapestate: Option<ShapeState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groupshapestates: Vec<GroupShapeState>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PatternSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn autogroup(&self) -> bool {
        self.autogroup.unwrap_or(true)
    }

    pub fn rescale(&self) -> bool {
        self.rescale.unwrap_or(true)
    }

    pub fn recenter(&self) -> bool {
        self.recenter.unwrap_or(true)
    }

    /// Layer assigned to shapes that don't specify one.
    pub fn default_layer(&self) -> Option<i64> {
        self.depthlayering.as_ref().and_then(|d| d.defaultlayer)
    }

    /// Groups whose members get the given state, in application order.
    pub fn state_groups(&self) -> impl Iterator<Item = (Vec<String>, &ShapeState)> {
        self.groupshapestates.iter().map(|gs| {
            let names = gs.group.as_ref().map(ValueListSpec::texts).unwrap_or_default();
            (names, &gs.state)
        })
    }
}

// ============================================================================
// VALUE LISTS
// ============================================================================

/// A single value or a list of values, as written in settings files.
///
/// Bounds, suffixes and group references all use this shape: `xmin: 0`,
/// `suffixes: "a b c"` or `groups: [left, right]`. A string holding
/// several words separated by whitespace or commas is a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueListSpec {
    Number(f64),
    Text(String),
    List(Vec<ValueItem>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueItem {
    Number(f64),
    Text(String),
}

impl ValueListSpec {
    pub fn items(&self) -> Vec<ValueItem> {
        match self {
            ValueListSpec::Number(n) => vec![ValueItem::Number(*n)],
            ValueListSpec::Text(text) => text
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|word| !word.is_empty())
                .map(|word| match word.parse::<f64>() {
                    Ok(n) => ValueItem::Number(n),
                    Err(_) => ValueItem::Text(word.to_string()),
                })
                .collect(),
            ValueListSpec::List(items) => items.clone(),
        }
    }

    /// Items as numbers. `*` (or any other word) is `None`: unbounded.
    pub fn numbers(&self) -> Vec<Option<f64>> {
        self.items()
            .into_iter()
            .map(|item| match item {
                ValueItem::Number(n) => Some(n),
                ValueItem::Text(_) => None,
            })
            .collect()
    }

    /// Items as strings; numbers print without a fraction when whole.
    pub fn texts(&self) -> Vec<String> {
        self.items().into_iter().map(|item| item.to_string()).collect()
    }
}

impl fmt::Display for ValueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueItem::Number(n) => write!(f, "{}", n),
            ValueItem::Text(t) => f.write_str(t),
        }
    }
}

// ============================================================================
// GROUP GENERATION SPECS
// ============================================================================

/// Fields shared by every kind of group spec.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupGenCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequenceby: Option<SequenceBySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depthlayer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mergeto: Option<String>,
}

impl GroupGenCommon {
    /// Explicit `temporary`, else groups named `.something` are scratch.
    pub fn is_temporary(&self) -> bool {
        self.temporary.unwrap_or_else(|| {
            self.groupname
                .as_deref()
                .is_some_and(|name| name.starts_with('.'))
        })
    }
}

/// Group shapes by SVG path pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathGroupGen {
    #[serde(flatten)]
    pub common: GroupGenCommon,
    pub paths: ValueListSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupatdepth: Option<usize>,
}

/// Group shapes whose center falls in an x/y box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxBoundGroupGen {
    #[serde(flatten)]
    pub common: GroupGenCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerotate: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmin: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmax: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymin: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymax: Option<ValueListSpec>,
}

/// Group shapes whose center falls in an angle/distance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarBoundGroupGen {
    #[serde(flatten)]
    pub common: GroupGenCommon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerotate: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anglemin: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anglemax: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distancemin: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distancemax: Option<ValueListSpec>,
}

/// Combine other groups with a boolean operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanGroupGen {
    #[serde(flatten)]
    pub common: GroupGenCommon,
    pub groups: ValueListSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withgroups: Option<ValueListSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolop: Option<BoolOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permute: Option<bool>,
}

/// Merge other groups into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeGroupGen {
    #[serde(flatten)]
    pub common: GroupGenCommon,
    pub groups: ValueListSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

/// How to build one (or several, with suffixes) groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupGenSpec {
    Path(PathGroupGen),
    BoxBound(BoxBoundGroupGen),
    PolarBound(PolarBoundGroupGen),
    Boolean(BooleanGroupGen),
    Merge(MergeGroupGen),
}

const BOX_KEYS: &[&str] = &["xmin", "xmax", "ymin", "ymax"];
const POLAR_KEYS: &[&str] = &["anglemin", "anglemax", "distancemin", "distancemax"];
const BOOLEAN_KEYS: &[&str] = &["withgroups", "boolop", "permute"];

impl GroupGenSpec {
    /// Detect the group kind from its keys and parse it.
    ///
    /// - any of `xmin/xmax/ymin/ymax` → box bound
    /// - any of `anglemin/anglemax/distancemin/distancemax` → polar bound
    /// - `groups` plus `withgroups/boolop/permute` → boolean, else merge
    /// - `paths` → path
    ///
    /// Zero or several matching kinds is an error.
    pub fn from_value(value: Value) -> Result<Self, SettingsError> {
        let Value::Object(map) = &value else {
            return Err(SettingsError::UnsupportedGroupSpec(value.to_string()));
        };
        let has_any = |keys: &[&str]| keys.iter().any(|k| map.contains_key(*k));

        let mut kinds = Vec::new();
        if has_any(BOX_KEYS) {
            kinds.push("box");
        }
        if has_any(POLAR_KEYS) {
            kinds.push("polar");
        }
        if map.contains_key("groups") {
            kinds.push(if has_any(BOOLEAN_KEYS) { "boolean" } else { "merge" });
        }
        if map.contains_key("paths") {
            kinds.push("path");
        }

        match kinds.as_slice() {
            [] => Err(SettingsError::UnsupportedGroupSpec(value.to_string())),
            ["box"] => Ok(GroupGenSpec::BoxBound(serde_json::from_value(value)?)),
            ["polar"] => Ok(GroupGenSpec::PolarBound(serde_json::from_value(value)?)),
            ["boolean"] => Ok(GroupGenSpec::Boolean(serde_json::from_value(value)?)),
            ["merge"] => Ok(GroupGenSpec::Merge(serde_json::from_value(value)?)),
            ["path"] => Ok(GroupGenSpec::Path(serde_json::from_value(value)?)),
            _ => Err(SettingsError::ConflictingGroupSpec {
                kinds: kinds.join(", "),
                spec: value.to_string(),
            }),
        }
    }

    pub fn common(&self) -> &GroupGenCommon {
        match self {
            GroupGenSpec::Path(s) => &s.common,
            GroupGenSpec::BoxBound(s) => &s.common,
            GroupGenSpec::PolarBound(s) => &s.common,
            GroupGenSpec::Boolean(s) => &s.common,
            GroupGenSpec::Merge(s) => &s.common,
        }
    }

    /// Short kind name, for listings.
    pub fn kind(&self) -> &'static str {
        match self {
            GroupGenSpec::Path(_) => "path",
            GroupGenSpec::BoxBound(_) => "box",
            GroupGenSpec::PolarBound(_) => "polar",
            GroupGenSpec::Boolean(_) => "boolean",
            GroupGenSpec::Merge(_) => "merge",
        }
    }
}

impl<'de> Deserialize<'de> for GroupGenSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        GroupGenSpec::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// NAMED OPTIONS (with aliases)
// ============================================================================

/// Boolean operator for combining groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum BoolOp {
    And,
    Or,
}

impl TryFrom<String> for BoolOp {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "and" | "&" => Ok(BoolOp::And),
            "or" | "|" => Ok(BoolOp::Or),
            _ => Err(SettingsError::UnknownName { what: "boolean operator", value }),
        }
    }
}

/// Shape attribute a sequence is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SequenceByAttr {
    Red,
    Green,
    Blue,
    Hue,
    Saturation,
    Value,
    X,
    Y,
    Distance,
}

impl TryFrom<String> for SequenceByAttr {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        use SequenceByAttr::*;
        match value.to_lowercase().as_str() {
            "r" | "red" => Ok(Red),
            "g" | "green" => Ok(Green),
            "b" | "blue" => Ok(Blue),
            "h" | "hue" => Ok(Hue),
            "s" | "sat" | "saturation" => Ok(Saturation),
            "v" | "value" => Ok(Value),
            "x" => Ok(X),
            "y" => Ok(Y),
            "d" | "dist" | "distance" => Ok(Distance),
            _ => Err(SettingsError::UnknownName { what: "sequence attribute", value }),
        }
    }
}

/// Ordering for a generated group's sequence steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SequenceByRepr")]
pub struct SequenceBySpec {
    pub attr: SequenceByAttr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounddigits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
}

/// Accepts `sequenceby: v` as well as the full table.
#[derive(Deserialize)]
#[serde(untagged)]
enum SequenceByRepr {
    Attr(SequenceByAttr),
    Full {
        attr: SequenceByAttr,
        #[serde(default)]
        rounddigits: Option<u32>,
        #[serde(default)]
        reverse: Option<bool>,
    },
}

impl From<SequenceByRepr> for SequenceBySpec {
    fn from(repr: SequenceByRepr) -> Self {
        match repr {
            SequenceByRepr::Attr(attr) => SequenceBySpec { attr, rounddigits: None, reverse: None },
            SequenceByRepr::Full { attr, rounddigits, reverse } => {
                SequenceBySpec { attr, rounddigits, reverse }
            }
        }
    }
}

/// How groups are assigned stacking layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum GroupDepthMode {
    Manual,
    Flat,
    GroupNamePrefix,
}

impl TryFrom<String> for GroupDepthMode {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "manual" => Ok(GroupDepthMode::Manual),
            "flat" => Ok(GroupDepthMode::Flat),
            "groupnameprefix" | "prefix" => Ok(GroupDepthMode::GroupNamePrefix),
            _ => Err(SettingsError::UnknownName { what: "depth layering mode", value }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "DepthLayeringRepr")]
pub struct DepthLayeringSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<GroupDepthMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condense: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layerdistance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaultlayer: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DepthLayeringRepr {
    Mode(GroupDepthMode),
    Full {
        #[serde(default)]
        mode: Option<GroupDepthMode>,
        #[serde(default)]
        condense: Option<bool>,
        #[serde(default)]
        layerdistance: Option<f64>,
        #[serde(default)]
        defaultlayer: Option<i64>,
    },
}

impl From<DepthLayeringRepr> for DepthLayeringSpec {
    fn from(repr: DepthLayeringRepr) -> Self {
        match repr {
            DepthLayeringRepr::Mode(mode) => DepthLayeringSpec { mode: Some(mode), ..Default::default() },
            DepthLayeringRepr::Full { mode, condense, layerdistance, defaultlayer } => {
                DepthLayeringSpec { mode, condense, layerdistance, defaultlayer }
            }
        }
    }
}

// ============================================================================
// SHAPE STATE
// ============================================================================

/// Scale/rotate/translate, 2 or 3 components each.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniformscale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot: Option<Vec<f64>>,
}

/// Display state for a shape: colors (RGBA) and transforms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathcolor: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panelcolor: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localtransform: Option<TransformSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globaltransform: Option<TransformSpec>,
}

/// Shape state applied to the members of specific groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupShapeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ValueListSpec>,
    #[serde(flatten)]
    pub state: ShapeState,
}

// ============================================================================
// TESTS
// ============================================================================
