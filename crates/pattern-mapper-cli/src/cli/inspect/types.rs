//! Data structures for inspection results.
//!
//! Kept flat and serializable so `--json` output can be consumed by other
//! tools without knowing the full document schema.

use serde::Serialize;

/// Complete inspection result: summary plus the optional views.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    pub summary: PatternSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSummary>,
}

/// Counts over the whole document - always computed.
#[derive(Debug, Serialize)]
pub struct PatternSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub shape_count: usize,
    pub point_count: usize,
    pub group_count: usize,
    pub sequenced_groups: usize,
    pub temporary_groups: usize,
    /// Deepest group nesting (0 = only top-level groups).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Shapes that sit directly under the root.
    pub root_shapes: usize,
}

/// One group in the `--groups` listing.
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub path: String,
    pub depth: usize,
    pub shape_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference: Option<String>,
    pub sequenced: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepSummary>,
}

/// One sequence step, shown with `--steps`.
#[derive(Debug, Serialize)]
pub struct StepSummary {
    pub index: usize,
    pub shapes: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Node in the hierarchy view.
#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Shapes anywhere below this node.
    pub shape_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}
