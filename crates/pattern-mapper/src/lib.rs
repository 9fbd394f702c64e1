//! # pattern-mapper
//!
//! Data model, validation and loading for shape patterns: trees of groups
//! whose leaves are shapes, with sequence steps giving the order in which
//! each group's shapes are produced.
//!
//! - [`model`] is the JSON document schema.
//! - [`validate`] checks a document's invariants and yields a
//!   [`ValidatedPattern`] with its resolved [`PatternTree`].
//! - [`svg`] builds documents from SVG drawings. Along the way [`infer`]
//!   groups shapes by color, [`groups`] generates the groups a settings file
//!   asks for and [`layers`] assigns depth layers.
//! - [`states`] resolves the per-shape display state settings describe.
//! - [`api`] and [`config`] describe the backend that serves patterns.
//!
//! ## Rust Lesson #7: Parse, don't re-check
//!
//! A [`PatternData`] is whatever the JSON said. A [`ValidatedPattern`] can
//! only be obtained through [`validate`], so any function that takes one
//! may assume the invariants hold:
//!
//! ```
//! use pattern_mapper::{validate, PatternData};
//!
//! let doc = PatternData::default();
//! let pattern = validate(doc).unwrap();
//! assert_eq!(pattern.tree().len(), 1); // just the root
//! ```

pub mod api;
pub mod color;
pub mod config;
pub mod geometry;
pub mod groups;
pub mod infer;
pub mod layers;
pub mod model;
pub mod path;
pub mod settings;
pub mod states;
pub mod svg;
pub mod tree;
pub mod validate;

// Re-export common types at crate root for convenience.
pub use api::{check_preview_response, ApiBase, Endpoint, PreviewError};
pub use config::{Config, ConfigError};
pub use groups::{generate_groups, GroupGenError};
pub use layers::assign_layers;
pub use model::{
    ColorValue, DepthLayer, DocumentError, GroupInfo, InferredValue, PatternData,
    PatternListEntry, PointData, SequenceStep, ShapeInfo,
};
pub use settings::{PatternSettings, SettingsError};
pub use states::{resolve_shape_states, ResolvedShapeState};
pub use svg::{load_svg, LoadError, LoadOptions};
pub use tree::{Node, NodeId, NodeKind, PatternTree};
pub use validate::{diagnose, validate, Reference, ValidatedPattern, ValidationError};
