//! CLI command implementations.
//!
//! - `load` - build a pattern document from an SVG drawing
//! - `validate` - check a pattern document's invariants
//! - `inspect` - summarize a pattern document's hierarchy and sequences
//! - `endpoints` - list the backend URLs for the configured `apiUrl`

pub mod common;
pub mod endpoints;
pub mod inspect;
pub mod load;
pub mod validate;

pub use endpoints::cmd_endpoints;
pub use inspect::cmd_inspect;
pub use load::cmd_load;
pub use validate::cmd_validate;
