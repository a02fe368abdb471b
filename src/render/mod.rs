//! Rendering analysis results for people and tools.
//!
//! Template reports, parsed documents and mapping plans are all
//! serializable; [`to_json`] renders any of them. The `text` functions give
//! short plain-text summaries for terminal output.

mod json;
mod text;

pub use json::{to_json, JsonFormat};
pub use text::{document_outline, plan_summary, template_summary};
