//! Model types shared by template analysis, Markdown parsing, mapping and composition.
//!
//! Content blocks are indexed by position in
//! [`DocumentStructure::raw_blocks`]; mapping plans, sections and the
//! composer all refer to blocks by that index.

mod block;
mod document;
mod mapping;
mod page;
mod placeholder;
mod provenance;
mod style;

pub use block::{BlockType, ContentBlock, InlineSpan, ListType, SpanKind, TableRow};
pub use document::{DocumentStructure, Section};
pub use mapping::{ContentMapping, ContentMappingPlan, MappingSource, Transformation};
pub use page::{PageInfo, PageType, TemplatePageStructure};
pub use placeholder::{Placeholder, PlaceholderKind, Region, SectionType};
pub use provenance::{Provenance, Resolved};
pub use style::{DocDefaults, StyleInfo, StyleType};
