//! Parsed Markdown document structure.

use super::block::{BlockType, ContentBlock};
use serde::{Deserialize, Serialize};

/// A section: a heading of level 1 or 2 and the blocks up to the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text (empty for content before the first heading)
    pub title: String,
    /// Heading level (0 for the untitled leading section)
    pub level: u8,
    /// Index of the heading block in `raw_blocks`
    pub heading_index: Option<usize>,
    /// Indices of the contained blocks in `raw_blocks`, heading excluded
    pub block_indices: Vec<usize>,
}

impl Section {
    /// Contained blocks, resolved against their document.
    pub fn blocks<'a>(
        &'a self,
        doc: &'a DocumentStructure,
    ) -> impl Iterator<Item = &'a ContentBlock> + 'a {
        self.block_indices
            .iter()
            .filter_map(move |&i| doc.raw_blocks.get(i))
    }
}

/// The parsed document.
///
/// `raw_blocks` is the index space mapping plans refer to; it is never
/// reordered after parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Inferred title
    pub title: String,
    /// Inferred subtitle
    pub subtitle: String,
    /// Decoded path of the first image, if any
    pub first_image_path: Option<String>,
    /// Sections split at level 1-2 headings
    pub sections: Vec<Section>,
    /// All top-level blocks in document order
    pub raw_blocks: Vec<ContentBlock>,
}

impl DocumentStructure {
    /// Number of top-level blocks.
    pub fn block_count(&self) -> usize {
        self.raw_blocks.len()
    }

    /// Whether no block was parsed.
    pub fn is_empty(&self) -> bool {
        self.raw_blocks.is_empty()
    }

    /// Block by index.
    pub fn block(&self, index: usize) -> Option<&ContentBlock> {
        self.raw_blocks.get(index)
    }

    /// Count blocks by type.
    pub fn count_of(&self, block_type: BlockType) -> usize {
        self.raw_blocks
            .iter()
            .filter(|b| b.block_type == block_type)
            .count()
    }
}
