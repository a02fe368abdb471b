//! JSON rendering.

use crate::error::Result;
use serde::Serialize;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a report, document or plan to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value)?,
        JsonFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentBlock, DocumentStructure};

    fn doc() -> DocumentStructure {
        DocumentStructure {
            title: "Test".to_string(),
            raw_blocks: vec![ContentBlock::heading("Test", 1)],
            ..Default::default()
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&doc(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("\"heading\""));
        assert!(json.contains('\n')); // Pretty has newlines
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&doc(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n')); // Compact has no newlines
    }
}
