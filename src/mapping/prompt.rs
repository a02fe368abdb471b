//! Prompt construction for LLM mapping.

use crate::model::{DocumentStructure, Placeholder};
use serde_json::{json, Value};

/// Characters of block content shown to the model.
pub const PREVIEW_CHARS: usize = 200;

/// System prompt for the mapping request.
pub const MAPPING_SYSTEM_PROMPT: &str = r#"You are a document layout expert.
You map Markdown content blocks onto the placeholders of a DOCX template.

## Rules
1. Map the most suitable content blocks to each placeholder.
2. TITLE receives the title (a level 1 heading).
3. SUBTITLE receives a subtitle or a short summary.
4. BODY receives the main content.
5. SECTION_N receives the content of the N-th section.
6. Use every block index at most once.
7. List indices you did not map in unmapped_content.

## Output format
Answer with a single JSON object:

```json
{
    "mappings": [
        {
            "placeholder_id": "TITLE",
            "content_block_indices": [0],
            "transformation": "none"
        },
        {
            "placeholder_id": "BODY",
            "content_block_indices": [1, 2, 3, 4],
            "transformation": "none"
        }
    ],
    "unmapped_content": [],
    "warnings": [],
    "confidence": 0.95
}
```

transformation is one of:
- "none": use as is
- "summarize": condense the content
- "extract_first": use only the first element
"#;

/// Build the user prompt describing placeholders and content blocks.
pub fn build_mapping_prompt(placeholders: &[Placeholder], doc: &DocumentStructure) -> String {
    let placeholder_summary: Vec<Value> = placeholders
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "type": p.kind.as_str(),
                "section": p.section.as_str(),
                "style": p.style_name.as_deref().or(p.style_id.as_deref()),
            })
        })
        .collect();

    let block_summary: Vec<Value> = doc
        .raw_blocks
        .iter()
        .enumerate()
        .map(|(index, block)| {
            json!({
                "index": index,
                "type": block.block_type.as_str(),
                "level": block.level,
                "list_type": block.list_type.map(|t| t.as_str()),
                "content_preview": preview(&block.flattened_text()),
            })
        })
        .collect();

    format!(
        "## Template placeholders\n{}\n\n## Markdown content blocks\n{}\n\n\
         Map the content blocks above onto the placeholders.\n\
         Respond with JSON only.\n",
        pretty(&placeholder_summary),
        pretty(&block_summary)
    )
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

fn pretty(values: &[Value]) -> String {
    serde_json::to_string_pretty(values).unwrap_or_else(|_| "[]".to_string())
}
