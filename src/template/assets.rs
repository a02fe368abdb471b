//! Decorative images of header and footer parts.

use crate::model::Region;
use crate::package::xml::{attr_value, local_name};
use crate::package::{Package, RelationshipResolver};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// An image referenced from a header or footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorativeAsset {
    /// Region of the referencing part
    pub region: Region,
    /// Referencing part name
    pub part: String,
    /// Relationship id of the image (`r:embed`)
    pub relationship_id: String,
    /// Media part name, if the relationship resolves inside the package
    pub media_path: Option<String>,
    /// Size of the media part in bytes
    pub size_bytes: Option<usize>,
    /// Anchored behind the text (background art)
    pub behind_text: bool,
}

/// Collect image references of one header/footer part.
pub fn collect_assets(
    package: &Package,
    resolver: &RelationshipResolver<'_>,
    region: Region,
    part: &str,
    xml: &str,
) -> Vec<DecorativeAsset> {
    let mut reader = Reader::from_str(xml);
    let mut assets = Vec::new();
    // Stack of enclosing anchors: whether each one is behind the text.
    let mut anchors: Vec<bool> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if local_name(e.name().as_ref()) == b"anchor" {
                    anchors.push(is_behind(&e));
                } else if let Some(asset) = blip(package, resolver, region, part, &e, &anchors) {
                    assets.push(asset);
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(asset) = blip(package, resolver, region, part, &e, &anchors) {
                    assets.push(asset);
                }
            }
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == b"anchor" {
                    anchors.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("Stopped scanning {} for images: {}", part, e);
                break;
            }
            _ => {}
        }
    }

    assets
}

fn is_behind(e: &BytesStart<'_>) -> bool {
    matches!(attr_value(e, b"behindDoc").as_deref(), Some("1") | Some("true"))
}

fn blip(
    package: &Package,
    resolver: &RelationshipResolver<'_>,
    region: Region,
    part: &str,
    e: &BytesStart<'_>,
    anchors: &[bool],
) -> Option<DecorativeAsset> {
    if local_name(e.name().as_ref()) != b"blip" {
        return None;
    }
    let relationship_id = attr_value(e, b"embed")?;
    let media_path = resolver.target_by_id(part, &relationship_id);
    let size_bytes = media_path
        .as_deref()
        .and_then(|p| package.read(p))
        .map(<[u8]>::len);
    Some(DecorativeAsset {
        region,
        part: part.to_string(),
        relationship_id,
        media_path,
        size_bytes,
        behind_text: anchors.last().copied().unwrap_or(false),
    })
}
