//! Page geometry from section properties.

use crate::package::xml::first_attr;
use serde::{Deserialize, Serialize};

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Portrait
    #[default]
    Portrait,
    /// Landscape
    Landscape,
}

/// Page size and margins in points, read from `w:sectPr`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// Page width
    pub width_pt: Option<f32>,
    /// Page height
    pub height_pt: Option<f32>,
    /// Orientation (explicit, or implied by width > height)
    pub orientation: Orientation,
    /// Top margin
    pub margin_top_pt: Option<f32>,
    /// Right margin
    pub margin_right_pt: Option<f32>,
    /// Bottom margin
    pub margin_bottom_pt: Option<f32>,
    /// Left margin
    pub margin_left_pt: Option<f32>,
    /// Header distance from the page edge
    pub header_pt: Option<f32>,
    /// Footer distance from the page edge
    pub footer_pt: Option<f32>,
}

impl PageGeometry {
    /// Read geometry from a `w:sectPr` element.
    pub fn from_sect_pr(xml: &str) -> Self {
        let twips = |local: &[u8], key: &[u8]| {
            first_attr(xml, local, key)
                .and_then(|v| v.parse::<f32>().ok())
                .map(|v| v / 20.0)
        };

        let width_pt = twips(b"pgSz", b"w");
        let height_pt = twips(b"pgSz", b"h");
        let orientation = match first_attr(xml, b"pgSz", b"orient").as_deref() {
            Some("landscape") => Orientation::Landscape,
            Some(_) => Orientation::Portrait,
            None => match (width_pt, height_pt) {
                (Some(w), Some(h)) if w > h => Orientation::Landscape,
                _ => Orientation::Portrait,
            },
        };

        Self {
            width_pt,
            height_pt,
            orientation,
            margin_top_pt: twips(b"pgMar", b"top"),
            margin_right_pt: twips(b"pgMar", b"right"),
            margin_bottom_pt: twips(b"pgMar", b"bottom"),
            margin_left_pt: twips(b"pgMar", b"left"),
            header_pt: twips(b"pgMar", b"header"),
            footer_pt: twips(b"pgMar", b"footer"),
        }
    }

    /// Width available to text between the side margins.
    pub fn text_width_pt(&self) -> Option<f32> {
        Some(self.width_pt? - self.margin_left_pt.unwrap_or(0.0) - self.margin_right_pt.unwrap_or(0.0))
    }
}
