//! Template analysis.
//!
//! Opening a [`Template`] runs the whole read side once: core part discovery
//! through the relationship graph, style parsing and inheritance, page
//! classification, header/footer loading, page geometry and the decorative
//! asset inventory. Everything afterwards (placeholder extraction, role
//! resolution, composition) reads from the analyzed template.

pub mod assets;
pub mod geometry;
pub mod pages;
pub mod placeholders;
pub mod role_table;
pub mod roles;
pub mod styles;

pub use assets::DecorativeAsset;
pub use geometry::{Orientation, PageGeometry};
pub use pages::{PageClassifier, StyleRoleSets};
pub use placeholders::{PlaceholderExtractor, PlaceholderPattern};
pub use roles::{MappedStyle, StyleRole, StyleRoleMapper};
pub use styles::StyleGraph;

use crate::detect::PackageFormat;
use crate::error::{Error, Result};
use crate::model::{Placeholder, Provenance, Region, TemplatePageStructure};
use crate::package::rels::types;
use crate::package::{CorePaths, Package, PartLocation, RelationshipResolver, WordPart};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A header or footer part.
#[derive(Debug, Clone)]
pub struct HeaderFooter {
    /// Header or footer
    pub region: Region,
    /// Part name
    pub path: String,
    /// Parsed content
    pub part: WordPart,
}

/// An analyzed template.
#[derive(Debug, Clone)]
pub struct Template {
    package: Package,
    format: Option<PackageFormat>,
    paths: CorePaths,
    styles: StyleGraph,
    document: WordPart,
    headers_footers: Vec<HeaderFooter>,
    pages: TemplatePageStructure,
    role_sets: StyleRoleSets,
    geometry: Option<PageGeometry>,
    assets: Vec<DecorativeAsset>,
}

impl Template {
    /// Open and analyze a template file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(Package::open(path)?)
    }

    /// Analyze a template from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_package(Package::from_bytes(data)?)
    }

    /// Analyze an opened package.
    ///
    /// Only a missing or malformed main document is fatal. A missing or
    /// malformed style part degrades to an empty style graph; unreadable
    /// headers, footers and themes are skipped.
    pub fn from_package(package: Package) -> Result<Self> {
        let format = package.format();
        let resolver = RelationshipResolver::new(&package);
        let paths = resolver.resolve_core_paths();

        let document_path = paths
            .document_path()
            .ok_or_else(|| Error::MissingPart("main document part".into()))?
            .to_string();
        let document_xml = package
            .read_string(&document_path)?
            .ok_or_else(|| Error::MissingPart(document_path.clone()))?;
        let document = WordPart::parse(&document_xml)?;

        let mut styles = load_styles(&package, paths.styles_path());
        if let Some(colors) = load_theme_colors(&package, &resolver, &document_path) {
            styles.set_theme_colors(colors);
        }

        let mut headers_footers = Vec::new();
        let mut assets = Vec::new();
        for (region, path) in resolver.header_footer_parts(&document_path) {
            let xml = match package.read_string(&path) {
                Ok(Some(xml)) => xml,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path, e);
                    continue;
                }
            };
            match WordPart::parse(&xml) {
                Ok(part) => {
                    assets.extend(assets::collect_assets(&package, &resolver, region, &path, &xml));
                    headers_footers.push(HeaderFooter { region, path, part });
                }
                Err(e) => log::warn!("Skipping {}: {}", path, e),
            }
        }

        let classifier = PageClassifier::new(&styles);
        let pages = classifier.analyze(&document);
        let role_sets = classifier.role_sets().clone();

        let geometry = document.element_xml("sectPr").map(PageGeometry::from_sect_pr);

        Ok(Self {
            package,
            format,
            paths,
            styles,
            document,
            headers_footers,
            pages,
            role_sets,
            geometry,
            assets,
        })
    }

    /// The underlying package.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Detected package format.
    pub fn format(&self) -> Option<&PackageFormat> {
        self.format.as_ref()
    }

    /// Discovered core part locations.
    pub fn core_paths(&self) -> &CorePaths {
        &self.paths
    }

    /// Main document part name.
    pub fn document_path(&self) -> &str {
        self.paths
            .document_path()
            .unwrap_or(crate::package::rels::DEFAULT_DOCUMENT_PATH)
    }

    /// Resolved style graph.
    pub fn styles(&self) -> &StyleGraph {
        &self.styles
    }

    /// Parsed main document.
    pub fn document(&self) -> &WordPart {
        &self.document
    }

    /// Header and footer parts, in relationship order.
    pub fn headers_footers(&self) -> &[HeaderFooter] {
        &self.headers_footers
    }

    /// Page classification of the main document.
    pub fn page_structure(&self) -> &TemplatePageStructure {
        &self.pages
    }

    /// Style ids discovered per page role.
    pub fn role_sets(&self) -> &StyleRoleSets {
        &self.role_sets
    }

    /// Body-level page geometry.
    pub fn geometry(&self) -> Option<&PageGeometry> {
        self.geometry.as_ref()
    }

    /// Header and footer images.
    pub fn assets(&self) -> &[DecorativeAsset] {
        &self.assets
    }

    /// Placeholders in the given marker form.
    pub fn placeholders(&self, pattern: PlaceholderPattern) -> Vec<Placeholder> {
        PlaceholderExtractor::new(pattern).extract(self)
    }

    /// A fresh role mapper over this template's styles.
    pub fn role_mapper(&self) -> StyleRoleMapper<'_> {
        StyleRoleMapper::new(&self.styles)
    }

    /// Serializable analysis summary.
    pub fn report(&self, pattern: PlaceholderPattern) -> TemplateReport {
        let mut mapper = self.role_mapper();
        let report_roles = [
            StyleRole::Title,
            StyleRole::Subtitle,
            StyleRole::Heading(1),
            StyleRole::Heading(2),
            StyleRole::Heading(3),
            StyleRole::Paragraph,
            StyleRole::BulletList,
            StyleRole::OrderedList,
            StyleRole::Code,
        ];
        let roles = report_roles
            .into_iter()
            .map(|role| {
                let resolved = mapper.resolve(role);
                RoleReport {
                    role: role.key(),
                    style_id: resolved.value.style_id().map(str::to_string),
                    style_name: resolved.value.style.name,
                    provenance: resolved.provenance,
                }
            })
            .collect();

        let outline_styles = self
            .styles
            .styles()
            .iter()
            .filter_map(|s| {
                s.outline_level.map(|level| OutlineStyle {
                    level,
                    style_id: s.style_id.clone(),
                    name: s.name.clone(),
                })
            })
            .collect();

        TemplateReport {
            format: self.format.as_ref().map(|f| f.to_string()),
            document: self.paths.document.clone(),
            styles: self.paths.styles.clone(),
            style_count: self.styles.len(),
            paragraph_count: self.document.paragraph_count(),
            header_footer_parts: self.headers_footers.iter().map(|h| h.path.clone()).collect(),
            outline_styles,
            roles,
            role_sets: self.role_sets.clone(),
            pages: self.pages.clone(),
            pattern,
            placeholders: self.placeholders(pattern),
            geometry: self.geometry.clone(),
            assets: self.assets.clone(),
            theme_colors: self.styles.theme_colors().clone(),
        }
    }
}

fn load_styles(package: &Package, styles_path: Option<&str>) -> StyleGraph {
    let Some(path) = styles_path else {
        return StyleGraph::empty();
    };
    let parsed = package
        .read_string(path)
        .and_then(|xml| xml.map(|x| StyleGraph::from_xml(&x)).transpose());
    match parsed {
        Ok(Some(graph)) => graph,
        Ok(None) => StyleGraph::empty(),
        Err(e) => {
            log::warn!("Ignoring unreadable style part {}: {}", path, e);
            StyleGraph::empty()
        }
    }
}

fn load_theme_colors(
    package: &Package,
    resolver: &RelationshipResolver<'_>,
    document_path: &str,
) -> Option<BTreeMap<String, String>> {
    let path = resolver
        .targets_of_type(document_path, types::THEME)
        .into_iter()
        .next()?;
    let xml = package.read_string(&path).ok().flatten()?;
    match styles::parse_theme_colors(&xml) {
        Ok(colors) => Some(colors),
        Err(e) => {
            log::warn!("Ignoring unreadable theme {}: {}", path, e);
            None
        }
    }
}

/// A style declaring an outline level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineStyle {
    /// Outline level, 0-based
    pub level: u8,
    /// Style id
    pub style_id: String,
    /// Display name
    pub name: String,
}

/// How one role resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReport {
    /// Role key
    pub role: String,
    /// Referenced style id; `None` for direct formatting
    pub style_id: Option<String>,
    /// Display name of the chosen style
    pub style_name: String,
    /// Resolution path
    pub provenance: Provenance,
}

/// Summary of a template analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateReport {
    /// Package format description
    pub format: Option<String>,
    /// Main document part
    pub document: Option<PartLocation>,
    /// Style part
    pub styles: Option<PartLocation>,
    /// Number of style definitions
    pub style_count: usize,
    /// Paragraphs in the main document
    pub paragraph_count: usize,
    /// Header and footer part names
    pub header_footer_parts: Vec<String>,
    /// Styles with an outline level
    pub outline_styles: Vec<OutlineStyle>,
    /// Common role resolutions
    pub roles: Vec<RoleReport>,
    /// Page role style sets
    pub role_sets: StyleRoleSets,
    /// Page classification
    pub pages: TemplatePageStructure,
    /// Marker form used for `placeholders`
    pub pattern: PlaceholderPattern,
    /// Placeholders found
    pub placeholders: Vec<Placeholder>,
    /// Page geometry
    pub geometry: Option<PageGeometry>,
    /// Header and footer images
    pub assets: Vec<DecorativeAsset>,
    /// Theme colors
    pub theme_colors: BTreeMap<String, String>,
}
