//! Package metadata updates: core properties and the main content type.

use crate::detect::PackageKind;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use regex::Regex;
use std::sync::LazyLock;

static MODIFIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dcterms:modified\b[^>]*/>|<dcterms:modified\b[^>]*>.*?</dcterms:modified>").unwrap()
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<dc:title\b[^>]*/>|<dc:title\b[^>]*>.*?</dc:title>").unwrap());
static ROOT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</(?:[A-Za-z_][\w.-]*:)?coreProperties>").unwrap());

/// Set `dcterms:modified` and, when given, `dc:title` in a core properties part.
///
/// Elements are replaced in place or added before the closing root tag.
/// An element is only added when its namespace prefix is declared.
pub fn update_core_properties(xml: &str, title: Option<&str>, now: DateTime<Utc>) -> String {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let modified = format!(
        r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>"#,
        stamp
    );

    let mut out = if MODIFIED.is_match(xml) {
        MODIFIED.replace(xml, regex::NoExpand(&modified)).into_owned()
    } else if declares(xml, "dcterms") && declares(xml, "xsi") {
        insert_before_root_end(xml, &modified)
    } else {
        log::debug!("Core properties lack the dcterms namespace; modified time not set");
        xml.to_string()
    };

    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        let element = format!("<dc:title>{}</dc:title>", escape(title));
        out = if TITLE.is_match(&out) {
            TITLE.replace(&out, regex::NoExpand(&element)).into_owned()
        } else if declares(&out, "dc") {
            insert_before_root_end(&out, &element)
        } else {
            out
        };
    }

    out
}

fn declares(xml: &str, prefix: &str) -> bool {
    xml.contains(&format!("xmlns:{}=", prefix))
}

fn insert_before_root_end(xml: &str, element: &str) -> String {
    match ROOT_END.find(xml) {
        Some(m) => format!("{}{}{}", &xml[..m.start()], element, &xml[m.start()..]),
        None => xml.to_string(),
    }
}

/// Rewrite the main part content type of a template package so the output
/// opens as a document. Returns `None` when nothing changes.
pub fn document_content_types(xml: &str, kind: PackageKind) -> Option<String> {
    if !kind.is_template() {
        return None;
    }
    let from = kind.content_type();
    let to = kind.as_document().content_type();
    xml.contains(from).then(|| xml.replace(from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DOCUMENT_MAIN, TEMPLATE_MAIN};
    use chrono::TimeZone;

    const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Template</dc:title><dc:creator>someone</dc:creator><dcterms:modified xsi:type="dcterms:W3CDTF">2020-01-01T00:00:00Z</dcterms:modified></cp:coreProperties>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    #[test]
    fn test_replaces_existing_elements() {
        let out = update_core_properties(CORE, Some("Q3 <Report>"), now());
        assert!(out.contains(
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">2024-05-06T07:08:09Z</dcterms:modified>"#
        ));
        assert!(out.contains("<dc:title>Q3 &lt;Report&gt;</dc:title>"));
        assert!(!out.contains("2020-01-01"));
        assert!(out.contains("<dc:creator>someone</dc:creator>"));
    }

    #[test]
    fn test_inserts_missing_elements() {
        let bare = r#"<cp:coreProperties xmlns:cp="x" xmlns:dc="d" xmlns:dcterms="t" xmlns:xsi="i"></cp:coreProperties>"#;
        let out = update_core_properties(bare, Some("Title"), now());
        assert!(out.ends_with("<dc:title>Title</dc:title></cp:coreProperties>"));
        assert!(out.contains("2024-05-06T07:08:09Z</dcterms:modified><dc:title>"));
    }

    #[test]
    fn test_blank_title_keeps_existing() {
        let out = update_core_properties(CORE, Some("  "), now());
        assert!(out.contains("<dc:title>Template</dc:title>"));
        let out = update_core_properties(CORE, None, now());
        assert!(out.contains("<dc:title>Template</dc:title>"));
    }

    #[test]
    fn test_undeclared_namespace_left_alone() {
        let bare = r#"<cp:coreProperties xmlns:cp="x"></cp:coreProperties>"#;
        assert_eq!(update_core_properties(bare, Some("T"), now()), bare);
    }

    #[test]
    fn test_template_content_type_rewritten() {
        let types = format!(
            r#"<Types><Override PartName="/word/document.xml" ContentType="{}"/></Types>"#,
            TEMPLATE_MAIN
        );
        let out = document_content_types(&types, PackageKind::Template).unwrap();
        assert!(out.contains(DOCUMENT_MAIN));
        assert!(!out.contains(TEMPLATE_MAIN));
        assert!(document_content_types(&types, PackageKind::Document).is_none());
    }
}
