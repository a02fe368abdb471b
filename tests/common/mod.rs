//! In-memory DOCX fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub const DOCUMENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
pub const TEMPLATE_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml";

/// Style definitions with outline-level headings under non-standard ids,
/// title/subtitle styles and a bullet list style.
pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
  <w:style w:type="paragraph" w:styleId="S1"><w:name w:val="Chapter"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
  <w:style w:type="paragraph" w:styleId="S2"><w:name w:val="Part"/><w:basedOn w:val="S1"/><w:pPr><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:sz w:val="28"/></w:rPr></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:rPr><w:sz w:val="48"/></w:rPr></w:style>
  <w:style w:type="paragraph" w:styleId="Subtitle"><w:name w:val="Subtitle"/></w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/></w:style>
</w:styles>"#;

pub const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:accent1><a:srgbClr val="4472C4"/></a:accent1></a:clrScheme></a:themeElements></a:theme>"#;

pub const CORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>Template</dc:title><dcterms:modified xsi:type="dcterms:W3CDTF">2020-01-01T00:00:00Z</dcterms:modified></cp:coreProperties>"#;

/// A paragraph of the fixture document.
#[derive(Debug, Clone)]
pub struct Para {
    pub style: Option<String>,
    pub runs: Vec<String>,
    pub page_break_after: bool,
}

/// Plain paragraph with one run.
pub fn para(text: &str) -> Para {
    Para {
        style: None,
        runs: vec![text.to_string()],
        page_break_after: false,
    }
}

/// Styled paragraph with one run.
pub fn styled(style: &str, text: &str) -> Para {
    Para {
        style: Some(style.to_string()),
        runs: vec![text.to_string()],
        page_break_after: false,
    }
}

/// Paragraph whose text is split over several runs.
pub fn split(runs: &[&str]) -> Para {
    Para {
        style: None,
        runs: runs.iter().map(|r| r.to_string()).collect(),
        page_break_after: false,
    }
}

impl Para {
    pub fn with_page_break(mut self) -> Self {
        self.page_break_after = true;
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("<w:p>");
        if let Some(style) = &self.style {
            xml.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style));
        }
        for run in &self.runs {
            xml.push_str(&format!(
                r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
                escape(run)
            ));
        }
        if self.page_break_after {
            xml.push_str(r#"<w:r><w:br w:type="page"/></w:r>"#);
        }
        xml.push_str("</w:p>");
        xml
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Builder for a template package.
#[derive(Debug, Clone)]
pub struct DocxBuilder {
    main_part: String,
    styles_part: Option<String>,
    template: bool,
    body: Vec<Para>,
    header: Option<Vec<Para>>,
    header_image: Option<Vec<u8>>,
    theme: bool,
    core: bool,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            main_part: "word/document.xml".to_string(),
            styles_part: Some("word/styles.xml".to_string()),
            template: false,
            body: Vec::new(),
            header: None,
            header_image: None,
            theme: false,
            core: true,
        }
    }

    /// Store the main document under a non-conventional name.
    pub fn main_part(mut self, path: &str) -> Self {
        self.main_part = path.to_string();
        self
    }

    /// Store the styles under a non-conventional name, or omit them.
    pub fn styles_part(mut self, path: Option<&str>) -> Self {
        self.styles_part = path.map(str::to_string);
        self
    }

    /// Declare the main part with the template content type.
    pub fn as_template(mut self) -> Self {
        self.template = true;
        self
    }

    pub fn paragraph(mut self, para: Para) -> Self {
        self.body.push(para);
        self
    }

    pub fn paragraphs(mut self, paras: impl IntoIterator<Item = Para>) -> Self {
        self.body.extend(paras);
        self
    }

    pub fn header(mut self, paras: Vec<Para>) -> Self {
        self.header = Some(paras);
        self
    }

    /// Add an image anchored behind the header text.
    pub fn header_image(mut self, png: Vec<u8>) -> Self {
        self.header_image = Some(png);
        self
    }

    pub fn theme(mut self) -> Self {
        self.theme = true;
        self
    }

    pub fn without_core(mut self) -> Self {
        self.core = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let (dir, file) = self.main_part.rsplit_once('/').unwrap_or(("", &self.main_part));
        let doc_rels_path = if dir.is_empty() {
            format!("_rels/{}.rels", file)
        } else {
            format!("{}/_rels/{}.rels", dir, file)
        };

        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();
        parts.push(("[Content_Types].xml".into(), self.content_types().into_bytes()));
        parts.push(("_rels/.rels".into(), self.package_rels().into_bytes()));
        parts.push((self.main_part.clone(), self.document_xml().into_bytes()));

        let mut doc_rels = Vec::new();
        if let Some(styles) = &self.styles_part {
            parts.push((styles.clone(), STYLES.as_bytes().to_vec()));
            doc_rels.push(rel("rIdStyles", "styles", &relative(dir, styles)));
        }
        if self.header.is_some() {
            let header_path = join(dir, "header1.xml");
            parts.push((header_path.clone(), self.header_xml().into_bytes()));
            doc_rels.push(rel("rIdHeader1", "header", "header1.xml"));
            if let Some(png) = &self.header_image {
                let media = join(dir, "media/image1.png");
                parts.push((media, png.clone()));
                parts.push((
                    join(dir, "_rels/header1.xml.rels"),
                    rels_xml(&[rel("rIdImg1", "image", "media/image1.png")]).into_bytes(),
                ));
            }
        }
        if self.theme {
            parts.push((join(dir, "theme/theme1.xml"), THEME.as_bytes().to_vec()));
            doc_rels.push(rel("rIdTheme", "theme", "theme/theme1.xml"));
        }
        parts.push((doc_rels_path, rels_xml(&doc_rels).into_bytes()));
        if self.core {
            parts.push(("docProps/core.xml".into(), CORE.as_bytes().to_vec()));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in parts {
            writer.start_file(name, options).unwrap();
            writer.write_all(&data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn content_types(&self) -> String {
        let main_type = if self.template { TEMPLATE_TYPE } else { DOCUMENT_TYPE };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/{}" ContentType="{}"/></Types>"#,
            self.main_part, main_type
        )
    }

    fn package_rels(&self) -> String {
        let mut rels = vec![rel("rId1", "officeDocument", &self.main_part)];
        if self.core {
            rels.push(format!(
                r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#
            ));
        }
        rels_xml(&rels)
    }

    fn document_xml(&self) -> String {
        let body: String = self.body.iter().map(Para::to_xml).collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{}" xmlns:r="{}"><w:body>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="851" w:footer="992"/></w:sectPr></w:body></w:document>"#,
            W_NS, R_NS, body
        )
    }

    fn header_xml(&self) -> String {
        let mut content: String = self
            .header
            .iter()
            .flatten()
            .map(Para::to_xml)
            .collect();
        if self.header_image.is_some() {
            content.push_str(
                r#"<w:p><w:r><w:drawing><wp:anchor behindDoc="1"><a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="rIdImg1"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:anchor></w:drawing></w:r></w:p>"#,
            );
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="{}" xmlns:r="{}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">{}</w:hdr>"#,
            W_NS, R_NS, content
        )
    }
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn rel(id: &str, kind: &str, target: &str) -> String {
    format!(
        r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
        id, REL_BASE, kind, target
    )
}

fn rels_xml(rels: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels.concat()
    )
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Target of `path` relative to the directory `dir`.
fn relative(dir: &str, path: &str) -> String {
    match path.strip_prefix(dir).and_then(|p| p.strip_prefix('/')) {
        Some(rest) if !dir.is_empty() => rest.to_string(),
        _ => format!("/{}", path),
    }
}

/// Read one part of a built package as text.
pub fn read_part(bytes: &[u8], name: &str) -> Option<String> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;
    let mut file = archive.by_name(name).ok()?;
    let mut text = String::new();
    file.read_to_string(&mut text).ok()?;
    Some(text)
}

/// Names of all entries of a built package.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Count `<w:p>`/`<w:p ...>` paragraph openings in a part.
pub fn paragraph_count(xml: &str) -> usize {
    xml.matches("<w:p>").count() + xml.matches("<w:p ").count()
}

/// Smallest valid-looking PNG payload.
pub fn png() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 24]);
    data
}
