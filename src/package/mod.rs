//! In-memory OOXML package.
//!
//! A [`Package`] holds every entry of the ZIP container in its original order.
//! Template analysis reads parts from it; the composer rewrites the parts it
//! changes and writes the whole package back out once.

pub mod rels;
pub mod wordml;
pub mod xml;

pub use rels::{CorePaths, PartLocation, Relationship, RelationshipResolver};
pub use wordml::{BodyItem, Paragraph, ParagraphContent, Run, RunContent, RunFormat, WordPart};

use crate::detect::{self, PackageFormat};
use crate::error::{Error, Result};
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A single package entry.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
}

/// An OOXML package loaded into memory.
#[derive(Debug, Clone)]
pub struct Package {
    entries: Vec<Entry>,
}

impl Package {
    /// Open a package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Load a package from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !detect::is_zip_bytes(data) {
            return Err(Error::UnknownFormat);
        }

        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(Entry { name, data });
        }

        Ok(Self { entries })
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Check if the package contains a part.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Raw bytes of a part.
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.find(name).map(|i| self.entries[i].data.as_slice())
    }

    /// A part decoded as UTF-8 text, with any byte order mark removed.
    pub fn read_string(&self, name: &str) -> Result<Option<String>> {
        match self.read(name) {
            Some(data) => String::from_utf8(xml::strip_bom(data).to_vec())
                .map(Some)
                .map_err(|e| Error::InvalidPart(format!("{}: {}", name, e))),
            None => Ok(None),
        }
    }

    /// Replace a part, or append it when absent.
    pub fn write(&mut self, name: &str, data: Vec<u8>) {
        match self.find(name) {
            Some(i) => self.entries[i].data = data,
            None => self.entries.push(Entry {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// Detected package format from `[Content_Types].xml`.
    pub fn format(&self) -> Option<PackageFormat> {
        let xml = self.read_string("[Content_Types].xml").ok().flatten()?;
        detect::format_from_content_types(&xml)
    }

    /// Serialize the package to ZIP bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(&entry.data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn find(&self, name: &str) -> Option<usize> {
        let name = name.trim_start_matches('/');
        self.entries.iter().position(|e| e.name == name)
    }
}
