//! Serializes a live package back to its container form.
//!
//! Saving is a one-shot full rewrite: walk the live part graph, emit
//! `[Content_Types].xml`, the package `.rels`, then every visited part's
//! current blob and its `.rels`. Nothing is diffed against the source
//! container.

use crate::opc::constants::content_type as ct;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::part::{Part, PartRc};
use crate::opc::phys_pkg::PhysPkgWriter;
use crate::opc::rel::escape_xml;
use crate::package::Package;
use log::debug;
use std::collections::HashMap;
use std::path::Path;

/// Package writer that serializes a live package to a ZIP container.
pub struct PackageWriter;

impl PackageWriter {
    /// Write a package to a file.
    pub fn write<P: AsRef<Path>>(path: P, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write a package to a stream.
    pub fn write_to_stream<W: std::io::Write>(mut writer: W, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize a package to container bytes.
    pub fn to_bytes(package: &Package) -> Result<Vec<u8>> {
        let parts = package.parts();
        let mut phys_writer = PhysPkgWriter::new();

        Self::write_content_types(&mut phys_writer, &parts)?;
        Self::write_pkg_rels(&mut phys_writer, package)?;
        Self::write_parts(&mut phys_writer, &parts)?;

        debug!("marshalled {} parts", parts.len());
        phys_writer.finish()
    }

    /// Write the `[Content_Types].xml` member.
    fn write_content_types(phys_writer: &mut PhysPkgWriter, parts: &[PartRc]) -> Result<()> {
        let cti = ContentTypesItem::from_parts(parts);
        let blob = cti.to_xml();

        let content_types_uri =
            PackURI::new(CONTENT_TYPES_URI).map_err(OpcError::InvalidPackUri)?;
        phys_writer.write(&content_types_uri, blob.as_bytes())
    }

    /// Write the package-level `.rels` member.
    fn write_pkg_rels(phys_writer: &mut PhysPkgWriter, package: &Package) -> Result<()> {
        let package_uri = PackURI::new(PACKAGE_URI).map_err(OpcError::InvalidPackUri)?;
        let rels_uri = package_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
        let rels_xml = package.rels().to_xml();
        phys_writer.write(&rels_uri, rels_xml.as_bytes())
    }

    /// Write every part's blob and, when non-empty, its `.rels` member.
    fn write_parts(phys_writer: &mut PhysPkgWriter, parts: &[PartRc]) -> Result<()> {
        for part in parts {
            let part = part.borrow();
            phys_writer.write(part.partname(), part.blob())?;

            if !part.rels().is_empty() {
                let rels_uri = part
                    .partname()
                    .rels_uri()
                    .map_err(OpcError::InvalidPackUri)?;
                let rels_xml = part.rels().to_xml();
                phys_writer.write(&rels_uri, rels_xml.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Builder for `[Content_Types].xml`.
///
/// Well-known extension/content-type pairs become Default elements;
/// everything else gets an Override for its specific partname.
struct ContentTypesItem {
    /// Default content types by extension
    defaults: HashMap<String, String>,

    /// Override content types by partname
    overrides: HashMap<String, String>,
}

impl ContentTypesItem {
    fn new() -> Self {
        let mut defaults = HashMap::new();

        // every package carries these two
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    /// Build the content types item from the visited part set.
    fn from_parts(parts: &[PartRc]) -> Self {
        let mut cti = Self::new();

        for part in parts {
            let part = part.borrow();
            cti.add_content_type(part.partname(), part.content_type());
        }

        cti
    }

    fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_lowercase();

        if Self::is_default_content_type(&ext, content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    /// Check if an extension/content-type pair is a standard default.
    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("png", ct::PNG)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("gif", ct::GIF)
                | ("bmp", ct::BMP)
                | ("tiff", ct::TIFF)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
        )
    }

    /// Generate the XML for `[Content_Types].xml`.
    ///
    /// Entries are sorted for deterministic output.
    fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        xml.push('\n');

        let mut exts: Vec<_> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            let content_type = &self.defaults[ext];
            xml.push_str(&format!(
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        let mut partnames: Vec<_> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            let content_type = &self.overrides[partname];
            xml.push_str(&format!(
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
            xml.push('\n');
        }

        xml.push_str("</Types>");

        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types_xml() {
        let mut cti = ContentTypesItem::new();
        cti.add_content_type(
            &PackURI::new("/ppt/media/image1.png").unwrap(),
            ct::PNG,
        );
        cti.add_content_type(
            &PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN,
        );

        let xml = cti.to_xml();

        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/ppt/presentation.xml""#));
        // presentation.xml must not shadow the xml default
        assert!(xml.contains(r#"<Default Extension="xml" ContentType="application/xml"/>"#));
    }

    #[test]
    fn test_xml_escaping() {
        let escaped = escape_xml(r#"<foo & "bar">"#);
        assert_eq!(escaped, "&lt;foo &amp; &quot;bar&quot;&gt;");
    }
}
