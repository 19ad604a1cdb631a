//! Core properties: the Dublin Core document metadata part.
//!
//! Stored at `/docProps/core.xml`. A package is not required to carry one;
//! the package accessor materializes this default on first access when the
//! relationship is absent.

use crate::opc::constants::content_type as ct;
use crate::opc::error::Result;
use crate::opc::packuri::PackURI;
use crate::opc::part::{Part, PartRc};
use crate::opc::rel::Relationships;
use crate::oxml::XmlElement;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Baseline core properties document, used when a package has none.
const DEFAULT_CORE_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>PowerPoint Presentation</dc:title>
  <cp:revision>1</cp:revision>
</cp:coreProperties>"#;

/// The standard partname for the core properties part.
const CORE_PROPS_PARTNAME: &str = "/docProps/core.xml";

/// The core properties part, holding Dublin Core document metadata.
pub struct CoreProperties {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The coreProperties document element
    element: XmlElement,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl CoreProperties {
    /// Load a core properties part from a stored record.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        let element = XmlElement::parse(blob)?;
        let rels = Relationships::new(partname.base_uri().to_string());
        Ok(Self {
            partname,
            content_type,
            element,
            rels,
        })
    }

    /// Build a default core properties part at the standard partname.
    ///
    /// Used by the package accessor to satisfy the singleton contract on
    /// packages that carry no core properties part.
    pub fn default_part() -> Result<PartRc> {
        let partname = PackURI::new(CORE_PROPS_PARTNAME)
            .map_err(crate::opc::error::OpcError::InvalidPackUri)?;
        let part = Self::load(
            partname,
            ct::OPC_CORE_PROPERTIES.to_string(),
            DEFAULT_CORE_PROPS_XML.as_bytes().to_vec(),
        )?;
        Ok(Rc::new(RefCell::new(part)))
    }

    /// Get the document title.
    pub fn title(&self) -> Result<Option<String>> {
        self.element.text_of(&["dc:title", "cp:title"])
    }

    /// Get the document subject.
    pub fn subject(&self) -> Result<Option<String>> {
        self.element.text_of(&["dc:subject", "cp:subject"])
    }

    /// Get the document author.
    pub fn author(&self) -> Result<Option<String>> {
        self.element.text_of(&["dc:creator", "cp:creator"])
    }

    /// Get the name of the last modifier.
    pub fn last_modified_by(&self) -> Result<Option<String>> {
        self.element.text_of(&["cp:lastModifiedBy"])
    }

    /// Get the document keywords.
    pub fn keywords(&self) -> Result<Option<String>> {
        self.element.text_of(&["cp:keywords"])
    }

    /// Get the revision number.
    ///
    /// Non-numeric revision text reads as None.
    pub fn revision(&self) -> Result<Option<u32>> {
        Ok(self
            .element
            .text_of(&["cp:revision"])?
            .and_then(|text| text.trim().parse::<u32>().ok()))
    }

    /// Get the creation timestamp.
    ///
    /// Unparseable timestamp text reads as None.
    pub fn created(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .element
            .text_of(&["dcterms:created"])?
            .and_then(|text| parse_datetime(&text)))
    }

    /// Get the last-modified timestamp.
    pub fn modified(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .element
            .text_of(&["dcterms:modified"])?
            .and_then(|text| parse_datetime(&text)))
    }
}

impl Part for CoreProperties {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        self.element.serialize()
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Parse a W3CDTF/ISO 8601 datetime as stored in core properties.
///
/// Accepts RFC 3339 with offset, and naive forms with or without fractional
/// seconds and trailing Z, assumed UTC.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, format) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const CORE_XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
                   xmlns:dc="http://purl.org/dc/elements/1.1/"
                   xmlns:dcterms="http://purl.org/dc/terms/">
    <dc:title>Quarterly Review</dc:title>
    <dc:creator>A. Uthor</dc:creator>
    <cp:lastModifiedBy>E. Ditor</cp:lastModifiedBy>
    <cp:revision>5</cp:revision>
    <dcterms:created>2013-10-10T14:30:00Z</dcterms:created>
    <dcterms:modified>2013-10-11T09:00:00Z</dcterms:modified>
</cp:coreProperties>"#;

    fn core_props() -> CoreProperties {
        CoreProperties::load(
            PackURI::new("/docProps/core.xml").unwrap(),
            ct::OPC_CORE_PROPERTIES.to_string(),
            CORE_XML.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_accessors() {
        let props = core_props();
        assert_eq!(props.title().unwrap().as_deref(), Some("Quarterly Review"));
        assert_eq!(props.author().unwrap().as_deref(), Some("A. Uthor"));
        assert_eq!(
            props.last_modified_by().unwrap().as_deref(),
            Some("E. Ditor")
        );
        assert_eq!(props.revision().unwrap(), Some(5));
        assert_eq!(props.subject().unwrap(), None);

        let created = props.created().unwrap().unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2013, 10, 10));
        assert!(props.modified().unwrap().is_some());
    }

    #[test]
    fn test_default_part() {
        let part = CoreProperties::default_part().unwrap();
        let part = part.borrow();
        assert_eq!(part.partname().as_str(), "/docProps/core.xml");
        assert_eq!(part.content_type(), ct::OPC_CORE_PROPERTIES);

        let props = part.as_any().downcast_ref::<CoreProperties>().unwrap();
        assert_eq!(
            props.title().unwrap().as_deref(),
            Some("PowerPoint Presentation")
        );
        assert_eq!(props.revision().unwrap(), Some(1));
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert!(parse_datetime("2013-10-10T14:30:00Z").is_some());
        assert!(parse_datetime("2013-10-10T14:30:00.123456Z").is_some());
        assert!(parse_datetime("2013-10-10T14:30:00").is_some());
        assert!(parse_datetime("not-a-date").is_none());
    }
}
