//! XML element handles for structured parts.
//!
//! Parts that carry XML content hold an [`XmlElement`]: the part's bytes,
//! validated on load and queried on demand with streaming event reads. No DOM
//! is built; serialization returns the stored bytes unchanged, which keeps
//! round-trips byte-faithful.

use crate::opc::error::{OpcError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// A handle to a part's XML document.
///
/// Owns the raw UTF-8 bytes of the document. Queries use quick-xml streaming
/// reads with byte-level tag matching so repeated access stays cheap without
/// a parsed tree.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The XML content as raw bytes (UTF-8 encoded)
    xml: Vec<u8>,
}

impl XmlElement {
    /// Parse a blob into an element handle.
    ///
    /// Validates that the bytes are UTF-8 and well-formed by scanning every
    /// event once. Corrupt part content fails the load here rather than at
    /// first query.
    pub fn parse(xml: Vec<u8>) -> Result<Self> {
        std::str::from_utf8(&xml)
            .map_err(|e| OpcError::XmlError(format!("invalid UTF-8 in XML part: {}", e)))?;

        let elm = Self { xml };
        let mut reader = elm.reader();
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
            }
        }
        Ok(elm)
    }

    /// Serialize the element back to bytes.
    #[inline]
    pub fn serialize(&self) -> &[u8] {
        &self.xml
    }

    /// Get a reader for streaming over the document.
    fn reader(&self) -> Reader<&[u8]> {
        let mut reader = Reader::from_reader(self.xml.as_slice());
        reader.config_mut().trim_text(true);
        reader
    }

    /// Get the local name of the document element.
    pub fn root_local_name(&self) -> Result<Option<String>> {
        let mut reader = self.reader();
        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let name = std::str::from_utf8(e.local_name().as_ref())?.to_string();
                    return Ok(Some(name));
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {}
            }
        }
    }

    /// Collect the `r:id` attribute values of every element with the given
    /// local name, in document order.
    ///
    /// The relationship-id attribute may appear as `r:id` or under another
    /// prefix bound to the relationships namespace; matching accepts any
    /// attribute whose local name is `id` and whose value has the `rId` form.
    pub fn rel_ids(&self, element_name: &str) -> Result<Vec<String>> {
        let mut reader = self.reader();
        let element_name_bytes = element_name.as_bytes();
        let mut rids = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == element_name_bytes {
                        for attr in e.attributes() {
                            let attr = attr?;
                            let key = attr.key.as_ref();
                            if key == b"r:id" || attr.key.local_name().as_ref() == b"id" {
                                let rid = std::str::from_utf8(&attr.value)?;
                                if rid.starts_with("rId") {
                                    rids.push(rid.to_string());
                                    break;
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {}
            }
        }

        Ok(rids)
    }

    /// Get an attribute value from the first element with the given local name.
    pub fn attr_of(&self, element_name: &str, attr_name: &str) -> Result<Option<String>> {
        let mut reader = self.reader();
        let element_name_bytes = element_name.as_bytes();
        let attr_name_bytes = attr_name.as_bytes();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == element_name_bytes {
                        for attr in e.attributes() {
                            let attr = attr?;
                            if attr.key.as_ref() == attr_name_bytes {
                                return Ok(Some(attr.unescape_value()?.to_string()));
                            }
                        }
                        return Ok(None);
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {}
            }
        }
    }

    /// Get the text content of the first element whose qualified name matches
    /// any of the given names.
    pub fn text_of(&self, qnames: &[&str]) -> Result<Option<String>> {
        let mut reader = self.reader();
        let mut in_target = false;
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = e.name();
                    if qnames.iter().any(|q| name.as_ref() == q.as_bytes()) {
                        in_target = true;
                    }
                }
                Ok(Event::Text(ref e)) if in_target => {
                    text.push_str(std::str::from_utf8(e.as_ref())?);
                }
                Ok(Event::End(_)) if in_target => {
                    if text.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(text));
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {}
            }
        }
    }

    /// Check whether an element with the given local name appears anywhere in
    /// the document.
    pub fn has_element(&self, local_name: &str) -> Result<bool> {
        let mut reader = self.reader();
        let name_bytes = local_name.as_bytes();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == name_bytes {
                        return Ok(true);
                    }
                }
                Ok(Event::Eof) => return Ok(false),
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLD_ID_LST: &[u8] = br#"<?xml version="1.0"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:sldIdLst>
    <p:sldId id="256" r:id="rId4"/>
    <p:sldId id="257" r:id="rId2"/>
  </p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000"/>
</p:presentation>"#;

    #[test]
    fn test_parse_rejects_bad_xml() {
        assert!(XmlElement::parse(b"<open><mismatch></open>".to_vec()).is_err());
        assert!(XmlElement::parse(vec![0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_serialize_returns_stored_bytes() {
        let elm = XmlElement::parse(SLD_ID_LST.to_vec()).unwrap();
        assert_eq!(elm.serialize(), SLD_ID_LST);
    }

    #[test]
    fn test_rel_ids_in_document_order() {
        let elm = XmlElement::parse(SLD_ID_LST.to_vec()).unwrap();
        assert_eq!(elm.rel_ids("sldId").unwrap(), vec!["rId4", "rId2"]);
        assert!(elm.rel_ids("sldMasterId").unwrap().is_empty());
    }

    #[test]
    fn test_attr_of() {
        let elm = XmlElement::parse(SLD_ID_LST.to_vec()).unwrap();
        assert_eq!(elm.attr_of("sldSz", "cx").unwrap().as_deref(), Some("9144000"));
        assert_eq!(elm.attr_of("sldSz", "missing").unwrap(), None);
    }

    #[test]
    fn test_text_of() {
        let xml = br#"<cp:coreProperties xmlns:cp="c" xmlns:dc="d"><dc:title>Budget Review</dc:title></cp:coreProperties>"#;
        let elm = XmlElement::parse(xml.to_vec()).unwrap();
        assert_eq!(
            elm.text_of(&["dc:title", "cp:title"]).unwrap().as_deref(),
            Some("Budget Review")
        );
        assert_eq!(elm.text_of(&["dc:creator"]).unwrap(), None);
    }

    #[test]
    fn test_has_element() {
        let elm = XmlElement::parse(SLD_ID_LST.to_vec()).unwrap();
        assert!(elm.has_element("sldIdLst").unwrap());
        assert!(!elm.has_element("dLbls").unwrap());
    }

    #[test]
    fn test_root_local_name() {
        let elm = XmlElement::parse(SLD_ID_LST.to_vec()).unwrap();
        assert_eq!(elm.root_local_name().unwrap().as_deref(), Some("presentation"));
    }
}
