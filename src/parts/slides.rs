//! Slide, slide layout, and slide master parts.

use crate::opc::constants::relationship_type as rt;
use crate::opc::error::Result;
use crate::opc::packuri::PackURI;
use crate::opc::part::{Part, PartRc};
use crate::opc::rel::Relationships;
use crate::oxml::XmlElement;
use std::any::Any;

/// A slide part, `/ppt/slides/slideN.xml`.
pub struct Slide {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The slide document element
    element: XmlElement,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl Slide {
    /// Load a slide part from a stored record.
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

    /// Get the slide name (the `name` attribute of `cSld`), if set.
    pub fn name(&self) -> Result<Option<String>> {
        self.element.attr_of("cSld", "name")
    }

    /// The slide layout this slide inherits from, if related.
    pub fn slide_layout(&self) -> Result<PartRc> {
        self.rels.part_with_reltype(rt::SLIDE_LAYOUT)
    }

    /// Get the slide document element.
    pub fn element(&self) -> &XmlElement {
        &self.element
    }
}

impl Part for Slide {
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

/// A slide layout part, `/ppt/slideLayouts/slideLayoutN.xml`.
pub struct SlideLayout {
    partname: PackURI,
    content_type: String,
    element: XmlElement,
    rels: Relationships,
}

impl SlideLayout {
    /// Load a slide layout part from a stored record.
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

    /// Get the layout name (the `name` attribute of `cSld`), if set.
    pub fn name(&self) -> Result<Option<String>> {
        self.element.attr_of("cSld", "name")
    }

    /// The slide master this layout belongs to.
    ///
    /// This is the back edge of the master/layout cycle.
    pub fn slide_master(&self) -> Result<PartRc> {
        self.rels.part_with_reltype(rt::SLIDE_MASTER)
    }
}

impl Part for SlideLayout {
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

/// A slide master part, `/ppt/slideMasters/slideMasterN.xml`.
pub struct SlideMaster {
    partname: PackURI,
    content_type: String,
    element: XmlElement,
    rels: Relationships,
}

impl SlideMaster {
    /// Load a slide master part from a stored record.
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

    /// The slide layouts related to this master.
    pub fn slide_layouts(&self) -> Vec<PartRc> {
        self.rels
            .iter()
            .filter(|rel| rel.reltype() == rt::SLIDE_LAYOUT)
            .filter_map(|rel| rel.part())
            .collect()
    }
}

impl Part for SlideMaster {
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

/// A partname-ordered collection of part handles.
#[derive(Default)]
pub struct PartCollection {
    parts: Vec<PartRc>,
}

impl PartCollection {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Add a part, keeping the collection ordered by partname.
    pub fn add_part(&mut self, part: PartRc) {
        let partname = part.borrow().partname().to_string();
        let idx = self
            .parts
            .binary_search_by(|p| p.borrow().partname().as_str().cmp(partname.as_str()))
            .unwrap_or_else(|i| i);
        self.parts.insert(idx, part);
    }

    /// Get the number of parts in the collection.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get a part by index.
    pub fn get(&self, idx: usize) -> Option<PartRc> {
        self.parts.get(idx).cloned()
    }

    /// Iterate over the parts in partname order.
    pub fn iter(&self) -> impl Iterator<Item = &PartRc> {
        self.parts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_slide(partname: &str, xml: &[u8]) -> Slide {
        Slide::load(
            PackURI::new(partname).unwrap(),
            ct::PML_SLIDE.to_string(),
            xml.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_slide_name() {
        let slide = make_slide(
            "/ppt/slides/slide1.xml",
            br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Overview"/></p:sld>"#,
        );
        assert_eq!(slide.name().unwrap().as_deref(), Some("Overview"));

        let unnamed = make_slide(
            "/ppt/slides/slide2.xml",
            br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld/></p:sld>"#,
        );
        assert_eq!(unnamed.name().unwrap(), None);
    }

    #[test]
    fn test_part_collection_orders_by_partname() {
        let mut collection = PartCollection::new();
        for name in [
            "/ppt/slideMasters/slideMaster2.xml",
            "/ppt/slideMasters/slideMaster1.xml",
            "/ppt/slideMasters/slideMaster3.xml",
        ] {
            let part: PartRc = Rc::new(RefCell::new(make_slide(
                name,
                br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#,
            )));
            collection.add_part(part);
        }

        let names: Vec<String> = collection
            .iter()
            .map(|p| p.borrow().partname().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "/ppt/slideMasters/slideMaster1.xml",
                "/ppt/slideMasters/slideMaster2.xml",
                "/ppt/slideMasters/slideMaster3.xml",
            ]
        );
    }
}
