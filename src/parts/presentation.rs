//! The main presentation part.
//!
//! Corresponds to `/ppt/presentation.xml`: presentation-level properties plus
//! the ordered references to slides and slide masters.

use crate::opc::constants::relationship_type as rt;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use crate::opc::part::{Part, PartRc};
use crate::opc::rel::Relationships;
use crate::oxml::XmlElement;
use crate::parts::slides::PartCollection;
use once_cell::unsync::OnceCell;
use std::any::Any;

/// The presentation part: top of the presentation object model.
pub struct Presentation {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The presentation document element
    element: XmlElement,

    /// Relationships from this part to other parts
    rels: Relationships,

    /// Slide masters, populated once the full graph exists
    slidemasters: PartCollection,

    /// Slides, built lazily on first access from the sldIdLst
    slides: OnceCell<SlideCollection>,
}

impl Presentation {
    /// Load a presentation part from a stored record.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<Self> {
        let element = XmlElement::parse(blob)?;
        let rels = Relationships::new(partname.base_uri().to_string());
        Ok(Self {
            partname,
            content_type,
            element,
            rels,
            slidemasters: PartCollection::new(),
            slides: OnceCell::new(),
        })
    }

    /// Get the presentation document element.
    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    /// The slide masters belonging to this presentation, partname-ordered.
    pub fn slidemasters(&self) -> &PartCollection {
        &self.slidemasters
    }

    /// The slides of this presentation, in `sldIdLst` document order.
    ///
    /// Built on first access by resolving each `<p:sldId>` rId through this
    /// part's relationship collection; cached thereafter. A `sldId` naming an
    /// unknown rId is an error.
    pub fn slides(&self) -> Result<&SlideCollection> {
        self.slides
            .get_or_try_init(|| SlideCollection::from_element(&self.element, &self.rels))
    }

    /// Get the slide width in EMU, if the presentation declares a slide size.
    pub fn slide_width(&self) -> Result<Option<i64>> {
        self.sld_sz_attr("cx")
    }

    /// Get the slide height in EMU, if the presentation declares a slide size.
    pub fn slide_height(&self) -> Result<Option<i64>> {
        self.sld_sz_attr("cy")
    }

    fn sld_sz_attr(&self, attr: &str) -> Result<Option<i64>> {
        match self.element.attr_of("sldSz", attr)? {
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|e| OpcError::XmlError(format!("invalid slide size: {}", e))),
            None => Ok(None),
        }
    }
}

impl Part for Presentation {
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

    /// Pull slide masters out of the wired relationship graph.
    fn after_unmarshal(&mut self) {
        let masters: Vec<PartRc> = self
            .rels
            .iter()
            .filter(|rel| rel.reltype() == rt::SLIDE_MASTER)
            .filter_map(|rel| rel.part())
            .collect();
        for master in masters {
            self.slidemasters.add_part(master);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The slides of a presentation, in show order.
///
/// Show order comes from the `sldIdLst` element, not from partnames or rIds.
#[derive(Debug)]
pub struct SlideCollection {
    slides: Vec<PartRc>,
}

impl SlideCollection {
    fn from_element(element: &XmlElement, rels: &Relationships) -> Result<Self> {
        let mut slides = Vec::new();
        for r_id in element.rel_ids("sldId")? {
            let rel = rels.get(&r_id).ok_or_else(|| {
                OpcError::RelationshipNotFound(format!(
                    "sldId references unknown relationship '{}'",
                    r_id
                ))
            })?;
            slides.push(rel.target_part()?);
        }
        Ok(Self { slides })
    }

    /// Get the number of slides.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Check whether the presentation has no slides.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Get a slide by show-order index.
    pub fn get(&self, idx: usize) -> Option<PartRc> {
        self.slides.get(idx).cloned()
    }

    /// Iterate over the slides in show order.
    pub fn iter(&self) -> impl Iterator<Item = &PartRc> {
        self.slides.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;
    use crate::opc::rel::RelTarget;
    use crate::parts::slides::Slide;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PRES_XML: &[u8] = br#"<?xml version="1.0"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
  <p:sldIdLst>
    <p:sldId id="256" r:id="rId3"/>
    <p:sldId id="257" r:id="rId2"/>
  </p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000"/>
</p:presentation>"#;

    fn make_slide(partname: &str) -> PartRc {
        let slide = Slide::load(
            PackURI::new(partname).unwrap(),
            ct::PML_SLIDE.to_string(),
            br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld/></p:sld>"#.to_vec(),
        )
        .unwrap();
        Rc::new(RefCell::new(slide))
    }

    fn loaded_presentation() -> Presentation {
        let mut pres = Presentation::load(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            PRES_XML.to_vec(),
        )
        .unwrap();

        let s2 = make_slide("/ppt/slides/slide2.xml");
        let s3 = make_slide("/ppt/slides/slide3.xml");
        pres.rels_mut()
            .add_relationship(rt::SLIDE, RelTarget::Part(s3), "rId3")
            .unwrap();
        pres.rels_mut()
            .add_relationship(rt::SLIDE, RelTarget::Part(s2), "rId2")
            .unwrap();
        pres
    }

    #[test]
    fn test_slides_follow_sld_id_lst_order() {
        let pres = loaded_presentation();
        let slides = pres.slides().unwrap();
        assert_eq!(slides.len(), 2);

        // sldIdLst names rId3 first, rId2 second
        let first = slides.get(0).unwrap();
        assert_eq!(first.borrow().partname().as_str(), "/ppt/slides/slide3.xml");
        let second = slides.get(1).unwrap();
        assert_eq!(second.borrow().partname().as_str(), "/ppt/slides/slide2.xml");
    }

    #[test]
    fn test_slides_initializer_runs_once() {
        let pres = loaded_presentation();
        let first = pres.slides().unwrap() as *const SlideCollection;
        let second = pres.slides().unwrap() as *const SlideCollection;
        assert_eq!(first, second);
    }

    #[test]
    fn test_slides_unknown_rid_is_error() {
        let pres = Presentation::load(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            PRES_XML.to_vec(),
        )
        .unwrap();
        // no relationships wired at all
        assert!(matches!(
            pres.slides().unwrap_err(),
            OpcError::RelationshipNotFound(_)
        ));
    }

    #[test]
    fn test_no_sld_id_lst_means_no_slides() {
        let pres = Presentation::load(
            PackURI::new("/ppt/presentation.xml").unwrap(),
            ct::PML_PRESENTATION_MAIN.to_string(),
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#.to_vec(),
        )
        .unwrap();
        assert!(pres.slides().unwrap().is_empty());
    }

    #[test]
    fn test_after_unmarshal_pulls_slide_masters() {
        let mut pres = loaded_presentation();
        let master = make_slide("/ppt/slideMasters/slideMaster1.xml");
        pres.rels_mut()
            .add_relationship(rt::SLIDE_MASTER, RelTarget::Part(master.clone()), "rId1")
            .unwrap();

        assert!(pres.slidemasters().is_empty());
        pres.after_unmarshal();
        assert_eq!(pres.slidemasters().len(), 1);
        assert!(Rc::ptr_eq(&pres.slidemasters().get(0).unwrap(), &master));
    }

    #[test]
    fn test_slide_size() {
        let pres = loaded_presentation();
        assert_eq!(pres.slide_width().unwrap(), Some(9144000));
        assert_eq!(pres.slide_height().unwrap(), Some(6858000));
    }

    #[test]
    fn test_blob_round_trips_element() {
        let pres = loaded_presentation();
        assert_eq!(pres.blob(), PRES_XML);
    }
}
