use crate::opc::constants::content_type as ct;
use crate::opc::error::Result;
use crate::opc::packuri::PackURI;
use crate::opc::rel::Relationships;
use memchr::memmem;
/// Package part objects.
///
/// Parts are the fundamental units of content in a package: each has a unique
/// partname, a content type, current content (`blob`), and a collection of
/// outgoing relationships. Live parts are shared through [`PartRc`] handles;
/// node identity is handle identity, and a part is dropped when its last
/// handle goes away.
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a live part.
///
/// Two handles denote the same graph node iff they point at the same
/// allocation (`Rc::ptr_eq`). Parts hold no back-reference to their package;
/// reverse lookup goes through the package instance registry.
pub type PartRc = Rc<RefCell<dyn Part>>;

/// Trait representing a part in a package.
pub trait Part: Any {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Serialize the current in-memory state of this part to bytes.
    ///
    /// Structured parts serialize their element handle; binary parts return
    /// their stored bytes.
    fn blob(&self) -> &[u8];

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Post-load hook, invoked exactly once after the full graph (all parts
    /// and all relationships) has been constructed.
    ///
    /// Override to perform type-specific linking that depends on sibling
    /// parts already existing. The default does nothing.
    fn after_unmarshal(&mut self) {}

    /// Upcast for downcasting to a concrete part type.
    fn as_any(&self) -> &dyn Any;

    /// Add or get a relationship of *reltype* to another part, returning its
    /// rId.
    fn relate_to(&mut self, target: PartRc, reltype: &str) -> String {
        let rel = self.rels_mut().get_or_add(reltype, target);
        rel.r_id().to_string()
    }

    /// Count references to a relationship ID in this part's content.
    ///
    /// Byte-level search for `r:id="..."` attribute references; non-XML parts
    /// naturally report zero.
    fn rel_ref_count(&self, r_id: &str) -> usize {
        let pattern = format!(r#"r:id="{}""#, r_id);
        let finder = memmem::Finder::new(pattern.as_bytes());
        finder.find_iter(self.blob()).count()
    }
}

impl fmt::Debug for dyn Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("partname", &self.partname().as_str())
            .field("content_type", &self.content_type())
            .finish()
    }
}

/// A basic part that stores opaque binary content.
///
/// This is the fallback part type for content types without a dedicated
/// wrapper; its blob round-trips unchanged.
#[derive(Debug)]
pub struct BlobPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl BlobPart {
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Load a part from a stored record.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        Self::new(partname, content_type, blob)
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.blob
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

/// Factory for creating part instances from stored records.
///
/// Dispatches on the record's declared content type: known structured types
/// get their typed part, image content gets an image part, everything else
/// becomes an opaque [`BlobPart`] so unrecognized parts still round-trip.
pub struct PartFactory;

impl PartFactory {
    /// Construct the appropriate part for a stored record.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<PartRc> {
        use crate::parts::coreprops::CoreProperties;
        use crate::parts::image::Image;
        use crate::parts::presentation::Presentation;
        use crate::parts::slides::{Slide, SlideLayout, SlideMaster};

        let part: PartRc = if content_type == ct::PML_PRESENTATION_MAIN {
            Rc::new(RefCell::new(Presentation::load(
                partname,
                content_type,
                blob,
            )?))
        } else if content_type == ct::PML_SLIDE {
            Rc::new(RefCell::new(Slide::load(partname, content_type, blob)?))
        } else if content_type == ct::PML_SLIDE_LAYOUT {
            Rc::new(RefCell::new(SlideLayout::load(
                partname,
                content_type,
                blob,
            )?))
        } else if content_type == ct::PML_SLIDE_MASTER {
            Rc::new(RefCell::new(SlideMaster::load(
                partname,
                content_type,
                blob,
            )?))
        } else if content_type == ct::OPC_CORE_PROPERTIES {
            Rc::new(RefCell::new(CoreProperties::load(
                partname,
                content_type,
                blob,
            )?))
        } else if content_type.starts_with("image/") {
            Rc::new(RefCell::new(Image::load(partname, content_type, blob)))
        } else {
            Rc::new(RefCell::new(BlobPart::load(partname, content_type, blob)))
        };
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_part() {
        let partname = PackURI::new("/ppt/media/image1.png").unwrap();
        let content = vec![0x89, 0x50, 0x4E, 0x47];
        let part = BlobPart::new(partname, "image/png".to_string(), content.clone());

        assert_eq!(part.content_type(), "image/png");
        assert_eq!(part.blob(), content.as_slice());
        assert_eq!(part.rels().base_uri(), "/ppt/media");
    }

    #[test]
    fn test_rel_ref_count() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let xml = br#"<p:sld><p:pic r:id="rId2"/><p:pic r:id="rId2"/><p:pic r:id="rId3"/></p:sld>"#;
        let part = BlobPart::new(partname, ct::XML.to_string(), xml.to_vec());

        assert_eq!(part.rel_ref_count("rId2"), 2);
        assert_eq!(part.rel_ref_count("rId3"), 1);
        assert_eq!(part.rel_ref_count("rId9"), 0);
    }

    #[test]
    fn test_factory_dispatch() {
        let image = PartFactory::load(
            PackURI::new("/ppt/media/image1.png").unwrap(),
            "image/png".to_string(),
            vec![0x89],
        )
        .unwrap();
        assert!(
            image
                .borrow()
                .as_any()
                .downcast_ref::<crate::parts::image::Image>()
                .is_some()
        );

        // unknown content types fall back to an opaque blob part
        let unknown = PartFactory::load(
            PackURI::new("/ppt/printerSettings/printerSettings1.bin").unwrap(),
            "application/vnd.openxmlformats-officedocument.presentationml.printerSettings"
                .to_string(),
            vec![1, 2, 3],
        )
        .unwrap();
        let unknown = unknown.borrow();
        assert!(unknown.as_any().downcast_ref::<BlobPart>().is_some());
        assert_eq!(unknown.blob(), &[1, 2, 3]);
    }
}
