//! Image parts and the package-wide image collection.

use crate::opc::packuri::PackURI;
use crate::opc::part::{Part, PartRc};
use crate::opc::rel::Relationships;
use std::any::Any;
use std::cell::RefCell;

/// An image part: opaque binary content under `/ppt/media/`.
pub struct Image {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part (e.g., "image/png")
    content_type: String,

    /// The image bytes, round-tripped unchanged
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl Image {
    /// Load an image part from a stored record.
    pub fn load(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Get the filename extension of this image (e.g., "png").
    pub fn ext(&self) -> &str {
        self.partname.ext()
    }

    /// Get the size of the image in bytes.
    pub fn size(&self) -> usize {
        self.blob.len()
    }
}

impl Part for Image {
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

/// The image parts of a package, partname-ordered.
///
/// Populated from the traversed part list once the graph exists; holds
/// handles only, the parts stay owned by the relationship graph.
#[derive(Default)]
#[derive(Debug)]
pub struct ImageCollection {
    parts: RefCell<Vec<PartRc>>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self {
            parts: RefCell::new(Vec::new()),
        }
    }

    /// Gather the image parts out of *parts*, replacing current contents.
    pub fn load(&self, parts: &[PartRc]) {
        let mut images: Vec<PartRc> = parts
            .iter()
            .filter(|part| part.borrow().content_type().starts_with("image/"))
            .cloned()
            .collect();
        images.sort_by(|a, b| {
            a.borrow()
                .partname()
                .as_str()
                .cmp(b.borrow().partname().as_str())
        });
        *self.parts.borrow_mut() = images;
    }

    /// Get the number of images.
    pub fn len(&self) -> usize {
        self.parts.borrow().len()
    }

    /// Check whether the package has no images.
    pub fn is_empty(&self) -> bool {
        self.parts.borrow().is_empty()
    }

    /// Get the image parts, in partname order.
    pub fn parts(&self) -> Vec<PartRc> {
        self.parts.borrow().clone()
    }
}
