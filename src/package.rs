//! The package root: the object handed to API users.
//!
//! A [`Package`] owns the package-level relationship collection; the part
//! graph is derived from it by traversal, never stored. Construction
//! registers the package in a registry of non-owning references so a part can
//! be mapped back to its owning package without parts carrying a parent
//! pointer.

use crate::opc::constants::relationship_type as rt;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PACKAGE_URI;
use crate::opc::part::{Part, PartRc};
use crate::opc::pkgreader::PackageReader;
use crate::opc::pkgwriter::PackageWriter;
use crate::opc::rel::{RelTarget, Relationships};
use crate::opc::unmarshal::Unmarshaller;
use crate::parts::coreprops::CoreProperties;
use crate::parts::image::ImageCollection;
use crate::template;
use log::debug;
use once_cell::unsync::OnceCell;
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::rc::{Rc, Weak};

thread_local! {
    /// Registry of every package constructed on this thread, held as
    /// non-owning references and pruned on access. Exists solely to support
    /// reverse part-to-package lookup; it never keeps a package alive.
    static INSTANCES: RefCell<Vec<Weak<Package>>> = const { RefCell::new(Vec::new()) };
}

/// A presentation package: the root of the object model.
///
/// Handed out as `Rc<Package>`; the graph is single-threaded by contract
/// (`Rc`/`RefCell` inside), so handles do not cross threads.
#[derive(Debug)]
pub struct Package {
    /// Package-level relationships; the part graph hangs off these
    rels: RefCell<Relationships>,

    /// Lazily-resolved main presentation part
    presentation: OnceCell<PartRc>,

    /// Lazily-resolved (and lazily-created) core properties part
    core_properties: OnceCell<PartRc>,

    /// Lazily-created image collection, populated after unmarshalling
    images: OnceCell<ImageCollection>,
}

impl Package {
    /// Create a new empty package and register it in the instance registry.
    pub fn new() -> Rc<Self> {
        let pkg = Rc::new(Self {
            rels: RefCell::new(Relationships::new(PACKAGE_URI.to_string())),
            presentation: OnceCell::new(),
            core_properties: OnceCell::new(),
            images: OnceCell::new(),
        });
        INSTANCES.with(|instances| instances.borrow_mut().push(Rc::downgrade(&pkg)));
        pkg
    }

    /// Open a package from a `.pptx` file.
    ///
    /// The load either completes fully or fails; no partially-built package
    /// is returned.
    pub fn open<P: AsRef<Path>>(pkg_file: P) -> Result<Rc<Self>> {
        let pkg_reader = PackageReader::from_file(pkg_file)?;
        Self::from_pkg_reader(pkg_reader)
    }

    /// Open the bundled default presentation template.
    ///
    /// This is the path taken when no package file is given: a baseline empty
    /// presentation with one slide master, one layout, and no slides.
    pub fn open_default() -> Result<Rc<Self>> {
        let bytes = template::default_pptx_bytes()?;
        Self::from_reader(Cursor::new(bytes))
    }

    /// Open a package from any `Read + Seek` source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Rc<Self>> {
        let pkg_reader = PackageReader::from_reader(reader)?;
        Self::from_pkg_reader(pkg_reader)
    }

    fn from_pkg_reader(pkg_reader: PackageReader) -> Result<Rc<Self>> {
        let pkg = Self::new();
        Unmarshaller::unmarshal(pkg_reader, &pkg)?;
        debug!("opened package with {} parts", pkg.parts().len());
        Ok(pkg)
    }

    /// Save this package to a file.
    ///
    /// Walks the live part graph and writes a fresh container: a one-shot
    /// full rewrite, not an incremental diff.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// Save this package to a writer.
    pub fn save_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        PackageWriter::write_to_stream(writer, self)
    }

    /// Return every live package constructed on this thread.
    ///
    /// Prunes registry entries whose package has been dropped before
    /// returning.
    pub fn instances() -> Vec<Rc<Package>> {
        INSTANCES.with(|instances| {
            let mut instances = instances.borrow_mut();
            instances.retain(|weak| weak.strong_count() > 0);
            instances.iter().filter_map(Weak::upgrade).collect()
        })
    }

    /// Return the package instance that contains *part*.
    ///
    /// Scans live packages; this is the only part-to-package mapping, since
    /// parts hold no back-reference.
    pub fn containing(part: &PartRc) -> Result<Rc<Package>> {
        for pkg in Self::instances() {
            if pkg.parts().iter().any(|p| Rc::ptr_eq(p, part)) {
                return Ok(pkg);
            }
        }
        Err(OpcError::PartNotFound(format!(
            "no package contains part '{}'",
            part.borrow().partname()
        )))
    }

    /// Get the package-level relationship collection.
    pub fn rels(&self) -> Ref<'_, Relationships> {
        self.rels.borrow()
    }

    /// Add a package-level relationship under the given rId.
    pub fn add_relationship(&self, reltype: &str, target: RelTarget, r_id: &str) -> Result<()> {
        self.rels
            .borrow_mut()
            .add_relationship(reltype, target, r_id)?;
        Ok(())
    }

    /// Add or get a package-level relationship of *reltype*, returning its rId.
    pub fn relate_to(&self, target: PartRc, reltype: &str) -> String {
        self.rels
            .borrow_mut()
            .get_or_add(reltype, target)
            .r_id()
            .to_string()
    }

    /// The main presentation part of this package.
    ///
    /// Resolved on first access from the office-document relationship and
    /// cached.
    pub fn presentation(&self) -> Result<PartRc> {
        self.presentation
            .get_or_try_init(|| self.rels.borrow().part_with_reltype(rt::OFFICE_DOCUMENT))
            .cloned()
    }

    /// The core properties (Dublin Core metadata) part of this package.
    ///
    /// Resolved on first access. A package without one gets a default part
    /// materialized and related to the package root, so the accessor always
    /// succeeds on a well-formed package.
    pub fn core_properties(&self) -> Result<PartRc> {
        self.core_properties
            .get_or_try_init(|| {
                let found = self.rels.borrow().part_with_reltype(rt::CORE_PROPERTIES);
                match found {
                    Ok(part) => Ok(part),
                    Err(OpcError::RelationshipNotFound(_)) => {
                        let core = CoreProperties::default_part()?;
                        self.rels
                            .borrow_mut()
                            .get_or_add(rt::CORE_PROPERTIES, core.clone());
                        Ok(core)
                    }
                    Err(e) => Err(e),
                }
            })
            .cloned()
    }

    /// The image parts of this package.
    pub fn images(&self) -> &ImageCollection {
        self.images.get_or_init(ImageCollection::new)
    }

    /// Post-load hook: gather image parts into the image collection.
    pub(crate) fn after_unmarshal(&self) {
        self.images().load(&self.parts());
    }

    /// Return a reference to each part in this package.
    ///
    /// The part graph is derived, not stored: computed by depth-first
    /// traversal of the relationships starting at the package root. The graph
    /// may contain cycles; an explicit visited set keyed by handle identity
    /// guarantees each part appears exactly once.
    pub fn parts(&self) -> Vec<PartRc> {
        let mut visited = HashSet::new();
        let mut parts = Vec::new();
        walk_rels(&self.rels.borrow(), &mut visited, &mut parts);
        parts
    }
}

/// Identity key for a part handle: the address of its allocation.
fn part_key(part: &PartRc) -> *const () {
    Rc::as_ptr(part) as *const ()
}

/// Walk a relationship collection, collecting unvisited target parts and
/// recursing into their relationships.
fn walk_rels(rels: &Relationships, visited: &mut HashSet<*const ()>, parts: &mut Vec<PartRc>) {
    for rel in rels.iter() {
        let Some(part) = rel.part() else {
            continue;
        };
        if !visited.insert(part_key(&part)) {
            continue;
        }
        parts.push(part.clone());
        walk_rels(part.borrow().rels(), visited, parts);
    }
}
