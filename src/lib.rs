//! Pitaya - an object model over OOXML presentation (.pptx) packages
//!
//! A `.pptx` file is a ZIP container of interrelated parts (the presentation
//! document, slides, slide masters, images, core properties) connected by
//! typed relationships. This library rebuilds that graph in memory on open,
//! lets you traverse and inspect it, and writes it back out on save.
//!
//! # Features
//!
//! - **Relationship graph**: parts are shared nodes reachable through typed,
//!   keyed edges; the graph may be cyclic and is traversed safely
//! - **Lazy loading**: derived collections (slides, core properties, images)
//!   are computed on first access and cached
//! - **Round-trip save**: a loaded package serializes back to an equivalent
//!   container, preserving partnames, content types, and relationships
//! - **Instance registry**: map any part handle back to its owning package
//!   without parts carrying parent pointers
//!
//! # Example - Opening a presentation
//!
//! ```no_run
//! use pitaya::Package;
//! use pitaya::parts::Presentation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a .pptx file (or `Package::open_default()` for the bundled template)
//! let pkg = Package::open("deck.pptx")?;
//!
//! let pres = pkg.presentation()?;
//! let pres = pres.borrow();
//! let pres = pres.as_any().downcast_ref::<Presentation>().unwrap();
//!
//! println!("{} slides", pres.slides()?.len());
//! for master in pres.slidemasters().iter() {
//!     println!("master: {}", master.borrow().partname());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Round-tripping a package
//!
//! ```no_run
//! use pitaya::Package;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pkg = Package::open("deck.pptx")?;
//! // ... inspect or modify the graph ...
//! pkg.save("deck-out.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Threading
//!
//! The graph is single-threaded by contract: handles are `Rc`-based and do
//! not implement `Send`. Open each package on the thread that uses it.

/// Package machinery: parts, relationships, (un)marshalling, container I/O
pub mod opc;

/// XML element handles for structured parts
pub mod oxml;

/// The package root object and instance registry
pub mod package;

/// Typed presentation parts (presentation, slides, images, core properties)
pub mod parts;

/// Chart-group accessors
pub mod charts;

/// The bundled default presentation template
pub mod template;

/// Crate-level error type
pub mod error;

// Re-export the primary API surface
pub use error::PptxError;
pub use opc::{OpcError, PackURI, Part, PartRc, RelTarget};
pub use package::Package;
pub use parts::{CoreProperties, Image, Presentation, Slide, SlideLayout, SlideMaster};

#[cfg(test)]
mod round_trip_tests {
    //! Whole-lifecycle tests: open, save, reopen, compare.

    use crate::opc::part::Part;
    use crate::package::Package;
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Flatten a package into comparable (partname, content_type) pairs.
    fn part_set(pkg: &Rc<Package>) -> BTreeSet<(String, String)> {
        pkg.parts()
            .iter()
            .map(|p| {
                let p = p.borrow();
                (p.partname().to_string(), p.content_type().to_string())
            })
            .collect()
    }

    /// Flatten every relationship into comparable
    /// (source, rId, reltype, target, is_external) tuples.
    fn rel_set(pkg: &Rc<Package>) -> BTreeSet<(String, String, String, String, bool)> {
        let mut rels = BTreeSet::new();
        for rel in pkg.rels().iter() {
            rels.insert((
                "/".to_string(),
                rel.r_id().to_string(),
                rel.reltype().to_string(),
                rel_target_id(rel),
                rel.is_external(),
            ));
        }
        for part in pkg.parts() {
            let part = part.borrow();
            for rel in part.rels().iter() {
                rels.insert((
                    part.partname().to_string(),
                    rel.r_id().to_string(),
                    rel.reltype().to_string(),
                    rel_target_id(rel),
                    rel.is_external(),
                ));
            }
        }
        rels
    }

    fn rel_target_id(rel: &crate::opc::rel::Relationship) -> String {
        match rel.part() {
            Some(part) => part.borrow().partname().to_string(),
            None => rel.target_ref("/"),
        }
    }

    #[test]
    fn test_save_then_open_preserves_graph() {
        let pkg = Package::open_default().unwrap();

        let mut bytes = Vec::new();
        pkg.save_to_writer(&mut bytes).unwrap();
        let reopened = Package::from_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(part_set(&pkg), part_set(&reopened));
        assert_eq!(rel_set(&pkg), rel_set(&reopened));
    }

    #[test]
    fn test_save_to_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.pptx");

        let pkg = Package::open_default().unwrap();
        pkg.save(&path).unwrap();

        let reopened = Package::open(&path).unwrap();
        assert_eq!(part_set(&pkg), part_set(&reopened));
        assert_eq!(rel_set(&pkg), rel_set(&reopened));
    }

    #[test]
    fn test_materialized_core_properties_survive_save() {
        // a package built without core properties gains them on access, and
        // the created part is persisted by the following save
        let pkg = Package::open_default().unwrap();
        let _ = pkg.core_properties().unwrap();

        let mut bytes = Vec::new();
        pkg.save_to_writer(&mut bytes).unwrap();
        let reopened = Package::from_reader(Cursor::new(bytes)).unwrap();

        let core = reopened.core_properties().unwrap();
        assert_eq!(core.borrow().partname().as_str(), "/docProps/core.xml");
    }
}
