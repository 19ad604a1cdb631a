//! Rebuilds the live part graph from a package's serialized form.
//!
//! One-shot, single-pass per load: construct every part, wire every
//! relationship, then run the post-load hooks. Structural problems
//! (duplicate partnames, relationships naming unknown targets) are fatal and
//! abort the load before any package escapes to the caller.

use crate::opc::error::{OpcError, Result};
use crate::opc::part::{Part, PartFactory, PartRc};
use crate::opc::pkgreader::{PackageReader, SerializedRelationship};
use crate::opc::rel::RelTarget;
use crate::package::Package;
use log::debug;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::rc::Rc;

/// Procedure that turns a serialized package index into a live graph rooted
/// at a [`Package`].
pub struct Unmarshaller;

impl Unmarshaller {
    /// Rebuild the graph described by *pkg_reader* onto *pkg*.
    ///
    /// Order matters: all parts exist before any relationship is wired, and
    /// all relationships are wired before any `after_unmarshal` hook runs, so
    /// every hook sees the complete graph.
    pub fn unmarshal(mut pkg_reader: PackageReader, pkg: &Rc<Package>) -> Result<()> {
        let (parts, wiring) = Self::unmarshal_parts(&mut pkg_reader)?;
        Self::unmarshal_relationships(&pkg_reader, pkg, &parts, &wiring)?;

        for part in parts.values() {
            part.borrow_mut().after_unmarshal();
        }
        pkg.after_unmarshal();

        debug!(
            "unmarshalled {} parts, {} package relationships",
            parts.len(),
            pkg_reader.pkg_srels().len()
        );
        Ok(())
    }

    /// Construct exactly one part per stored record, keyed by partname.
    ///
    /// The working map prevents duplicate construction when a part is the
    /// target of several relationships; a partname stored twice is a corrupt
    /// package.
    #[allow(clippy::type_complexity)]
    fn unmarshal_parts(
        pkg_reader: &mut PackageReader,
    ) -> Result<(
        HashMap<String, PartRc>,
        Vec<(String, SmallVec<[SerializedRelationship; 8]>)>,
    )> {
        let sparts = pkg_reader.take_sparts();
        let mut parts = HashMap::with_capacity(sparts.len());
        let mut wiring = Vec::with_capacity(sparts.len());

        for spart in sparts {
            let key = spart.partname.to_string();
            if parts.contains_key(&key) {
                return Err(OpcError::DuplicatePartname(key));
            }
            let part = PartFactory::load(spart.partname, spart.content_type, spart.blob)?;
            parts.insert(key.clone(), part);
            wiring.push((key, spart.srels));
        }

        Ok((parts, wiring))
    }

    /// Wire every relationship record onto its source's collection.
    fn unmarshal_relationships(
        pkg_reader: &PackageReader,
        pkg: &Rc<Package>,
        parts: &HashMap<String, PartRc>,
        wiring: &[(String, SmallVec<[SerializedRelationship; 8]>)],
    ) -> Result<()> {
        for srel in pkg_reader.pkg_srels() {
            let target = Self::resolve_target(srel, parts)?;
            pkg.add_relationship(&srel.reltype, target, &srel.r_id)?;
        }

        for (source_partname, srels) in wiring {
            let source = parts
                .get(source_partname)
                .ok_or_else(|| OpcError::PartNotFound(source_partname.clone()))?;
            for srel in srels {
                let target = Self::resolve_target(srel, parts)?;
                source
                    .borrow_mut()
                    .rels_mut()
                    .add_relationship(&srel.reltype, target, &srel.r_id)?;
            }
        }

        Ok(())
    }

    /// Resolve a relationship record's target: external records yield their
    /// URI, internal records must name a constructed part.
    fn resolve_target(
        srel: &SerializedRelationship,
        parts: &HashMap<String, PartRc>,
    ) -> Result<RelTarget> {
        if srel.is_external() {
            return Ok(RelTarget::External(srel.target_ref.clone()));
        }

        let partname = srel.target_partname()?;
        parts
            .get(partname.as_str())
            .cloned()
            .map(RelTarget::Part)
            .ok_or_else(|| OpcError::DanglingRelationship {
                r_id: srel.r_id.clone(),
                target: partname.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::{content_type as ct, relationship_type as rt};
    use std::io::Cursor;

    /// Assemble a minimal package: presentation + one slide, wired with
    /// package- and part-level relationships.
    fn minimal_pkg_bytes(slide_target: &str) -> Vec<u8> {
        use crate::opc::packuri::PackURI;
        use crate::opc::phys_pkg::PhysPkgWriter;

        let mut writer = PhysPkgWriter::new();
        let w = |writer: &mut PhysPkgWriter, name: &str, blob: &[u8]| {
            writer.write(&PackURI::new(name).unwrap(), blob).unwrap();
        };

        w(
            &mut writer,
            "/[Content_Types].xml",
            format!(
                r#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="{}"/>
  <Override PartName="/ppt/presentation.xml" ContentType="{}"/>
  <Override PartName="/ppt/slides/slide1.xml" ContentType="{}"/>
</Types>"#,
                ct::OPC_RELATIONSHIPS,
                ct::PML_PRESENTATION_MAIN,
                ct::PML_SLIDE
            )
            .as_bytes(),
        );
        w(
            &mut writer,
            "/_rels/.rels",
            format!(
                r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="{}" Target="ppt/presentation.xml"/>
</Relationships>"#,
                rt::OFFICE_DOCUMENT
            )
            .as_bytes(),
        );
        w(
            &mut writer,
            "/ppt/presentation.xml",
            br#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst><p:sldId id="256" r:id="rId1"/></p:sldIdLst></p:presentation>"#,
        );
        w(
            &mut writer,
            "/ppt/_rels/presentation.xml.rels",
            format!(
                r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="{}" Target="{}"/>
</Relationships>"#,
                rt::SLIDE,
                slide_target
            )
            .as_bytes(),
        );
        w(
            &mut writer,
            "/ppt/slides/slide1.xml",
            br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="First"/></p:sld>"#,
        );

        writer.finish().unwrap()
    }

    #[test]
    fn test_unmarshal_builds_wired_graph() {
        let bytes = minimal_pkg_bytes("slides/slide1.xml");
        let pkg = Package::from_reader(Cursor::new(bytes)).unwrap();

        let parts = pkg.parts();
        assert_eq!(parts.len(), 2);

        let pres = pkg.presentation().unwrap();
        assert_eq!(pres.borrow().partname().as_str(), "/ppt/presentation.xml");

        let slide = pres.borrow().rels().part_with_reltype(rt::SLIDE).unwrap();
        assert_eq!(
            slide.borrow().partname().as_str(),
            "/ppt/slides/slide1.xml"
        );
    }

    #[test]
    fn test_dangling_relationship_aborts_load() {
        // relationship names a slide that is not among the stored parts
        let bytes = minimal_pkg_bytes("slides/slide2.xml");
        let err = Package::from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            OpcError::DanglingRelationship { ref target, .. } if target == "/ppt/slides/slide2.xml"
        ));
    }
}
