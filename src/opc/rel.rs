use crate::opc::error::{OpcError, Result};
use crate::opc::part::{Part, PartRc};
/// Relationship-related objects for the package graph.
///
/// A relationship is a directed, keyed, typed edge from a source (a part or
/// the package root) to a target part or an external resource. Each source
/// owns one `Relationships` collection.
use std::fmt;

/// The target of a relationship: a live part handle, or an external URI.
#[derive(Clone)]
pub enum RelTarget {
    /// Another part in the same package
    Part(PartRc),

    /// A resource outside the package (e.g., a hyperlink URL)
    External(String),
}

impl fmt::Debug for RelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelTarget::Part(part) => write!(f, "Part({})", part.borrow().partname()),
            RelTarget::External(url) => write!(f, "External({})", url),
        }
    }
}

/// A single relationship from a source to a target.
///
/// Identified by an rId unique within its owning collection. Internal
/// relationships hold a shared handle to their target part; the part graph is
/// reachable only through these handles.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// The relationship target
    target: RelTarget,
}

impl Relationship {
    pub fn new(r_id: String, reltype: String, target: RelTarget) -> Self {
        Self {
            r_id,
            reltype,
            target,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.target, RelTarget::External(_))
    }

    /// Get the target part handle, or None for external relationships.
    pub fn part(&self) -> Option<PartRc> {
        match &self.target {
            RelTarget::Part(part) => Some(part.clone()),
            RelTarget::External(_) => None,
        }
    }

    /// Get the target part handle.
    ///
    /// Fails with `InvalidState` for external relationships, which have no
    /// target part.
    pub fn target_part(&self) -> Result<PartRc> {
        self.part().ok_or_else(|| {
            OpcError::InvalidState(format!(
                "relationship '{}' is external and has no target part",
                self.r_id
            ))
        })
    }

    /// Get the target reference as serialized in a `.rels` document: a
    /// relative part reference against *base_uri* for internal targets, the
    /// URI verbatim for external ones.
    pub fn target_ref(&self, base_uri: &str) -> String {
        match &self.target {
            RelTarget::Part(part) => part.borrow().partname().relative_ref(base_uri),
            RelTarget::External(url) => url.clone(),
        }
    }
}

/// Collection of relationships from a single source.
///
/// Keyed by rId and iterated in insertion order; order is stable and
/// significant for round-trip fidelity on save. Collections are small, so the
/// backing store is a plain vector with linear key lookup.
#[derive(Debug)]
pub struct Relationships {
    /// Base URI for resolving and producing relative references
    base_uri: String,

    /// Relationships in insertion order
    rels: Vec<Relationship>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI of the owning source, used for relative references
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: Vec::new(),
        }
    }

    /// Get the base URI of the owning source.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection under the given rId.
    ///
    /// Fails with `DuplicateRid` if the key is already present; exactly one
    /// relationship per (collection, rId).
    pub fn add_relationship(
        &mut self,
        reltype: &str,
        target: RelTarget,
        r_id: &str,
    ) -> Result<&Relationship> {
        if self.get(r_id).is_some() {
            return Err(OpcError::DuplicateRid(r_id.to_string()));
        }
        self.rels.push(Relationship::new(
            r_id.to_string(),
            reltype.to_string(),
            target,
        ));
        // safe to unwrap, just pushed
        Ok(self.rels.last().unwrap())
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id == r_id)
    }

    /// Get or add a relationship of a singleton-cardinality type.
    ///
    /// If a relationship of *reltype* already exists, returns it unchanged.
    /// Otherwise inserts one to *target* under the next available rId.
    pub fn get_or_add(&mut self, reltype: &str, target: PartRc) -> &Relationship {
        let existing = self.rels.iter().position(|rel| rel.reltype == reltype);
        match existing {
            Some(idx) => &self.rels[idx],
            None => {
                let r_id = self.next_r_id();
                self.rels.push(Relationship::new(
                    r_id,
                    reltype.to_string(),
                    RelTarget::Part(target),
                ));
                // safe to unwrap, just pushed
                self.rels.last().unwrap()
            }
        }
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps if
    /// any exist.
    fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .rels
            .iter()
            .filter_map(|rel| {
                let r_id = rel.r_id.as_str();
                if r_id.len() > 3 && &r_id[..3] == "rId" {
                    atoi_simd::parse::<u32, false, false>(&r_id.as_bytes()[3..]).ok()
                } else {
                    None
                }
            })
            .collect();

        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {}
            }
        }

        format!("rId{}", next_num)
    }

    /// Get the target part of the first relationship of the given type, in
    /// insertion order.
    ///
    /// Fails with `RelationshipNotFound` if no relationship of the type is
    /// present. Singleton accessors catch that case and materialize a default
    /// part on first access.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<PartRc> {
        self.rels
            .iter()
            .find(|rel| rel.reltype == reltype && !rel.is_external())
            .and_then(|rel| rel.part())
            .ok_or_else(|| {
                OpcError::RelationshipNotFound(format!("no relationship of type '{}'", reltype))
            })
    }

    /// Get an iterator over all relationships in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize the collection to a `.rels` XML document.
    ///
    /// Relationships appear in insertion order. Internal targets are rendered
    /// relative to the collection's base URI, external targets verbatim with
    /// `TargetMode="External"`.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        xml.push('\n');

        for rel in &self.rels {
            let target_mode = if rel.is_external() {
                r#" TargetMode="External""#
            } else {
                ""
            };

            xml.push_str(&format!(
                r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype()),
                escape_xml(&rel.target_ref(&self.base_uri)),
                target_mode
            ));
            xml.push('\n');
        }

        xml.push_str("</Relationships>");

        xml
    }
}

/// Escape XML special characters in attribute values.
#[inline]
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::packuri::PackURI;
    use crate::opc::part::{BlobPart, PartRc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn make_part(partname: &str) -> PartRc {
        let partname = PackURI::new(partname).unwrap();
        Rc::new(RefCell::new(BlobPart::new(
            partname,
            "application/octet-stream".to_string(),
            Vec::new(),
        )))
    }

    #[test]
    fn test_add_relationship_rejects_duplicate_rid() {
        let mut rels = Relationships::new("/ppt".to_string());
        rels.add_relationship("type1", RelTarget::Part(make_part("/ppt/a.xml")), "rId1")
            .unwrap();

        let err = rels
            .add_relationship("type2", RelTarget::Part(make_part("/ppt/b.xml")), "rId1")
            .unwrap_err();
        assert!(matches!(err, OpcError::DuplicateRid(r_id) if r_id == "rId1"));
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn test_next_r_id_fills_gaps() {
        let mut rels = Relationships::new("/ppt".to_string());
        rels.add_relationship("t", RelTarget::Part(make_part("/ppt/a.xml")), "rId1")
            .unwrap();
        rels.add_relationship("t", RelTarget::Part(make_part("/ppt/b.xml")), "rId3")
            .unwrap();

        assert_eq!(rels.next_r_id(), "rId2");
    }

    #[test]
    fn test_get_or_add_is_idempotent() {
        let mut rels = Relationships::new("/".to_string());
        let core = make_part("/docProps/core.xml");

        let r_id = rels.get_or_add("core-props", core.clone()).r_id().to_string();
        assert_eq!(r_id, "rId1");

        // Second call returns the same relationship without inserting another
        let rel = rels.get_or_add("core-props", make_part("/docProps/other.xml"));
        assert_eq!(rel.r_id(), "rId1");
        assert!(Rc::ptr_eq(&rel.part().unwrap(), &core));
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn test_part_with_reltype_takes_first_in_insertion_order() {
        let mut rels = Relationships::new("/ppt".to_string());
        let first = make_part("/ppt/slides/slide9.xml");
        let second = make_part("/ppt/slides/slide1.xml");
        rels.add_relationship("slide", RelTarget::Part(first.clone()), "rId7")
            .unwrap();
        rels.add_relationship("slide", RelTarget::Part(second), "rId2")
            .unwrap();

        let found = rels.part_with_reltype("slide").unwrap();
        assert!(Rc::ptr_eq(&found, &first));
    }

    #[test]
    fn test_part_with_reltype_not_found() {
        let rels = Relationships::new("/".to_string());
        let err = rels.part_with_reltype("missing").unwrap_err();
        assert!(matches!(err, OpcError::RelationshipNotFound(_)));
    }

    #[test]
    fn test_target_part_fails_for_external() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.add_relationship(
            "hyperlink",
            RelTarget::External("https://example.com/".to_string()),
            "rId1",
        )
        .unwrap();

        let rel = rels.get("rId1").unwrap();
        assert!(rel.is_external());
        assert!(matches!(
            rel.target_part().unwrap_err(),
            OpcError::InvalidState(_)
        ));
    }

    #[test]
    fn test_to_xml_relative_targets_and_external_mode() {
        let mut rels = Relationships::new("/ppt/slides".to_string());
        rels.add_relationship(
            "layout",
            RelTarget::Part(make_part("/ppt/slideLayouts/slideLayout1.xml")),
            "rId1",
        )
        .unwrap();
        rels.add_relationship(
            "hyperlink",
            RelTarget::External("https://example.com/?a=1&b=2".to_string()),
            "rId2",
        )
        .unwrap();

        let xml = rels.to_xml();
        assert!(xml.contains(r#"Target="../slideLayouts/slideLayout1.xml""#));
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
        // insertion order preserved
        let pos1 = xml.find("rId1").unwrap();
        let pos2 = xml.find("rId2").unwrap();
        assert!(pos1 < pos2);
    }

    #[test]
    fn test_iteration_is_insertion_order() {
        let mut rels = Relationships::new("/".to_string());
        for r_id in ["rId3", "rId1", "rId2"] {
            rels.add_relationship("t", RelTarget::Part(make_part("/p.bin")), r_id)
                .unwrap();
        }
        let order: Vec<&str> = rels.iter().map(|r| r.r_id()).collect();
        assert_eq!(order, vec!["rId3", "rId1", "rId2"]);
    }

    #[test]
    fn test_blob_part_identity_is_by_reference() {
        let a = make_part("/ppt/media/image1.png");
        let b = make_part("/ppt/media/image1.png");
        // same partname, distinct nodes
        assert!(!Rc::ptr_eq(&a, &b));
        let a2 = a.clone();
        assert!(Rc::ptr_eq(&a, &a2));
    }
}
