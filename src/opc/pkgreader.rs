//! Low-level, read-only access to a serialized package.
//!
//! The reader produces the container's index: one record per stored part
//! (partname, content type, bytes) and the relationship records grouped by
//! their source (the package root, or a part). It performs no graph
//! construction; the unmarshaller owns that, including dangling-reference
//! detection.

use crate::opc::constants::target_mode;
use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

/// A stored part record: content plus the relationships it is the source of.
#[derive(Debug)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackURI,

    /// The content type of this part
    pub content_type: String,

    /// The binary content of this part
    pub blob: Vec<u8>,

    /// Serialized relationships sourced from this part
    pub srels: SmallVec<[SerializedRelationship; 8]>,
}

/// A relationship record as read from a `.rels` member.
///
/// All fields are in string form; target references are still relative and
/// unresolved.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    /// Base URI of the source, for resolving relative references
    pub base_uri: String,

    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative part reference or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    /// Resolve the target reference to an absolute partname.
    ///
    /// Fails for external relationships, which have no target part.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external() {
            return Err(OpcError::InvalidState(format!(
                "relationship '{}' is external and has no target partname",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref).map_err(OpcError::InvalidPackUri)
    }
}

/// Content type map built from `[Content_Types].xml`.
///
/// Implements the OPC content type discovery algorithm: an Override for a
/// specific partname wins, otherwise the Default for the partname's
/// extension applies.
pub(crate) struct ContentTypeMap {
    /// Maps lowercased file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps specific partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    fn new() -> Self {
        Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Parse content types from `[Content_Types].xml`.
    pub(crate) fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref()
                {
                    b"Default" => {
                        let mut extension = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" => {
                                    extension = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            map.defaults.insert(ext.to_lowercase(), ct);
                        }
                    }
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"PartName" => {
                                    partname = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(pn), Some(ct)) = (partname, content_type) {
                            map.overrides.insert(pn, ct);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "content types parse error: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Get the content type for a partname.
    pub(crate) fn get(&self, pack_uri: &PackURI) -> Result<String> {
        if let Some(ct) = self.overrides.get(pack_uri.as_str()) {
            return Ok(ct.clone());
        }

        let ext = pack_uri.ext().to_lowercase();
        if let Some(ct) = self.defaults.get(&ext) {
            return Ok(ct.clone());
        }

        Err(OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Reader producing the serialized-form index of a package.
pub struct PackageReader {
    /// Package-level relationship records
    pkg_srels: SmallVec<[SerializedRelationship; 8]>,

    /// All stored part records, ordered by partname
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    /// Read a package index from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::open(path)?)
    }

    /// Read a package index from any `Read + Seek` source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_reader(reader)?)
    }

    /// Build the index from a physical reader.
    pub fn from_phys_reader(mut phys_reader: PhysPkgReader) -> Result<Self> {
        // Content types are required; a package without them is not loadable.
        let content_types_member = CONTENT_TYPES_URI.trim_start_matches('/');
        let content_types_xml = phys_reader
            .take_blob(content_types_member)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_URI.to_string()))?;
        let content_types = ContentTypeMap::from_xml(&content_types_xml)?;

        // Partition remaining members into part content and .rels documents.
        let mut part_blobs: Vec<(PackURI, Vec<u8>)> = Vec::new();
        let mut rels_blobs: HashMap<String, Vec<u8>> = HashMap::new();

        let member_names: Vec<String> = phys_reader
            .iter_members()
            .map(|(name, _)| name.to_string())
            .collect();
        for name in member_names {
            let blob = phys_reader.take_blob(&name).unwrap_or_default();
            if Self::is_rels_member(&name) {
                rels_blobs.insert(name, blob);
            } else {
                let partname =
                    PackURI::new(format!("/{}", name)).map_err(OpcError::InvalidPackUri)?;
                part_blobs.push((partname, blob));
            }
        }

        // Package-level relationships live in /_rels/.rels
        let package_uri = PackURI::new(PACKAGE_URI).map_err(OpcError::InvalidPackUri)?;
        let pkg_srels = Self::srels_for(&rels_blobs, &package_uri)?;

        // One record per stored part, ordered by partname for determinism
        let mut sparts = Vec::with_capacity(part_blobs.len());
        for (partname, blob) in part_blobs {
            let content_type = content_types.get(&partname)?;
            let srels = Self::srels_for(&rels_blobs, &partname)?;
            sparts.push(SerializedPart {
                partname,
                content_type,
                blob,
                srels,
            });
        }
        sparts.sort_by(|a, b| a.partname.as_str().cmp(b.partname.as_str()));

        Ok(Self { pkg_srels, sparts })
    }

    /// Check whether a membername is a relationships document.
    fn is_rels_member(name: &str) -> bool {
        name.ends_with(".rels") && (name.starts_with("_rels/") || name.contains("/_rels/"))
    }

    /// Look up and parse the `.rels` document for a source URI, if stored.
    fn srels_for(
        rels_blobs: &HashMap<String, Vec<u8>>,
        source_uri: &PackURI,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let rels_uri = source_uri.rels_uri().map_err(OpcError::InvalidPackUri)?;
        match rels_blobs.get(rels_uri.membername()) {
            Some(xml) => Self::parse_rels_xml(xml, source_uri.base_uri()),
            None => Ok(SmallVec::new()),
        }
    }

    /// Parse a `.rels` document into relationship records.
    fn parse_rels_xml(
        rels_xml: &[u8],
        base_uri: &str,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let mut srels = SmallVec::new();
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut target_mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                                b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                                b"TargetMode" => target_mode = attr.unescape_value()?.to_string(),
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                            srels.push(SerializedRelationship {
                                base_uri: base_uri.to_string(),
                                r_id: id,
                                reltype: rt,
                                target_ref: tr,
                                target_mode,
                            });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("rels parse error: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        Ok(srels)
    }

    /// Get an iterator over all stored part records.
    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Get package-level relationship records.
    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    /// Take ownership of all stored part records.
    pub fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }
}
