//! Physical package I/O: the ZIP archive holding serialized parts.
//!
//! Reading decompresses every member up front into an in-memory map, which is
//! what the serialized-form reader wants anyway (content types, then rels,
//! then part blobs, in arbitrary order). Writing streams members out with
//! deflate compression.

use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Reader over a physical package.
///
/// Holds the fully decompressed member map, keyed by membername (partname
/// with the leading slash stripped).
#[derive(Debug)]
pub struct PhysPkgReader {
    /// Decompressed archive members
    members: HashMap<String, Vec<u8>>,
}

impl PhysPkgReader {
    /// Open a physical package from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }

        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a physical package from any `Read + Seek` source.
    ///
    /// A duplicate membername in the archive is a fatal load error: it would
    /// mean two stored parts under one partname.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut members = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            if members.insert(name.clone(), blob).is_some() {
                return Err(OpcError::DuplicatePartname(format!("/{}", name)));
            }
        }

        Ok(Self { members })
    }

    /// Get the binary content for a part, or None if not stored.
    pub fn blob_for(&self, pack_uri: &PackURI) -> Option<&[u8]> {
        self.members.get(pack_uri.membername()).map(Vec::as_slice)
    }

    /// Take ownership of a member's content, removing it from the map.
    pub fn take_blob(&mut self, membername: &str) -> Option<Vec<u8>> {
        self.members.remove(membername)
    }

    /// Iterate over `(membername, blob)` pairs.
    pub fn iter_members(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.members
            .iter()
            .map(|(name, blob)| (name.as_str(), blob.as_slice()))
    }

    /// Get the number of members in the package.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the package is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Writer that assembles a physical package in memory.
pub struct PhysPkgWriter {
    /// The underlying ZIP archive writer
    archive: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPkgWriter {
    /// Create a new package writer.
    pub fn new() -> Self {
        Self {
            archive: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write a member with deflate compression.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.archive.start_file(pack_uri.membername(), options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish writing and return the package bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.archive.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPkgWriter::new();
        let pack_uri = PackURI::new("/ppt/presentation.xml").unwrap();
        writer.write(&pack_uri, b"<p:presentation/>").unwrap();
        let zip_data = writer.finish().unwrap();

        let reader = PhysPkgReader::from_reader(Cursor::new(zip_data)).unwrap();
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.blob_for(&pack_uri).unwrap(), b"<p:presentation/>");
    }

    #[test]
    fn test_missing_file_is_package_not_found() {
        let err = PhysPkgReader::open("/nonexistent/deck.pptx").unwrap_err();
        assert!(matches!(err, OpcError::PackageNotFound(_)));
    }

    #[test]
    fn test_duplicate_member_is_fatal() {
        // Build a ZIP containing the same membername twice
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("ppt/slides/slide1.xml", options).unwrap();
        writer.write_all(b"<a/>").unwrap();
        writer.start_file("ppt/slides/slide1.xml", options).unwrap();
        writer.write_all(b"<b/>").unwrap();
        let cursor = writer.finish().unwrap();

        let err = PhysPkgReader::from_reader(cursor).unwrap_err();
        assert!(matches!(err, OpcError::DuplicatePartname(_)));
    }
}
