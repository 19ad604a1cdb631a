//! Package machinery: parts, relationships, and (un)marshalling.
//!
//! This module implements the load/traverse/save lifecycle of a presentation
//! package:
//!
//! - Part and relationship graph objects ([`part`], [`rel`])
//! - Partname arithmetic ([`packuri`])
//! - Physical ZIP container I/O ([`phys_pkg`])
//! - Serialized-form reading and writing ([`pkgreader`], [`pkgwriter`])
//! - Graph reconstruction ([`unmarshal`])
//!
//! The live graph is shared-ownership: relationships hold [`part::PartRc`]
//! handles, the part list is derived by traversal from the package root, and
//! part identity is handle identity.

pub mod constants;
pub mod error;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;
pub mod unmarshal;

// Re-export commonly used types
pub use error::OpcError;
pub use packuri::PackURI;
pub use part::{BlobPart, Part, PartFactory, PartRc};
pub use rel::{RelTarget, Relationship, Relationships};
pub use unmarshal::Unmarshaller;
