//! Per-credential document tree for selective disclosure.
//!
//! Each document field becomes one salted leaf
//! `hash([sha256(key), value, salt])`; leaves are ordered by key name so the
//! same document always yields the same layout.

mod tree;


pub use tree::{key_to_field, DocumentLeaf, DocumentTree, FieldValue, DEFAULT_DOCUMENT_HEIGHT};
