//! PS_FS_V1 archive parsing and extraction.
//!
//! ## Architecture
//!
//! - [`structures`]: fixed layout constants and pure field decoders
//! - [`parser`]: the [`Archive`] handle (header validation, cached table)
//! - [`extractor`]: random-access copy of a single resource
//!
//! ## Format Overview
//!
//! All integers are little-endian.
//! 1. 8-byte magic `PS_FS_V1`
//! 2. u32 resource count, then a 4-byte separator
//! 3. One 64-byte table entry per resource (see [`RawEntry`])
//! 4. Payload bytes at the positions the table names
//!
//! ## Limitations
//!
//! - Read only, no repacking
//! - No compression or checksums; the format defines neither

pub mod extractor;
mod parser;
mod structures;

pub use extractor::{extract, extract_to_memory, extract_to_writer};
pub use parser::Archive;
pub use structures::*;
