//! # psfs
//!
//! Lists and extracts the resources stored in `PS_FS_V1` container files.
//!
//! The container is a fixed-layout format: an 8-byte magic, a resource
//! count and a table of 64-byte entries naming where each payload lives.
//! Payloads are stored verbatim, so extraction is a seek and a copy.
//!
//! ## Features
//!
//! - Eager header validation, lazy single-pass table decoding
//! - Distinct errors for foreign, truncated and corrupted archives
//! - Independent, thread-safe extraction of individual resources
//!
//! ## Example
//!
//! ```no_run
//! use psfs::Archive;
//!
//! let archive = Archive::open("data.psfs")?;
//!
//! for resource in archive.resources()? {
//!     println!("{}", resource);
//! }
//!
//! if let Some(resource) = archive.find("testfile.test")? {
//!     archive.extract(resource, "./out".as_ref())?;
//! }
//! # Ok::<(), psfs::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod io;
pub mod psfs;
pub mod resource;

pub use cli::Cli;
pub use error::{Error, ErrorKind, Result, ValidationError};
pub use io::{LocalFileReader, ReadAt};
pub use psfs::{Archive, extract};
pub use resource::Resource;
