//! PS_FS_V1 archive handle.
//!
//! ## Parsing Strategy
//!
//! The archive is read front to back in a single pass:
//! 1. [`Archive::open`] validates the magic and reads the resource count
//! 2. The first [`Archive::resources`] call decodes the whole table from the
//!    same stream, then closes it
//! 3. Extraction never touches that stream; every call opens the archive
//!    again for random access

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::resource::Resource;

use super::extractor;
use super::structures::*;

/// Entries reserved up front; the declared count is not trusted for allocation.
const MAX_PREALLOCATED_ENTRIES: usize = 1024;

/// An open PS_FS_V1 archive.
///
/// The resource table is decoded at most once and then reused for the
/// lifetime of the handle. The handle is `Sync`: extraction only needs
/// `&self`, so several resources can be extracted from different threads.
///
/// ## Example
///
/// ```no_run
/// use psfs::Archive;
///
/// let archive = Archive::open("data.psfs")?;
/// for resource in archive.resources()? {
///     archive.extract(resource, "out".as_ref())?;
/// }
/// # Ok::<(), psfs::Error>(())
/// ```
#[derive(Debug)]
pub struct Archive {
    /// Backing file
    path: PathBuf,
    /// Count declared by the header
    resource_count: u32,
    /// Stream positioned at the start of the table, until the table is read
    table: Mutex<Option<BufReader<File>>>,
    resources: OnceLock<Vec<Resource>>,
}

impl Archive {
    /// Open an archive and validate its header.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedEof`] if the file ends inside the 16-byte header
    /// - [`Error::Format`] if the first 8 bytes are not `PS_FS_V1`
    /// - [`Error::Io`] if the file cannot be opened or read
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let mut stream = BufReader::new(file);

        let magic = read_field::<8>(&mut stream, "magic header", &path)?;
        if !is_magic(&magic) {
            return Err(Error::Format { path });
        }
        let resource_count = read_u32_le(read_field(&mut stream, "resource count", &path)?);
        read_field::<4>(&mut stream, "header separator", &path)?;

        debug!(
            "Opened {}: {} resources declared",
            path.display(),
            resource_count
        );

        Ok(Self {
            path,
            resource_count,
            table: Mutex::new(Some(stream)),
            resources: OnceLock::new(),
        })
    }

    /// Path of the backing archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of resources the header declares
    pub fn resource_count(&self) -> u32 {
        self.resource_count
    }

    /// All resources in table order.
    ///
    /// The first call decodes the table; later calls return the same slice
    /// without touching the file. A failed decode leaves nothing cached and
    /// no partial list is ever returned.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedEof`] if the table is truncated
    /// - [`Error::Validation`] if an entry has an empty name or a
    ///   non-positive adjusted size or offset
    /// - [`Error::Io`] on read failures
    pub fn resources(&self) -> Result<&[Resource]> {
        if let Some(resources) = self.resources.get() {
            return Ok(resources);
        }

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished while we waited for the lock
        if let Some(resources) = self.resources.get() {
            return Ok(resources);
        }

        let mut stream = match table.take() {
            Some(stream) => stream,
            None => self.reopen_table()?,
        };
        let parsed = self.read_table(&mut stream)?;
        Ok(self.resources.get_or_init(|| parsed))
    }

    /// Find a resource by exact name
    pub fn find(&self, name: &str) -> Result<Option<&Resource>> {
        Ok(self.resources()?.iter().find(|r| r.name() == name))
    }

    /// Extract `resource` into `directory`, returning the written path.
    ///
    /// See [`extractor::extract`].
    pub fn extract(&self, resource: &Resource, directory: &Path) -> Result<PathBuf> {
        extractor::extract(&self.path, resource, directory)
    }

    /// Read the payload of `resource` into memory
    pub fn extract_to_memory(&self, resource: &Resource) -> Result<Vec<u8>> {
        extractor::extract_to_memory(&self.path, resource)
    }

    /// Copy the payload of `resource` into `writer`.
    ///
    /// See [`extractor::extract_to_writer`].
    pub fn extract_to_writer<W: Write + ?Sized>(
        &self,
        resource: &Resource,
        writer: &mut W,
    ) -> Result<()> {
        extractor::extract_to_writer(&self.path, resource, writer)
    }

    /// Stream used after a previous table read failed part way.
    fn reopen_table(&self) -> Result<BufReader<File>> {
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let mut stream = BufReader::new(file);
        stream
            .seek(SeekFrom::Start(HEADER_SIZE))
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(stream)
    }

    fn read_table(&self, stream: &mut impl Read) -> Result<Vec<Resource>> {
        let count = self.resource_count as usize;
        let mut resources = Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));

        for i in 0..count {
            let bytes = read_field::<ENTRY_SIZE>(stream, "resource table entry", &self.path)?;
            let raw = RawEntry::from_bytes(&bytes);
            trace!(
                "Entry {}: name={:?} raw_size={} raw_offset={}",
                i,
                raw.name,
                raw.raw_size,
                raw.raw_offset
            );
            resources.push(raw.into_resource()?);
        }

        debug!(
            "Resource table of {} complete: {} entries",
            self.path.display(),
            resources.len()
        );
        Ok(resources)
    }
}

/// Read exactly `N` bytes into a buffer owned by this call.
fn read_field<const N: usize>(
    stream: &mut impl Read,
    field: &'static str,
    path: &Path,
) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    stream
        .read_exact(&mut buf)
        .map_err(|e| Error::read_field(field, path, e))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ValidationError};
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn header(count: u32) -> Vec<u8> {
        let mut buf = MAGIC.to_vec();
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf
    }

    fn entry(name: &str, raw_size: u32, raw_offset: u32) -> Vec<u8> {
        let mut buf = vec![0u8; ENTRY_SIZE];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf[48..52].copy_from_slice(&raw_size.to_le_bytes());
        buf[56..60].copy_from_slice(&raw_offset.to_le_bytes());
        buf
    }

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_field_exact() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let buf = read_field::<4>(&mut cursor, "f", Path::new("x")).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        let err = read_field::<4>(&mut cursor, "f", Path::new("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Archive::open(dir.path().join("missing.dat")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_open_empty_file() {
        let file = write_temp(&[]);
        let err = Archive::open(file.path()).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { field: "magic header" }));
    }

    #[test]
    fn test_open_truncated_after_magic() {
        let file = write_temp(&header(1)[..10]);
        let err = Archive::open(file.path()).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { field: "resource count" }));
    }

    #[test]
    fn test_wrong_magic_checked_before_rest() {
        let file = write_temp(b"PS_FS_V0");
        let err = Archive::open(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_empty_table() {
        let file = write_temp(&header(0));
        let archive = Archive::open(file.path()).unwrap();
        assert_eq!(archive.resource_count(), 0);
        assert!(archive.resources().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_table() {
        let mut data = header(2);
        data.extend(entry("a", 20, 100));
        data.extend(&entry("b", 20, 100)[..30]);
        let file = write_temp(&data);

        let archive = Archive::open(file.path()).unwrap();
        let err = archive.resources().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        // Nothing partial was cached; a retry reads the table again
        let err = archive.resources().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_entry_fails_whole_table() {
        let mut data = header(2);
        data.extend(entry("good", 20, 100));
        data.extend(entry("", 20, 100));
        let file = write_temp(&data);

        let archive = Archive::open(file.path()).unwrap();
        let err = archive.resources().unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyName)));
    }

    #[test]
    fn test_find() {
        let mut data = header(2);
        data.extend(entry("a", 20, 100));
        data.extend(entry("b", 30, 200));
        let file = write_temp(&data);

        let archive = Archive::open(file.path()).unwrap();
        assert_eq!(archive.find("b").unwrap().map(Resource::size), Some(14));
        assert!(archive.find("c").unwrap().is_none());
    }
}
