use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::resource::Resource;

/// Read exactly `resource.size()` bytes at `resource.offset()`.
///
/// A payload that would end past the end of the source fails with
/// [`io::ErrorKind::UnexpectedEof`] before any buffer is allocated.
pub fn read_resource<R: ReadAt + ?Sized>(reader: &R, resource: &Resource) -> io::Result<Vec<u8>> {
    let end = resource.offset().checked_add(resource.size());
    if end.is_none_or(|end| end > reader.size()) {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "resource '{}' ends past the end of the archive ({} + {} > {})",
                resource.name(),
                resource.offset(),
                resource.size(),
                reader.size()
            ),
        ));
    }

    let mut buf = vec![0u8; resource.size() as usize];
    reader.read_exact_at(resource.offset(), &mut buf)?;
    Ok(buf)
}

/// Extract resource data to memory.
///
/// Opens its own reader on `archive_path`; nothing is shared with the
/// archive handle or with other extractions.
pub fn extract_to_memory(archive_path: &Path, resource: &Resource) -> Result<Vec<u8>> {
    let reader = LocalFileReader::new(archive_path).map_err(|e| Error::io(archive_path, e))?;
    trace!(
        "Reading {} ({} bytes at {})",
        resource.name(),
        resource.size(),
        resource.offset()
    );
    read_resource(&reader, resource).map_err(|e| Error::io(archive_path, e))
}

/// Copy resource data into `writer`.
///
/// The payload is read completely before the first byte is written, so a
/// truncated archive leaves `writer` untouched. Write failures are reported
/// as [`Error::Write`].
pub fn extract_to_writer<W: Write + ?Sized>(
    archive_path: &Path,
    resource: &Resource,
    writer: &mut W,
) -> Result<()> {
    let data = extract_to_memory(archive_path, resource)?;
    writer
        .write_all(&data)
        .and_then(|()| writer.flush())
        .map_err(|source| Error::Write { source })
}

/// Extract a resource to `directory/<name>`, replacing any existing file.
///
/// # Errors
///
/// - [`Error::UnsafeName`] if the name is not a single plain file name
/// - [`Error::Io`] if the archive cannot be read (including a payload that
///   runs past the end of the file) or the output cannot be written; the
///   output file is removed again in that case
pub fn extract(archive_path: &Path, resource: &Resource, directory: &Path) -> Result<PathBuf> {
    let output_path = output_path(directory, resource.name())?;
    let mut file = File::create(&output_path).map_err(|e| Error::io(&output_path, e))?;

    if let Err(e) = extract_to_writer(archive_path, resource, &mut file) {
        drop(file);
        // No empty or partial file is left behind
        let _ = fs::remove_file(&output_path);
        return Err(match e {
            Error::Write { source } => Error::io(&output_path, source),
            e => e,
        });
    }
    trace!("Wrote {}", output_path.display());

    Ok(output_path)
}

/// Join `name` onto `directory`, refusing anything that could land elsewhere.
pub fn output_path(directory: &Path, name: &str) -> Result<PathBuf> {
    let unsafe_name = || Error::UnsafeName {
        name: name.to_string(),
    };

    if name.contains(['/', '\\', '\0']) {
        return Err(unsafe_name());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(directory.join(name)),
        _ => Err(unsafe_name()),
    }
}
