use std::fmt;

use crate::error::ValidationError;

/// One named, sized file stored in a PS_FS_V1 archive.
///
/// Instances only come out of [`Resource::new`], so a name is never empty
/// and both `size` and `offset` are strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource {
    name: String,
    size: u64,
    offset: u64,
}

impl Resource {
    /// Validate a decoded `(name, size, offset)` triple.
    ///
    /// `size` and `offset` are signed so that adjusted table values which
    /// went negative are rejected rather than wrapped.
    pub fn new(name: impl Into<String>, size: i64, offset: i64) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if size <= 0 {
            return Err(ValidationError::NonPositiveSize(size));
        }
        if offset <= 0 {
            return Err(ValidationError::NonPositiveOffset(offset));
        }

        Ok(Self {
            name,
            size: size as u64,
            offset: offset as u64,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Absolute position of the payload inside the archive
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size rounded down to the largest whole unit, e.g. `8 bytes` or `3 MB`.
    pub fn display_size(&self) -> String {
        display_size(self.size)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.display_size())
    }
}

/// Format a byte count with whole units only.
pub fn display_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{} GB", size / GB)
    } else if size >= MB {
        format!("{} MB", size / MB)
    } else if size >= KB {
        format!("{} KB", size / KB)
    } else {
        format!("{} bytes", size)
    }
}
