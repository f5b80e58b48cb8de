//! Filesystem utilities for code generation

use std::fs;
use std::io;
use std::path::Path;

use crate::error::DomaingenError;

/// Write content to a file, creating parent directories if needed
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, contents)
}

/// Write content to a file, reporting failures against the offending path
pub fn write_artifact(path: &Path, contents: &str) -> Result<(), DomaingenError> {
    write_file(path, contents).map_err(|source| DomaingenError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a UTF-8 source file, reporting failures against the offending path
pub fn read_source(path: &Path) -> Result<String, DomaingenError> {
    fs::read_to_string(path).map_err(|source| DomaingenError::Io {
        path: path.to_path_buf(),
        source,
    })
}
