use crate::file::csv::error::FileError;
use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read},
    path::Path,
};

pub mod csv;

const READ_BUFFER: usize = 64 * 1024;

/// Opens a local input file, returning the reader and its length in bytes.
pub fn open_local(path: &Path) -> Result<(Box<dyn Read + Send>, u64), FileError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => FileError::NotFound(path.display().to_string()),
        ErrorKind::PermissionDenied => FileError::PermissionDenied(path.display().to_string()),
        _ => FileError::SourceUnavailable(format!("{}: {e}", path.display())),
    })?;
    let length = file.metadata()?.len();
    Ok((Box::new(BufReader::with_capacity(READ_BUFFER, file)), length))
}
