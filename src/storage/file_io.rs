//! JSON file helpers for the settings file
//!
//! Writes go through a sibling `.tmp` file and a rename, so readers see either
//! the old or the new document.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::CrudError;

fn io_error(action: &str, path: &Path, err: std::io::Error) -> CrudError {
    CrudError::Io(format!("{} {}: {}", action, path.display(), err))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Load a JSON document; a missing file is `Ok(None)`
pub fn read_json<T, P>(path: P) -> Result<Option<T>, CrudError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("cannot open", path, e)),
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| CrudError::Config(format!("{} is not valid: {}", path.display(), e)))
}

pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), CrudError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| io_error("cannot create", dir, e))?;
    }

    let staging = staging_path(path);
    let result = write_staged(&staging, data).and_then(|()| {
        fs::rename(&staging, path).map_err(|e| io_error("cannot replace", path, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn write_staged<T: Serialize>(staging: &Path, data: &T) -> Result<(), CrudError> {
    let file = File::create(staging).map_err(|e| io_error("cannot create", staging, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| CrudError::Io(format!("cannot encode {}: {}", staging.display(), e)))?;
    writer
        .flush()
        .and_then(|()| writer.get_ref().sync_all())
        .map_err(|e| io_error("cannot flush", staging, e))
}
