use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Serializes `value` as pretty JSON and swaps it into place, so a reader
/// never observes a half-written settings file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    text.push('\n');

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path_for(path);
    fs::write(&staging, text.as_bytes())?;
    swap_into_place(&staging, path)
}

fn swap_into_place(staging: &Path, target: &Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(staging);
            return Err(error);
        }
    }

    fs::rename(staging, target).map_err(|error| {
        let _ = fs::remove_file(staging);
        error
    })
}

fn staging_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("settings.json");
    path.with_file_name(format!(".{file_name}.staging"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces_json_without_leaving_staging_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("prefs.json");

        write_json_atomic(&path, &vec![1, 2, 3]).expect("first write");
        write_json_atomic(&path, &vec![4]).expect("second write");

        let raw = fs::read_to_string(&path).expect("read back");
        let parsed: Vec<u32> = serde_json::from_str(&raw).expect("json");
        assert_eq!(parsed, vec![4]);
        assert!(!staging_path_for(&path).exists());
    }
}
