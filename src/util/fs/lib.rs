/* ************************************************************************ **
** This file is part of msim, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of msim is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

//! Thin wrappers around `std::fs` whose errors say which path was involved.
//!
//! Every working-directory mutation the relaxation driver performs goes
//! through here, so that "No such file or directory" never shows up in a log
//! without the file it was about.

#[macro_use]
extern crate log;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub use crate::tempdir::{ActualTempDir, TempDir};
mod tempdir;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("while opening file '{}': {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("could not create file '{}': {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("could not copy file '{}' to '{}': {source}", src.display(), dest.display())]
    Copy { src: PathBuf, dest: PathBuf, source: io::Error },

    #[error("could not create directory '{}': {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("could not normalize '{}': {source}", path.display())]
    Canonicalize { path: PathBuf, source: io::Error },

    #[error("could not remove '{}': {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },

    #[error("could not read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("could not write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("could not list directory '{}': {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper around `File::open` that adds context.
pub fn open(path: impl AsRef<Path>) -> Result<File>
{
    let path = path.as_ref();
    File::open(path).map_err(|source| Error::Open { path: path.into(), source })
}

/// Wrapper around `File::open` that adds context and makes a `BufReader`.
pub fn open_text(path: impl AsRef<Path>) -> Result<BufReader<File>>
{ open(path).map(BufReader::new) }

/// Wrapper around `File::create` that adds context.
pub fn create(path: impl AsRef<Path>) -> Result<File>
{
    let path = path.as_ref();
    File::create(path).map_err(|source| Error::Create { path: path.into(), source })
}

/// Opens a file for appending, creating it if necessary.
pub fn append(path: impl AsRef<Path>) -> Result<File>
{
    let path = path.as_ref();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::Open { path: path.into(), source })
}

/// Wrapper around `std::fs::copy` that adds context.
///
/// The destination is overwritten if it exists.
pub fn copy(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()>
{
    let (src, dest) = (src.as_ref(), dest.as_ref());
    trace!("cp '{}' '{}'", src.display(), dest.display());
    fs::copy(src, dest)
        .map(|_| ()) // number of bytes; don't care
        .map_err(|source| Error::Copy { src: src.into(), dest: dest.into(), source })
}

/// Like `copy`, but a missing source is not an error.
///
/// Returns whether a copy took place.
pub fn copy_if_exists(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<bool>
{
    let src = src.as_ref();
    if !src.exists() {
        return Ok(false);
    }
    copy(src, dest).map(|()| true)
}

/// Wrapper around `std::fs::create_dir` that adds context.
pub fn create_dir(dir: impl AsRef<Path>) -> Result<()>
{
    let path = dir.as_ref();
    fs::create_dir(path).map_err(|source| Error::CreateDir { path: path.into(), source })
}

/// Wrapper around `std::fs::canonicalize` that adds context.
pub fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf>
{
    let path = path.as_ref();
    fs::canonicalize(path).map_err(|source| Error::Canonicalize { path: path.into(), source })
}

/// Wrapper around `std::fs::remove_file` that adds context.
pub fn remove_file(path: impl AsRef<Path>) -> Result<()>
{
    let path = path.as_ref();
    fs::remove_file(path).map_err(|source| Error::Remove { path: path.into(), source })
}

/// Wrapper around `std::fs::read_to_string` that adds context.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String>
{
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|source| Error::Read { path: path.into(), source })
}

/// Reads all lines of a text file, without their terminators.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>>
{
    let path = path.as_ref();
    open_text(path)?
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(|source| Error::Read { path: path.into(), source })
}

/// Like `read_lines`, but invalid UTF-8 is replaced rather than being an error.
///
/// For logs that other programs write into.
pub fn read_lines_lossy(path: impl AsRef<Path>) -> Result<Vec<String>>
{
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| Error::Read { path: path.into(), source })?;
    Ok(String::from_utf8_lossy(&bytes).lines().map(String::from).collect())
}

/// Wrapper around `std::fs::write` that adds context.
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()>
{
    let path = path.as_ref();
    fs::write(path, contents).map_err(|source| Error::Write { path: path.into(), source })
}

/// Names of the entries in a directory that are valid UTF-8.
///
/// Order is unspecified.
pub fn file_names(dir: impl AsRef<Path>) -> Result<Vec<String>>
{
    let path = dir.as_ref();
    let wrap = |source| Error::ReadDir { path: path.into(), source };

    let mut out = vec![];
    for entry in fs::read_dir(path).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        match entry.file_name().into_string() {
            Ok(name) => out.push(name),
            Err(name) => debug!("skipping non-UTF8 file name {:?}", name),
        }
    }
    Ok(out)
}

/// Simulates `rm -rf`.
///
/// Properties:
/// * Deletes files and folders alike.
/// * Does not require the path or its ancestors to exist.
/// * **Does** fail if other problems occur (e.g. insufficient permissions).
/// * Does **not** follow symbolic links.
pub fn rm_rf(path: impl AsRef<Path>) -> Result<()>
{
    use std::io::ErrorKind;

    let path = path.as_ref();
    let wrap = |source| Error::Remove { path: path.into(), source };

    // directoryness is only checked *after* failed deletion, to reduce race conditions
    match fs::remove_file(path) {
        Ok(()) => return Ok(()),
        Err(e) => match (e.kind(), path.is_dir()) {
            (ErrorKind::NotFound, _) => return Ok(()),
            (_, true) => {},
            _ => return Err(wrap(e)),
        },
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(wrap(e)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_overwrites_and_reports_paths() {
        let tmp = ActualTempDir::new("msim-fs-test").unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write(&a, "new").unwrap();
        write(&b, "old").unwrap();

        copy(&a, &b).unwrap();
        assert_eq!(read_to_string(&b).unwrap(), "new");

        let err = copy(tmp.path().join("missing"), &b).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing"), "{}", msg);
        assert!(msg.contains("'") && msg.contains("/b'"), "{}", msg);
    }

    #[test]
    fn copy_if_exists_skips_missing() {
        let tmp = ActualTempDir::new("msim-fs-test").unwrap();
        let dest = tmp.path().join("KPOINTS");
        assert!(!copy_if_exists(tmp.path().join("KPOINTS-relax"), &dest).unwrap());
        assert!(!dest.exists());
    }

    #[test]
    fn rm_rf_tolerates_missing() {
        let tmp = ActualTempDir::new("msim-fs-test").unwrap();
        rm_rf(tmp.path().join("nope")).unwrap();

        let sub = tmp.path().join("sub");
        create_dir(&sub).unwrap();
        write(sub.join("file"), "x").unwrap();
        rm_rf(&sub).unwrap();
        assert!(!sub.exists());
    }

    #[test]
    fn append_accumulates() {
        let tmp = ActualTempDir::new("msim-fs-test").unwrap();
        let log = tmp.path().join("vasp.log");
        {
            use std::io::Write;
            writeln!(append(&log).unwrap(), "one").unwrap();
            writeln!(append(&log).unwrap(), "two").unwrap();
        }
        assert_eq!(read_lines(&log).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn lossy_lines_survive_bad_bytes() {
        let tmp = ActualTempDir::new("msim-fs-test").unwrap();
        let log = tmp.path().join("vasp.log");
        write(&log, b"ok\n\xff\xfe garbage\r\nERROR\n").unwrap();

        assert!(read_lines(&log).is_err());
        let lines = read_lines_lossy(&log).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ok");
        assert!(lines[1].ends_with(" garbage"));
        assert_eq!(lines[2], "ERROR");
    }
}
