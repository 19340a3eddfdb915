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

pub use ::tempdir::TempDir as ActualTempDir;

use std::ffi::{OsStr, OsString};
use std::io::Result as IoResult;
use std::path::Path;

/// Wrapper around `tempdir::TempDir` that can keep the directory around
/// when something went wrong inside it.
///
/// Python helper scripts write their input and output here, and those files
/// are the first thing anyone wants to look at when a script misbehaves.
#[derive(Debug)]
pub struct TempDir(Option<ActualTempDir>);

impl From<ActualTempDir> for TempDir {
    fn from(tmp: ActualTempDir) -> Self { TempDir(Some(tmp)) }
}

impl TempDir {
    pub fn new(prefix: &str) -> IoResult<TempDir> {
        ActualTempDir::new(prefix).map(Self::from)
    }

    pub fn path(&self) -> &Path {
        self.0.as_ref().expect("(BUG!) TempDir used after recovery").path()
    }

    /// Keep the directory on disk instead of deleting it.
    pub fn recover(mut self) { self._recover(); }

    /// Recover the tempdir if a closure returns Err.
    pub fn try_with_recovery<B, E>(
        self,
        f: impl FnOnce(&TempDir) -> Result<B, E>,
    ) -> Result<(TempDir, B), E> {
        match f(&self) {
            Ok(x) => Ok((self, x)),
            Err(e) => {
                self.recover();
                Err(e)
            },
        }
    }
}

/// Leaks the inner TempDir if we are unwinding.
impl Drop for TempDir {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self._recover();
        }
    }
}

impl TempDir {
    fn _recover(&mut self) {
        let temp = match self.0.take() {
            Some(temp) => temp.into_path(),
            None => return,
        };

        // Either move the directory to a user-specified location
        // or else leak it in its current location.
        let dest = match non_empty_env("MSIM_SAVETEMP") {
            None => {
                info!("kept tempdir at {}", temp.display());
                return;
            },
            Some(dest) => Path::new(&dest).to_owned(),
        };

        let name = match temp.file_name() {
            None => {
                warn!("could not get temp dir name of '{}'", temp.display());
                return;
            },
            Some(name) => name.to_owned(),
        };

        if let Err(e) = std::fs::create_dir_all(&dest) {
            warn!("failed to create '{}': {}", dest.display(), e);
            return;
        }

        let dest_file = dest.join(name);
        match std::fs::rename(&temp, &dest_file) {
            Err(e) => warn!("failed to move '{}' to '{}': {}", temp.display(), dest_file.display(), e),
            Ok(()) => info!("recovered tempdir: {}", dest_file.display()),
        }
    }
}

fn non_empty_env(key: impl AsRef<OsStr>) -> Option<OsString> {
    match std::env::var_os(key) {
        Some(ref s) if s.is_empty() => None,
        s => s,
    }
}
