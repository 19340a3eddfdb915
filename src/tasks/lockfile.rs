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

//! Keeps two drivers out of the same working directory.

use crate::FailResult;
use crate::fsx;
use path_abs::{PathArc, PathFile, FileWrite};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Name of the lockfile inside a working directory.
pub const LOCKFILE_NAME: &str = "msim.lock";

/// Handle with methods for creating a lockfile without race conditions.
#[derive(Debug, Clone)]
pub struct LockfilePath(pub PathArc);

/// RAII guard for a lockfile.
///
/// Empty once released.
#[derive(Debug)]
pub struct LockfileGuard(Option<PathFile>);

impl LockfilePath {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self
    { LockfilePath(PathArc::new(dir.as_ref().join(LOCKFILE_NAME))) }

    /// `Ok(None)` if somebody else holds the lock.
    pub fn try_lock(&self) -> FailResult<Option<LockfileGuard>> {
        // 'create_new' fails atomically if the file exists
        let mut options = OpenOptions::new();
        options.write(true);
        options.create_new(true);

        match FileWrite::open(&self.0, options) {
            Err(e) => match e.io_error().kind() {
                io::ErrorKind::AlreadyExists => Ok(None),
                _ => Err(e.into()),
            },
            Ok(_) => Ok(Some(LockfileGuard(Some(self.0.canonicalize()?.into_file()?)))),
        }
    }

    /// Like `try_lock`, but someone else holding the lock is an error.
    pub fn lock_or_fail(&self) -> FailResult<LockfileGuard> {
        match self.try_lock()? {
            Some(guard) => Ok(guard),
            None => bail!(
                "'{}' exists; is another relaxation running in this directory? \
                 (if not, delete the file)",
                self.0.display()
            ),
        }
    }

    /// Remove a lock left behind by a process that never got to release it.
    ///
    /// Only for callers that know the previous holder is gone, such as cleanup
    /// after the scheduler killed a job. Returns whether there was a lock.
    pub fn break_stale(&self) -> FailResult<bool> {
        if !self.0.exists() {
            return Ok(false);
        }
        warn!("Removing stale lockfile '{}'.", self.0.display());
        fsx::remove_file(&self.0)?;
        Ok(true)
    }
}

impl std::ops::Deref for LockfilePath {
    type Target = PathArc;
    fn deref(&self) -> &PathArc { &self.0 }
}

impl LockfileGuard {
    /// Release the lock, reporting any error.
    pub fn release(mut self) -> FailResult<()>
    { self._release() }

    fn _release(&mut self) -> FailResult<()> {
        match self.0.take() {
            Some(file) => file.remove().map_err(Into::into),
            None => Ok(()),
        }
    }
}

impl Drop for LockfileGuard {
    fn drop(&mut self) {
        let _ = self._release();
    }
}
