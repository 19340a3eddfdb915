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

//! Names of the per-iteration copies of output files (`vasprun_03.xml`, `CONTCAR_03`).

use crate::FailResult;
use std::path::Path;

/// A file that has the shape of a snapshot, but not a numeric id.
#[derive(Debug, Fail)]
#[fail(display = "'{}' looks like an archived snapshot, but its id is not a decimal number", name)]
pub struct BadSnapshotName {
    pub name: String,
}

/// `{prefix}{id}{suffix}`, with the id zero-padded to two digits.
///
/// Ids of 100 and up simply take more digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNaming {
    prefix: String,
    suffix: String,
}

impl SnapshotNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self
    { SnapshotNaming { prefix: prefix.into(), suffix: suffix.into() } }

    /// `vasprun_{id}.xml`
    pub fn trajectory() -> Self
    { SnapshotNaming::new("vasprun_", ".xml") }

    /// `CONTCAR_{id}`
    pub fn structure() -> Self
    { SnapshotNaming::new("CONTCAR_", "") }

    pub fn name(&self, id: u32) -> String
    { format!("{}{:02}{}", self.prefix, id, self.suffix) }

    /// Recognize a snapshot name.
    ///
    /// Anything of the form `{prefix}*{suffix}` is regarded as an attempted
    /// snapshot, and produces an error if the middle is not all digits.
    /// Other names produce `None`.
    pub fn parse(&self, name: &str) -> Option<Result<u32, BadSnapshotName>> {
        if name.len() < self.prefix.len() + self.suffix.len() {
            return None;
        }
        if !(name.starts_with(&self.prefix[..]) && name.ends_with(&self.suffix[..])) {
            return None;
        }
        let middle = &name[self.prefix.len()..name.len() - self.suffix.len()];

        let bad = || BadSnapshotName { name: name.to_string() };
        if middle.is_empty() || !middle.bytes().all(|b| b.is_ascii_digit()) {
            return Some(Err(bad()));
        }
        Some(middle.parse().map_err(|_| bad()))
    }

    /// Ids of every snapshot in a directory, sorted.
    pub fn existing_ids(&self, dir: impl AsRef<Path>) -> FailResult<Vec<u32>> {
        let mut ids = vec![];
        for name in msim_fs_util::file_names(dir)? {
            if let Some(id) = self.parse(&name) {
                ids.push(id?);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_padded_then_widen() {
        let naming = SnapshotNaming::trajectory();
        assert_eq!(naming.name(1), "vasprun_01.xml");
        assert_eq!(naming.name(42), "vasprun_42.xml");
        assert_eq!(naming.name(100), "vasprun_100.xml");
        assert_eq!(SnapshotNaming::structure().name(7), "CONTCAR_07");
    }

    #[test]
    fn parse_accepts_any_number_of_digits() {
        let naming = SnapshotNaming::trajectory();
        assert_eq!(naming.parse("vasprun_03.xml").unwrap().unwrap(), 3);
        assert_eq!(naming.parse("vasprun_3.xml").unwrap().unwrap(), 3);
        assert_eq!(naming.parse("vasprun_100.xml").unwrap().unwrap(), 100);
    }

    #[test]
    fn parse_ignores_unrelated_names() {
        let naming = SnapshotNaming::trajectory();
        assert!(naming.parse("vasprun.xml").is_none());
        assert!(naming.parse("CONTCAR_01").is_none());
        assert!(naming.parse("vasprun_01.xml.bak").is_none());
    }

    #[test]
    fn parse_rejects_non_numeric_ids() {
        let naming = SnapshotNaming::trajectory();
        let err = naming.parse("vasprun_final.xml").unwrap().unwrap_err();
        assert_eq!(err.name, "vasprun_final.xml");
        assert!(naming.parse("vasprun_.xml").unwrap().is_err());
        assert!(naming.parse("vasprun_-1.xml").unwrap().is_err());
    }

    #[test]
    fn existing_ids_are_sorted_and_errors_propagate() {
        let tmp = tempdir::TempDir::new("msim-snapshots").unwrap();
        for name in &["vasprun_02.xml", "vasprun_10.xml", "vasprun_01.xml", "vasprun.xml", "OUTCAR"] {
            msim_fs_util::write(tmp.path().join(name), "").unwrap();
        }
        let naming = SnapshotNaming::trajectory();
        assert_eq!(naming.existing_ids(tmp.path()).unwrap(), vec![1, 2, 10]);

        msim_fs_util::write(tmp.path().join("vasprun_final.xml"), "").unwrap();
        let msg = naming.existing_ids(tmp.path()).unwrap_err().to_string();
        assert!(msg.contains("vasprun_final.xml"), "{}", msg);
    }
}
