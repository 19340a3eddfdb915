/* ********************************************************************** **
**  This file is part of msim.                                            **
**                                                                        **
**  msim is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of msim is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

//! Iteration ids and the files archived under them.

use crate::FailResult;
use crate::fsx;

use msim_tasks_config::Files;
use msim_vasp_io::SnapshotNaming;
use std::path::{Path, PathBuf};

/// One archived iteration.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// 1-based, and unique within a working directory.
    pub id: u32,
    pub structure_snapshot: PathBuf,
    pub trajectory_snapshot: PathBuf,
}

/// No id is left after `last`.
#[derive(Debug, Fail)]
#[fail(display = "no iteration id follows {}; move the old snapshots out of the way", last)]
pub struct IdsExhausted {
    pub last: u32,
}

/// 1 for a fresh directory, otherwise one past the highest id.
pub fn next_iteration_id(existing_ids: &[u32]) -> FailResult<u32> {
    match existing_ids.iter().max() {
        None => Ok(1),
        Some(&last) => last.checked_add(1).ok_or_else(|| IdsExhausted { last }.into()),
    }
}

/// Knows where everything lives in a working directory.
#[derive(Debug, Clone)]
pub struct Bookkeeper {
    dir: PathBuf,
    files: Files,
    structure_naming: SnapshotNaming,
    trajectory_naming: SnapshotNaming,
}

impl Bookkeeper {
    pub fn new(dir: impl AsRef<Path>, files: &Files) -> Self {
        Bookkeeper {
            dir: dir.as_ref().to_owned(),
            files: files.clone(),
            structure_naming: structure_naming(files),
            trajectory_naming: trajectory_naming(files),
        }
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path(&self, name: &str) -> PathBuf { self.dir.join(name) }

    pub fn files(&self) -> &Files { &self.files }

    pub fn structure_snapshot(&self, id: u32) -> PathBuf
    { self.path(&self.structure_naming.name(id)) }

    pub fn trajectory_snapshot(&self, id: u32) -> PathBuf
    { self.path(&self.trajectory_naming.name(id)) }

    /// Ids of the trajectory snapshots already in the directory.
    ///
    /// # Errors
    /// A file that looks like a snapshot but has a non-numeric id is an error.
    pub fn existing_ids(&self) -> FailResult<Vec<u32>>
    { self.trajectory_naming.existing_ids(&self.dir) }

    /// Keep the structure the very first run started from.
    pub fn save_initial_structure(&self) -> FailResult<()> {
        fsx::copy(self.path(&self.files.poscar), self.path(&self.files.poscar_init))?;
        Ok(())
    }

    /// The solver's output structure becomes the next input, and is snapshotted.
    pub fn archive_structure(&self, id: u32) -> FailResult<PathBuf> {
        let contcar = self.path(&self.files.contcar);
        let snapshot = self.structure_snapshot(id);
        fsx::copy(&contcar, self.path(&self.files.poscar))?;
        fsx::copy(&contcar, &snapshot)?;
        Ok(snapshot)
    }

    pub fn archive_trajectory(&self, id: u32) -> FailResult<PathBuf> {
        let snapshot = self.trajectory_snapshot(id);
        fsx::copy(self.path(&self.files.vasprun), &snapshot)?;
        Ok(snapshot)
    }
}

/// `CONTCAR` gives `CONTCAR_03`.
pub fn structure_naming(files: &Files) -> SnapshotNaming
{ SnapshotNaming::new(format!("{}_", files.contcar), "") }

/// `vasprun.xml` gives `vasprun_03.xml`.
pub fn trajectory_naming(files: &Files) -> SnapshotNaming {
    match files.vasprun.rfind('.') {
        Some(dot) => {
            let (stem, ext) = files.vasprun.split_at(dot);
            SnapshotNaming::new(format!("{}_", stem), ext)
        },
        None => SnapshotNaming::new(format!("{}_", files.vasprun), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id() {
        assert_eq!(next_iteration_id(&[]).unwrap(), 1);
        assert_eq!(next_iteration_id(&[1, 2]).unwrap(), 3);
        assert_eq!(next_iteration_id(&[7, 2]).unwrap(), 8);
        assert_eq!(next_iteration_id(&[99]).unwrap(), 100);
    }

    #[test]
    fn last_possible_id_is_an_error() {
        let msg = next_iteration_id(&[3, std::u32::MAX]).unwrap_err().to_string();
        assert!(msg.contains(&std::u32::MAX.to_string()), "{}", msg);
    }

    #[test]
    fn default_names() {
        let files = Files::default();
        assert_eq!(structure_naming(&files).name(3), "CONTCAR_03");
        assert_eq!(trajectory_naming(&files).name(3), "vasprun_03.xml");
    }

    #[test]
    fn archive_copies_contcar_twice() {
        let tmp = fsx::ActualTempDir::new("msim-bookkeeping").unwrap();
        let book = Bookkeeper::new(tmp.path(), &Files::default());
        fsx::write(book.path("POSCAR"), "old").unwrap();
        fsx::write(book.path("CONTCAR"), "new").unwrap();
        fsx::write(book.path("vasprun.xml"), "<modeling/>").unwrap();

        let structure = book.archive_structure(4).unwrap();
        let trajectory = book.archive_trajectory(4).unwrap();

        assert_eq!(fsx::read_to_string(book.path("POSCAR")).unwrap(), "new");
        assert_eq!(fsx::read_to_string(&structure).unwrap(), "new");
        assert_eq!(structure, book.path("CONTCAR_04"));
        assert_eq!(trajectory, book.path("vasprun_04.xml"));
        assert_eq!(book.existing_ids().unwrap(), vec![4]);
    }

    #[test]
    fn missing_contcar_is_an_error_naming_it() {
        let tmp = fsx::ActualTempDir::new("msim-bookkeeping").unwrap();
        let book = Bookkeeper::new(tmp.path(), &Files::default());
        let msg = book.archive_structure(1).unwrap_err().to_string();
        assert!(msg.contains("CONTCAR"), "{}", msg);
    }
}
