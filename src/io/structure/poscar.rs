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

use crate::FailResult;
use crate::structure::{Lattice, Structure};

use std::io::prelude::*;
use std::path::Path;

use vasp_poscar as imp;

/// A structure together with the title line it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct Poscar {
    pub comment: String,
    pub structure: Structure,
}

impl Poscar {
    pub fn load(path: impl AsRef<Path>) -> FailResult<Self> {
        let path = path.as_ref();
        let file = msim_fs_util::open_text(path)?;
        Self::from_buf_reader(file)
            .map_err(|e| format_err!("while reading POSCAR '{}': {}", path.display(), e))
    }

    /// Reads a POSCAR from an open file.
    pub fn from_buf_reader(f: impl BufRead) -> FailResult<Self> {
        load_txt(f)
    }

    /// Writes a POSCAR to an open file.
    pub fn to_writer(&self, mut w: impl Write) -> FailResult<()> {
        dump(&mut w, &self.comment, &self.structure)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> FailResult<()> {
        let mut buf = vec![];
        self.to_writer(&mut buf)?;
        msim_fs_util::write(path, buf)?;
        Ok(())
    }
}

fn dump(
    w: &mut dyn Write,
    title: &str,
    structure: &Structure,
) -> FailResult<()>
{
    // the format forbids newlines in the comment
    let title = title.lines().next().unwrap_or("");
    write!(w, "{}",
        imp::Builder::new()
            .comment(title)
            .lattice_vectors(structure.lattice.matrix())
            .positions(imp::Coords::Frac(structure.fracs.clone()))
            .site_symbols(structure.species.iter().map(|s| &s[..]))
            .build()?,
    )?;
    Ok(())
}

fn load_txt(f: impl BufRead) -> FailResult<Poscar>
{
    use vasp_poscar::failure::ResultExt;
    let poscar = imp::Poscar::from_reader(f).compat()?;

    let comment = poscar.comment().to_string();
    let lattice = Lattice::new(&poscar.scaled_lattice_vectors())?;
    let fracs = match poscar.scaled_positions() {
        imp::Coords::Frac(p) => p.to_vec(),
        imp::Coords::Cart(p) => p.iter().map(|c| lattice.cart_to_frac(c)).collect(),
    };

    let group_symbols = match poscar.group_symbols() {
        Some(iter) => iter.map(|s| s.to_string()).collect::<Vec<_>>(),
        None => {
            // VASP 4 files keep the symbols in the title line, if anywhere
            let symbols = comment.split_whitespace().map(|s| s.to_string()).collect::<Vec<_>>();
            ensure!(
                symbols.len() == poscar.group_counts().len(),
                "Symbols must be given either in the standard location or the POSCAR comment."
            );
            symbols
        },
    };
    let counts = poscar.group_counts().collect::<Vec<_>>();
    ensure!(
        counts.len() == group_symbols.len(),
        "{} symbol groups but {} counts", group_symbols.len(), counts.len()
    );

    let species = counts.into_iter().zip(group_symbols)
        .flat_map(|(count, sym)| std::iter::repeat(sym).take(count))
        .collect();

    let structure = Structure::new(lattice, fracs, species)?;
    trace!("read POSCAR with {} atoms", structure.num_atoms());
    Ok(Poscar { comment, structure })
}
