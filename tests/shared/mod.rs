#![allow(dead_code)]

pub mod fakes;

use msim_fs_util as fsx;
use std::path::Path;
use tempdir::TempDir;

pub const POSCAR: &str = "\
Al Pt
1.0
  4.0 0.0 0.0
  0.0 4.0 0.0
  0.0 0.0 4.0
Al Pt
1 1
Direct
0.1 0.1 0.1
0.6 0.6 0.6
";

/// A working directory holding only a POSCAR.
pub fn fresh_dir() -> TempDir {
    let tmp = TempDir::new("msim-test").unwrap();
    fsx::write(tmp.path().join("POSCAR"), POSCAR).unwrap();
    tmp
}

pub fn read(dir: &Path, name: &str) -> String
{ fsx::read_to_string(dir.join(name)).unwrap() }

pub fn write(dir: &Path, name: &str, text: &str)
{ fsx::write(dir.join(name), text).unwrap() }

pub fn exists(dir: &Path, name: &str) -> bool
{ dir.join(name).exists() }
