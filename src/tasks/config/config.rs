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

// NOTE: Please make sure to use the YamlRead trait when deserializing these types!

use serde::de;
use std::collections::BTreeMap;

/// Root settings object, after validation.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(pub Settings);

/// Raw deserialized form of settings.
///
/// Command line flags are applied to this before calling `validate`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// See the type for documentation.
    #[serde(default)]
    pub relax: Relax,

    /// See the type for documentation.
    #[serde(default)]
    pub jobs: Jobs,
}
derive_yaml_read!{Settings}
derive_yaml_read!{ValidatedSettings}

impl<'de> de::Deserialize<'de> for ValidatedSettings {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cereal: Settings = de::Deserialize::deserialize(deserializer)?;

        cereal.validate().map_err(de::Error::custom)
    }
}

/// The relax-and-resubmit loop.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Relax {
    /// Upper bound on solver runs in the loop (the final static run is extra).
    ///
    /// With `max-iterations: 1`, a single run is performed and nothing is archived.
    #[serde(default = "_relax__max_iterations")]
    pub max_iterations: u32,

    /// Control file to stage over `files.incar` before the loop.
    ///
    /// When omitted, this is `INCAR-relax` if `run-static` is set, and otherwise
    /// the active control file itself (so nothing is staged).
    #[serde(default)]
    pub incar: Option<String>,

    /// Symmetrize the structure between iterations.
    #[serde(default)]
    pub refine: bool,

    /// Perform a final static run with `final-static.incar` once the loop succeeds.
    #[serde(default)]
    pub run_static: bool,

    /// What to do when the solver log reports a warning.
    #[serde(default)]
    pub warning_policy: WarningPolicy,

    /// See the type for documentation.
    #[serde(default)]
    pub final_static: FinalStatic,

    /// See the type for documentation.
    #[serde(default)]
    pub solver: Solver,

    /// See the type for documentation.
    #[serde(default)]
    pub log_patterns: LogPatterns,

    /// See the type for documentation.
    #[serde(default)]
    pub symmetry: Symmetry,

    /// See the type for documentation.
    #[serde(default)]
    pub files: Files,
}
fn _relax__max_iterations() -> u32 { 10 }

impl Relax {
    /// The control file that `prepare` copies over the active one.
    pub fn incar_to_stage(&self) -> &str {
        match (&self.incar, self.run_static) {
            (Some(incar), _) => incar,
            (None, true) => "INCAR-relax",
            (None, false) => &self.files.incar,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WarningPolicy {
    /// Stop the loop and report the warning.
    Stop,
    /// Log the warning and carry on as if the run succeeded.
    Continue,
}

impl Default for WarningPolicy {
    fn default() -> Self { WarningPolicy::Stop }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct FinalStatic {
    /// Only do the static run if the loop actually converged, rather than
    /// merely running out of iterations without error.
    #[serde(default)]
    pub require_convergence: bool,

    /// Staged over the active control file. Must exist.
    #[serde(default = "_final_static__incar")]
    pub incar: String,

    /// Staged over the active k-point file if it exists.
    #[serde(default = "_final_static__kpoints")]
    pub kpoints: String,
}
fn _final_static__incar() -> String { "INCAR-final".into() }
fn _final_static__kpoints() -> String { "KPOINTS-final".into() }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Solver {
    /// Command line for one solver run, split on whitespace.
    ///
    /// `{nprocs}` is replaced with `nprocs`.
    #[serde(default = "_solver__command")]
    pub command: String,

    /// Number of processes. Defaults to the number of logical CPUs.
    #[serde(default)]
    pub nprocs: Option<u32>,

    /// File that receives the solver's stdout and stderr, and that is
    /// scanned for errors after each run.
    #[serde(default = "_solver__log")]
    pub log: String,
}
fn _solver__command() -> String { "mpirun -np {nprocs} vasp_std".into() }
fn _solver__log() -> String { "vasp.log".into() }

/// Case-insensitive substrings searched for in new solver log lines.
///
/// An empty list disables that class of message.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LogPatterns {
    #[serde(default = "_log_patterns__error")]
    pub error: Vec<String>,
    #[serde(default = "_log_patterns__warning")]
    pub warning: Vec<String>,
    #[serde(default = "_log_patterns__nbands")]
    pub nbands: Vec<String>,
}
fn _log_patterns__error() -> Vec<String> { vec!["error".into()] }
fn _log_patterns__warning() -> Vec<String> { vec!["warning".into()] }
fn _log_patterns__nbands() -> Vec<String> { vec!["nbands".into()] }

/// Tolerances handed to spglib when `refine` is enabled.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Symmetry {
    #[serde(default = "_symmetry__symprec")]
    pub symprec: f64,
    /// Negative means spglib's own default.
    #[serde(default = "_symmetry__angle_tolerance")]
    pub angle_tolerance: f64,
}
fn _symmetry__symprec() -> f64 { 1e-5 }
fn _symmetry__angle_tolerance() -> f64 { -1.0 }

/// Names of the files the driver reads, writes and archives.
///
/// Snapshots are named after `contcar` and `vasprun`: `CONTCAR_03`, `vasprun_03.xml`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Files {
    #[serde(default = "_files__poscar")]
    pub poscar: String,
    #[serde(default = "_files__contcar")]
    pub contcar: String,
    #[serde(default = "_files__poscar_init")]
    pub poscar_init: String,
    #[serde(default = "_files__vasprun")]
    pub vasprun: String,
    #[serde(default = "_files__incar")]
    pub incar: String,
    #[serde(default = "_files__kpoints")]
    pub kpoints: String,
    #[serde(default = "_files__kpoints_relax")]
    pub kpoints_relax: String,
    #[serde(default = "_files__fail_log")]
    pub fail_log: String,
}
fn _files__poscar() -> String { "POSCAR".into() }
fn _files__contcar() -> String { "CONTCAR".into() }
fn _files__poscar_init() -> String { "POSCAR.init".into() }
fn _files__vasprun() -> String { "vasprun.xml".into() }
fn _files__incar() -> String { "INCAR".into() }
fn _files__kpoints() -> String { "KPOINTS".into() }
fn _files__kpoints_relax() -> String { "KPOINTS-relax".into() }
fn _files__fail_log() -> String { "fail.log".into() }

/// Batch job scripts.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Jobs {
    /// Interpreter on the `#!` line (Slurm) or `-S` directive (SGE).
    #[serde(default = "_jobs__shell")]
    pub shell: String,

    /// Lines placed before the command, e.g. to activate an environment.
    #[serde(default)]
    pub preamble: Vec<String>,

    #[serde(default = "_jobs__stdout")]
    pub stdout: String,
    #[serde(default = "_jobs__stderr")]
    pub stderr: String,

    /// See the type for documentation.
    #[serde(default)]
    pub submit: Submit,

    /// See the type for documentation.
    #[serde(default)]
    pub keep_resource: KeepResource,
}
fn _jobs__shell() -> String { "/bin/zsh".into() }
fn _jobs__stdout() -> String { "std.log".into() }
fn _jobs__stderr() -> String { "err.log".into() }

/// `msim-submit-jobs`: one SGE job per numbered directory.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Submit {
    #[serde(default = "_submit__queue")]
    pub queue: String,
    #[serde(default = "_submit__prefix")]
    pub prefix: String,
    #[serde(default = "_submit__id_digits")]
    pub id_digits: usize,
    /// Command run by each job.
    #[serde(default = "_submit__command")]
    pub command: String,
    /// Cores requested on queues not listed in `cores-by-queue`.
    #[serde(default = "_submit__default_cores")]
    pub default_cores: u32,
    #[serde(default = "_submit__cores_by_queue")]
    pub cores_by_queue: BTreeMap<String, u32>,
}
fn _submit__queue() -> String { "vega-a".into() }
fn _submit__prefix() -> String { "disp-".into() }
fn _submit__id_digits() -> usize { 3 }
fn _submit__command() -> String { "mpirun vasp_std".into() }
fn _submit__default_cores() -> u32 { 16 }
fn _submit__cores_by_queue() -> BTreeMap<String, u32> {
    let mut map = BTreeMap::new();
    map.insert("vega-c".into(), 32);
    map
}

impl Submit {
    pub fn cores_for(&self, queue: &str) -> u32 {
        self.cores_by_queue.get(queue).cloned().unwrap_or(self.default_cores)
    }
}

/// `msim-keep-resource`: placeholder Slurm jobs.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct KeepResource {
    #[serde(default = "_keep_resource__partitions")]
    pub partitions: String,
    #[serde(default = "_keep_resource__command")]
    pub command: String,
}
fn _keep_resource__partitions() -> String { "vega-a,vega-c,vega-d".into() }
fn _keep_resource__command() -> String { "sleep 1d".into() }

// --------------------------------------------------------

impl Default for Settings {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Relax {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for FinalStatic {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Solver {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for LogPatterns {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Symmetry {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Files {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Jobs {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for Submit {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

impl Default for KeepResource {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

fn from_empty_mapping<T: for<'de> serde::Deserialize<'de>>() -> serde_yaml::Result<T> {
    use serde_yaml::{from_value, Value, Mapping};
    from_value(Value::Mapping(Mapping::new()))
}

/// Render settings for the log.
pub fn to_yaml_string(settings: &ValidatedSettings) -> Result<String, serde_yaml::Error>
{ serde_yaml::to_string(settings) }
